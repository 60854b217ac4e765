//! 欄位型別轉換與日期 / 時間戳正規化。
//!
//! 型別標籤寫在欄位表達式的 `:` 之後，例如 `"created:TIMESTAMP"`，
//! 大小寫需完全相符；無法辨識的標籤一律轉成字串。

use crate::utils::error::CoercionError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{Number, Value};

pub const TIMESTAMP_OUTPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S+00:00";
pub const DATE_OUTPUT_FORMAT: &str = "%Y-%m-%d";

enum TimestampFormat {
    Naive(&'static str),
    /// 結尾帶時區名稱（UTC / GMT / Z），解析時先去掉
    ZoneNamed(&'static str),
}

/// TIMESTAMP 依序嘗試的字串格式，第一個成功者勝出
const TIMESTAMP_FORMATS: [TimestampFormat; 5] = [
    TimestampFormat::Naive("%Y %m %d %H %M %S %f"),
    TimestampFormat::Naive("%Y %m %d %H %M %S"),
    TimestampFormat::ZoneNamed("%Y-%m-%d %H:%M:%S"),
    TimestampFormat::Naive("%Y-%m-%d %H:%M:%S"),
    TimestampFormat::Naive("%Y-%m-%d"),
];

const OFFSET_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%d/%b/%Y:%H:%M:%S %z",
];

const FREE_FORM_DATETIME_FORMATS: [&str; 12] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%B %d, %Y %H:%M:%S",
    "%B %d %Y %H:%M:%S",
    "%d %B %Y %H:%M:%S",
    "%Y%m%dT%H%M%S",
];

const FREE_FORM_DATE_FORMATS: [&str; 12] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%Y%m%d",
    "%m/%d/%Y",
    // 月份不可能大於 12 時才會落到日在前的寫法
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %B, %Y",
    "%d-%B-%Y",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeTag {
    Bool,
    Date,
    Float64,
    Int64,
    Json,
    Timestamp,
    Other(String),
}

impl TypeTag {
    pub fn parse(tag: &str) -> Self {
        match tag {
            "BOOL" => TypeTag::Bool,
            "DATE" => TypeTag::Date,
            "FLOAT64" => TypeTag::Float64,
            "INT64" => TypeTag::Int64,
            "JSON" => TypeTag::Json,
            "TIMESTAMP" => TypeTag::Timestamp,
            other => TypeTag::Other(other.to_string()),
        }
    }
}

/// 依型別標籤轉換原始值；null 一律回傳 null
pub fn coerce(value: &Value, type_tag: Option<&TypeTag>) -> Result<Value, CoercionError> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    match type_tag {
        // 非整數也非布林的值原樣回傳（沿用舊行為）
        Some(TypeTag::Bool) => Ok(match value {
            Value::Number(n) if is_integer(n) => Value::Bool(n.as_f64() != Some(0.0)),
            other => other.clone(),
        }),
        Some(TypeTag::Date) => coerce_date(value).map(Value::String),
        Some(TypeTag::Float64) => to_float(value),
        Some(TypeTag::Int64) => to_int(value),
        Some(TypeTag::Json) => Ok(Value::String(value.to_string())),
        Some(TypeTag::Timestamp) => normalize_timestamp(value).map(Value::String),
        Some(TypeTag::Other(_)) | None => Ok(Value::String(stringify(value))),
    }
}

/// 未指定型別時的字串表示：物件與陣列序列化成 JSON
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_integer(n: &Number) -> bool {
    n.is_i64() || n.is_u64()
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_float(value: &Value) -> Result<Value, CoercionError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };

    parsed
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| CoercionError::NotNumeric {
            value: describe(value),
            target: "FLOAT64",
        })
}

fn to_int(value: &Value) -> Result<Value, CoercionError> {
    let parsed = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            // 浮點數向零截斷
            n.as_f64()
                .filter(|f| f.is_finite() && !is_integer(n))
                .map(f64::trunc)
                .filter(|f| *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    };

    parsed
        .map(|i| Value::Number(i.into()))
        .ok_or_else(|| CoercionError::NotNumeric {
            value: describe(value),
            target: "INT64",
        })
}

fn coerce_date(value: &Value) -> Result<String, CoercionError> {
    let parsed = match value {
        Value::Number(n) if is_integer(n) => n.as_i64().and_then(from_epoch_millis),
        Value::String(s) => parse_free_form(s),
        _ => None,
    };

    parsed
        .map(|dt| dt.format(DATE_OUTPUT_FORMAT).to_string())
        .ok_or_else(|| CoercionError::UnparseableDate(describe(value)))
}

/// 轉成 `YYYY-MM-DDTHH:MM:SS+00:00`
///
/// 字串先比對固定格式，再交給通用日期解析；數字（或純數字字串）視為
/// Unix epoch 毫秒。全部失敗時回傳 `NoMatchingTimestampFormat`。
pub fn normalize_timestamp(value: &Value) -> Result<String, CoercionError> {
    let parsed = match value {
        Value::String(s) => parse_timestamp_str(s).or_else(|| {
            s.trim()
                .parse::<f64>()
                .ok()
                .and_then(from_epoch_millis_f64)
        }),
        Value::Number(n) => n
            .as_i64()
            .and_then(from_epoch_millis)
            .or_else(|| n.as_f64().and_then(from_epoch_millis_f64)),
        _ => None,
    };

    parsed
        .map(|dt| dt.format(TIMESTAMP_OUTPUT_FORMAT).to_string())
        .ok_or_else(|| CoercionError::NoMatchingTimestampFormat(describe(value)))
}

fn parse_timestamp_str(s: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| match format {
            TimestampFormat::Naive(f) => parse_naive(s, f),
            TimestampFormat::ZoneNamed(f) => strip_zone_name(s).and_then(|head| parse_naive(head, f)),
        })
        .or_else(|| parse_free_form(s))
}

// 只有日期的格式補上 00:00:00
fn parse_naive(s: &str, format: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, format)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, format)
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// "2023-01-15 10:00:00 UTC" -> "2023-01-15 10:00:00"
fn strip_zone_name(s: &str) -> Option<&str> {
    let (head, zone) = s.rsplit_once(' ')?;
    ["UTC", "GMT", "Z"]
        .iter()
        .any(|name| zone.eq_ignore_ascii_case(name))
        .then_some(head)
}

/// 通用日期解析，帶時區偏移的輸入一律換算成 UTC
pub fn parse_free_form(input: &str) -> Option<NaiveDateTime> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.naive_utc());
    }
    for format in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Some(dt.naive_utc());
        }
    }
    if let Some(head) = strip_zone_name(s) {
        return parse_free_form(head);
    }

    let s = s.strip_suffix('Z').unwrap_or(s);
    FREE_FORM_DATETIME_FORMATS
        .iter()
        .chain(FREE_FORM_DATE_FORMATS.iter())
        .find_map(|format| parse_naive(s, format))
}

fn from_epoch_millis(millis: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc())
}

fn from_epoch_millis_f64(millis: f64) -> Option<NaiveDateTime> {
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return None;
    }
    from_epoch_millis(millis.floor() as i64)
}
