use crate::domain::mapping::MappingConfig;
use crate::domain::model::RawRecord;
use crate::utils::error::EnvelopeError;
use serde_json::Value;

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// 依 data_envelope 逐層取出記錄列表
///
/// 未設定 envelope 時整個 payload 就是輸入；單一物件會包成一筆。
/// 列表中不是物件的元素會被略過。
pub fn extract_records(payload: &Value, config: &MappingConfig) -> Result<Vec<RawRecord>, EnvelopeError> {
    let mut current = payload;

    if let Some(envelope) = config
        .json_data_config
        .data_envelope
        .as_ref()
        .filter(|envelope| !envelope.is_empty())
    {
        for key in envelope.keys() {
            current = current
                .get(key)
                .ok_or_else(|| EnvelopeError::MissingKey(key.to_string()))?;
        }
    }

    match current {
        Value::Object(record) => Ok(vec![record.clone()]),
        Value::Array(items) => {
            let records: Vec<RawRecord> = items
                .iter()
                .filter_map(|item| item.as_object().cloned())
                .collect();
            if records.len() != items.len() {
                tracing::warn!(
                    "Skipped {} non-object entries in data envelope",
                    items.len() - records.len()
                );
            }
            Ok(records)
        }
        other => Err(EnvelopeError::NotACollection(value_kind(other))),
    }
}

/// 原始 payload 最外層的記錄數，用於轉換後的筆數比對
pub fn top_level_count(payload: &Value) -> usize {
    match payload {
        Value::Array(items) => items.len(),
        Value::Object(_) => 1,
        _ => 0,
    }
}
