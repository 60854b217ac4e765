use crate::domain::model::RawRecord;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::path::Path;

/// `${...}` 自訂函式，依包含關係比對，順序即優先序
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomFunction {
    GetDate,
    GetFileName,
    GetAccountId,
    GetTableName,
    GetAllData,
}

const DISPATCH_ORDER: [(&str, CustomFunction); 5] = [
    ("getDate", CustomFunction::GetDate),
    ("getFileName", CustomFunction::GetFileName),
    ("getAccountId", CustomFunction::GetAccountId),
    ("getTableName", CustomFunction::GetTableName),
    ("getAllData", CustomFunction::GetAllData),
];

impl CustomFunction {
    pub fn from_token(token: &str) -> Option<Self> {
        DISPATCH_ORDER
            .iter()
            .find(|(name, _)| token.contains(name))
            .map(|(_, function)| *function)
    }
}

/// 自訂函式可用的執行資訊
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionContext {
    pub file_path: Option<String>,
    pub account_id: Option<String>,
    pub table_name: Option<String>,
}

impl FunctionContext {
    pub fn file_name(&self) -> Option<&str> {
        self.file_path
            .as_deref()
            .and_then(|path| Path::new(path).file_name())
            .and_then(|name| name.to_str())
    }
}

/// 單次轉換的函式求值環境
#[derive(Debug, Clone, Copy)]
pub struct FunctionScope<'a> {
    pub context: &'a FunctionContext,
    pub raw_records: &'a [RawRecord],
    pub now: DateTime<Utc>,
}

pub fn evaluate(function: CustomFunction, scope: &FunctionScope<'_>) -> Value {
    let optional = |value: Option<&str>| {
        value
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null)
    };

    match function {
        CustomFunction::GetDate => Value::String(scope.now.format("%Y-%m-%dT%H:%M:%S").to_string()),
        CustomFunction::GetFileName => optional(scope.context.file_name()),
        CustomFunction::GetAccountId => optional(scope.context.account_id.as_deref()),
        CustomFunction::GetTableName => optional(scope.context.table_name.as_deref()),
        CustomFunction::GetAllData => serde_json::to_string(scope.raw_records)
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn context() -> FunctionContext {
        FunctionContext {
            file_path: Some("/data/incoming/orders_2023.json".to_string()),
            account_id: Some("acc-42".to_string()),
            table_name: Some("orders".to_string()),
        }
    }

    #[test]
    fn test_dispatch_by_containment() {
        assert_eq!(CustomFunction::from_token("${getDate}"), Some(CustomFunction::GetDate));
        assert_eq!(
            CustomFunction::from_token("${getAccountId()}"),
            Some(CustomFunction::GetAccountId)
        );
        assert_eq!(CustomFunction::from_token("${getSomething}"), None);
        // 同時包含多個名稱時取第一順位
        assert_eq!(
            CustomFunction::from_token("${getTableName_getDate}"),
            Some(CustomFunction::GetDate)
        );
    }

    #[test]
    fn test_evaluate_context_values() {
        let ctx = context();
        let records = vec![json!({"id": 1}).as_object().unwrap().clone()];
        let scope = FunctionScope {
            context: &ctx,
            raw_records: &records,
            now: Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap(),
        };

        assert_eq!(evaluate(CustomFunction::GetDate, &scope), json!("2024-03-05T07:08:09"));
        assert_eq!(evaluate(CustomFunction::GetFileName, &scope), json!("orders_2023.json"));
        assert_eq!(evaluate(CustomFunction::GetAccountId, &scope), json!("acc-42"));
        assert_eq!(evaluate(CustomFunction::GetTableName, &scope), json!("orders"));
        assert_eq!(evaluate(CustomFunction::GetAllData, &scope), json!("[{\"id\":1}]"));
    }

    #[test]
    fn test_missing_context_values_are_null() {
        let ctx = FunctionContext::default();
        let scope = FunctionScope {
            context: &ctx,
            raw_records: &[],
            now: Utc::now(),
        };
        assert_eq!(evaluate(CustomFunction::GetFileName, &scope), Value::Null);
        assert_eq!(evaluate(CustomFunction::GetAccountId, &scope), Value::Null);
        assert_eq!(evaluate(CustomFunction::GetAllData, &scope), json!("[]"));
    }
}
