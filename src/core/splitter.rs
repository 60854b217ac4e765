use crate::core::envelope::value_kind;
use crate::domain::mapping::{SpecialMappingRule, SplitAction};
use crate::domain::model::RawRecord;
use crate::utils::error::SplitError;
use serde_json::Value;

/// 依 special_mapping 規則把一筆記錄展開成多筆
///
/// 規則為空時原樣回傳。否則先取出 `primary_key` 底下的物件（未設定
/// `primary_key` 時使用整筆記錄），每條規則各自展開，結果依規則順序串接。
pub fn split_record(
    record: &RawRecord,
    rules: &[SpecialMappingRule],
    primary_key: Option<&str>,
) -> Result<Vec<RawRecord>, SplitError> {
    if rules.is_empty() {
        return Ok(vec![record.clone()]);
    }

    let dict_obj = match primary_key {
        Some(key) => {
            let nested = record
                .get(key)
                .ok_or_else(|| SplitError::MissingPrimaryKey(key.to_string()))?;
            nested.as_object().ok_or_else(|| SplitError::NotAnObject {
                key: key.to_string(),
                found: value_kind(nested),
            })?
        }
        None => record,
    };

    Ok(rules
        .iter()
        .flat_map(|rule| expand_by_rule(dict_obj, rule))
        .collect())
}

/// 單一規則：`rule.key` 為列表且目標型別為 dict 時，每個元素產生一筆
pub fn expand_by_rule(dict_obj: &RawRecord, rule: &SpecialMappingRule) -> Vec<RawRecord> {
    let items = match dict_obj.get(&rule.key) {
        Some(Value::Array(items)) => Some(items),
        _ => None,
    };
    let target_dtype = rule.datatype_conversion.target_dtype(items.is_some());

    match items {
        Some(items) if target_dtype == Some("dict") && rule.action == SplitAction::Split => items
            .iter()
            .map(|item| {
                let mut expanded = dict_obj.clone();
                expanded.insert(rule.key.clone(), item.clone());
                expanded
            })
            .collect(),
        _ => vec![dict_obj.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::mapping::DatatypeConversion;
    use serde_json::json;

    fn rule(key: &str, list_dtype: &str) -> SpecialMappingRule {
        SpecialMappingRule {
            key: key.to_string(),
            action: SplitAction::Split,
            datatype_conversion: DatatypeConversion {
                list: Some(list_dtype.to_string()),
                scalar: Some("str".to_string()),
            },
        }
    }

    fn record(value: Value) -> RawRecord {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_empty_rules_pass_through() {
        let input = record(json!({"id": 1, "items": [1, 2]}));
        let out = split_record(&input, &[], Some("order")).unwrap();
        assert_eq!(out, vec![input]);
    }

    #[test]
    fn test_split_list_into_records() {
        let input = record(json!({
            "order": {
                "id": 10,
                "items": [{"sku": "A"}, {"sku": "B"}, {"sku": "C"}],
                "tags": ["x", "y"]
            }
        }));
        let out = split_record(&input, &[rule("items", "dict")], Some("order")).unwrap();

        assert_eq!(out.len(), 3);
        for (i, sku) in ["A", "B", "C"].iter().enumerate() {
            assert_eq!(out[i]["items"], json!({ "sku": sku }));
            assert_eq!(out[i]["id"], json!(10));
            // 其他列表欄位維持原值
            assert_eq!(out[i]["tags"], json!(["x", "y"]));
        }
    }

    #[test]
    fn test_non_dict_target_keeps_record() {
        let input = record(json!({"order": {"items": [1, 2]}}));
        let out = split_record(&input, &[rule("items", "str")], Some("order")).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["items"], json!([1, 2]));
    }

    #[test]
    fn test_unsupported_action_keeps_record() {
        let mut r = rule("items", "dict");
        r.action = SplitAction::Unsupported;
        let input = record(json!({"order": {"items": [1, 2]}}));
        assert_eq!(split_record(&input, &[r], Some("order")).unwrap().len(), 1);
    }

    #[test]
    fn test_scalar_value_keeps_record() {
        let input = record(json!({"order": {"items": "single"}}));
        let out = split_record(&input, &[rule("items", "dict")], Some("order")).unwrap();
        assert_eq!(out, vec![record(json!({"items": "single"}))]);
    }

    #[test]
    fn test_empty_list_yields_no_records() {
        let input = record(json!({"order": {"items": []}}));
        let out = split_record(&input, &[rule("items", "dict")], Some("order")).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_missing_primary_key_is_error() {
        let input = record(json!({"other": {}}));
        let err = split_record(&input, &[rule("items", "dict")], Some("order")).unwrap_err();
        assert_eq!(err, SplitError::MissingPrimaryKey("order".to_string()));
    }

    #[test]
    fn test_primary_key_not_object_is_error() {
        let input = record(json!({"order": [1, 2]}));
        let err = split_record(&input, &[rule("items", "dict")], Some("order")).unwrap_err();
        assert!(matches!(err, SplitError::NotAnObject { found: "list", .. }));
    }

    #[test]
    fn test_without_primary_key_uses_record() {
        let input = record(json!({"id": 1, "lines": [{"n": 1}, {"n": 2}]}));
        let out = split_record(&input, &[rule("lines", "dict")], None).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[1]["lines"], json!({"n": 2}));
    }

    #[test]
    fn test_each_rule_expands_independently() {
        let input = record(json!({"a": [1, 2], "b": [3, 4, 5]}));
        let out = split_record(&input, &[rule("a", "dict"), rule("b", "dict")], None).unwrap();
        assert_eq!(out.len(), 5);
        assert_eq!(out[0]["a"], json!(1));
        assert_eq!(out[0]["b"], json!([3, 4, 5]));
        assert_eq!(out[4]["b"], json!(5));
        assert_eq!(out[4]["a"], json!([1, 2]));
    }
}
