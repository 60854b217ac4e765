use crate::core::coercion::{coerce, TypeTag};
use crate::core::functions::{evaluate, CustomFunction, FunctionScope};
use crate::domain::model::RawRecord;
use crate::utils::error::FieldError;
use serde_json::Value;

/// 解析後的欄位表達式
///
/// - `"path"` / `"a.b.c"`：取值
/// - `"path:TYPE"`：取值後轉型
/// - `"${getDate}"`：自訂函式
#[derive(Debug, Clone, PartialEq)]
pub enum FieldExpression {
    Function {
        token: String,
        function: Option<CustomFunction>,
    },
    Path {
        path: String,
        type_tag: Option<TypeTag>,
    },
}

impl FieldExpression {
    pub fn parse(expression: &str) -> Self {
        let (path, type_tag) = match expression.split_once(':') {
            Some((path, tag)) => (path, Some(TypeTag::parse(tag))),
            None => (expression, None),
        };

        if path.contains("${") {
            return FieldExpression::Function {
                token: path.to_string(),
                function: CustomFunction::from_token(path),
            };
        }

        FieldExpression::Path {
            path: path.to_string(),
            type_tag,
        }
    }
}

/// 取值所需的設定與函式環境
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    pub split_json_by_dot: bool,
    pub scope: FunctionScope<'a>,
}

impl Resolver<'_> {
    pub fn resolve(&self, record: &RawRecord, expression: &FieldExpression) -> Result<Value, FieldError> {
        match expression {
            FieldExpression::Function {
                function: Some(function),
                ..
            } => Ok(evaluate(*function, &self.scope)),
            FieldExpression::Function {
                token,
                function: None,
            } => Err(FieldError::Unresolved {
                field: token.clone(),
                reason: "unknown custom function".to_string(),
            }),
            FieldExpression::Path { path, type_tag } => {
                let raw = lookup(record, path, self.split_json_by_dot).unwrap_or(&Value::Null);
                coerce(raw, type_tag.as_ref()).map_err(|source| FieldError::Coercion {
                    field: path.clone(),
                    source,
                })
            }
        }
    }
}

/// 取出欄位值；開啟 dot 分割時逐層往下找，任何一層缺少即回傳 None
///
/// 遇到列表時，數字片段視為索引（`items.0.sku`）。
pub fn lookup<'v>(record: &'v RawRecord, path: &str, split_json_by_dot: bool) -> Option<&'v Value> {
    if !(split_json_by_dot && path.contains('.')) {
        return record.get(path);
    }

    let mut segments = path.split('.');
    let mut current = record.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::functions::FunctionContext;
    use crate::utils::error::CoercionError;
    use chrono::Utc;
    use serde_json::json;

    fn record(value: Value) -> RawRecord {
        value.as_object().unwrap().clone()
    }

    fn resolver(ctx: &FunctionContext, split: bool) -> Resolver<'_> {
        Resolver {
            split_json_by_dot: split,
            scope: FunctionScope {
                context: ctx,
                raw_records: &[],
                now: Utc::now(),
            },
        }
    }

    #[test]
    fn test_parse_expressions() {
        assert_eq!(
            FieldExpression::parse("amount:FLOAT64"),
            FieldExpression::Path {
                path: "amount".to_string(),
                type_tag: Some(TypeTag::Float64)
            }
        );
        assert_eq!(
            FieldExpression::parse("user.name"),
            FieldExpression::Path {
                path: "user.name".to_string(),
                type_tag: None
            }
        );
        assert_eq!(
            FieldExpression::parse("${getTableName}"),
            FieldExpression::Function {
                token: "${getTableName}".to_string(),
                function: Some(CustomFunction::GetTableName)
            }
        );
    }

    #[test]
    fn test_type_tag_splits_on_first_colon() {
        assert_eq!(
            FieldExpression::parse("a:TIMESTAMP:extra"),
            FieldExpression::Path {
                path: "a".to_string(),
                type_tag: Some(TypeTag::Other("TIMESTAMP:extra".to_string()))
            }
        );
    }

    #[test]
    fn test_dot_path_resolution() {
        let ctx = FunctionContext::default();
        let r = record(json!({"a": {"b": 5}}));
        let expr = FieldExpression::parse("a.b:INT64");

        assert_eq!(resolver(&ctx, true).resolve(&r, &expr).unwrap(), json!(5));
        // 未開啟 dot 分割時找的是字面上的 "a.b"
        assert_eq!(resolver(&ctx, false).resolve(&r, &expr).unwrap(), Value::Null);
    }

    #[test]
    fn test_missing_intermediate_yields_null() {
        let r = record(json!({"a": {"c": 1}}));
        assert_eq!(lookup(&r, "a.b.c", true), None);
        assert_eq!(lookup(&r, "x.c", true), None);
        assert_eq!(lookup(&r, "a.c.d", true), None);
    }

    #[test]
    fn test_literal_dotted_key_without_split() {
        let r = record(json!({"a.b": "literal"}));
        assert_eq!(lookup(&r, "a.b", false), Some(&json!("literal")));
    }

    #[test]
    fn test_array_index_segment() {
        let r = record(json!({"items": [{"sku": "A"}, {"sku": "B"}]}));
        assert_eq!(lookup(&r, "items.1.sku", true), Some(&json!("B")));
        assert_eq!(lookup(&r, "items.9.sku", true), None);
    }

    #[test]
    fn test_unknown_function_is_unresolved() {
        let ctx = FunctionContext::default();
        let err = resolver(&ctx, false)
            .resolve(&RawRecord::new(), &FieldExpression::parse("${getWeather}"))
            .unwrap_err();
        assert!(matches!(err, FieldError::Unresolved { .. }));
    }

    #[test]
    fn test_coercion_error_carries_field() {
        let ctx = FunctionContext::default();
        let r = record(json!({"qty": "abc"}));
        let err = resolver(&ctx, false)
            .resolve(&r, &FieldExpression::parse("qty:INT64"))
            .unwrap_err();
        match err {
            FieldError::Coercion { field, source } => {
                assert_eq!(field, "qty");
                assert!(matches!(source, CoercionError::NotNumeric { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_function_value_is_not_coerced() {
        let ctx = FunctionContext {
            account_id: Some("007".to_string()),
            ..FunctionContext::default()
        };
        let value = resolver(&ctx, false)
            .resolve(&RawRecord::new(), &FieldExpression::parse("${getAccountId}:INT64"))
            .unwrap();
        assert_eq!(value, json!("007"));
    }
}
