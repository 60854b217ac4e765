use anyhow::Result;
use chrono::{TimeZone, Utc};
use json_mapping_etl::{
    CoercionPolicy, DataTransformer, FieldMappings, FunctionContext, JsonMappingStore,
};
use serde_json::{json, Value};

fn store() -> Result<JsonMappingStore> {
    Ok(JsonMappingStore::from_value(json!({
        "events": {
            "json_data_config": {"data_envelope": "events"},
            "special_mapping": [
                {"key": "tags", "action": "split", "datatype_conversion": {"list": "dict", "str": "str"}}
            ],
            "db_col_to_json_mapping": {
                "event_id": "id:INT64",
                "tag": "tags.name",
                "first_attendee": "attendees.0.email",
                "happened_at": "at:TIMESTAMP",
                "flag": "active:BOOL",
                "extra": "payload:JSON",
                "table": "${getTableName}",
                "loaded_at": "${getDate}"
            },
            "split_json_by_dot": true
        },
        "literal_dots": {
            "db_col_to_json_mapping": {"value": "a.b"}
        }
    }))?)
}

/// 多階層路徑、陣列索引與自訂函式
#[test]
fn test_nested_and_indexed_paths() -> Result<()> {
    let transformer = DataTransformer::new(store()?)
        .with_context(FunctionContext {
            table_name: Some("events_tbl".to_string()),
            ..FunctionContext::default()
        })
        .with_fixed_time(Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap());

    let payload = json!({
        "events": [{
            "id": "9",
            "tags": [{"name": "rust"}, {"name": "etl"}],
            "attendees": [{"email": "a@example.com"}, {"email": "b@example.com"}],
            "at": "2024-02-29T23:00:00-02:00",
            "active": "yes",
            "payload": {"k": [1, 2]}
        }]
    });

    let records = transformer.transform(&payload, "events", None)?;
    assert_eq!(records.len(), 2);

    let first = &records[0];
    assert_eq!(first.get("event_id"), Some(&json!(9)));
    assert_eq!(first.get("tag"), Some(&json!("rust")));
    assert_eq!(first.get("first_attendee"), Some(&json!("a@example.com")));
    assert_eq!(first.get("happened_at"), Some(&json!("2024-03-01T01:00:00+00:00")));
    assert_eq!(first.get("extra"), Some(&json!("{\"k\":[1,2]}")));
    assert_eq!(first.get("table"), Some(&json!("events_tbl")));
    assert_eq!(first.get("loaded_at"), Some(&json!("2024-03-01T06:00:00")));
    assert_eq!(records[1].get("tag"), Some(&json!("etl")));

    Ok(())
}

#[test]
fn test_dotted_key_read_literally_when_split_disabled() -> Result<()> {
    let transformer = DataTransformer::new(store()?);
    let records = transformer.transform(&json!([{"a.b": 3, "a": {"b": 4}}]), "literal_dots", None)?;
    assert_eq!(records[0].get("value"), Some(&json!("3")));
    Ok(())
}

#[test]
fn test_schema_only_run() -> Result<()> {
    let transformer = DataTransformer::new(JsonMappingStore::default());
    let schema = FieldMappings::from_pairs([("n", "n:FLOAT64"), ("when", "d:DATE")]);

    let result = transformer.process_data(
        &json!([{"n": "1.5", "d": "2023-01-15"}, {"n": 2, "d": "someday"}]),
        Some(&schema),
        None,
    )?;

    assert!(!result.report.pass_through);
    assert_eq!(result.processed_records[0].get("n"), Some(&json!(1.5)));
    assert_eq!(result.processed_records[0].get("when"), Some(&json!("2023-01-15")));
    // DATE 解析失敗只影響該欄位
    assert_eq!(result.processed_records[1].get("when"), Some(&Value::Null));
    assert_eq!(result.report.field_failures, 1);
    Ok(())
}

#[test]
fn test_bad_timestamp_under_each_policy() -> Result<()> {
    let schema = FieldMappings::from_pairs([("id", "id"), ("at", "at:TIMESTAMP")]);
    let payload = json!([{"id": 1, "at": "not a time"}, {"id": 2, "at": "2023-01-15"}]);

    let skipped = DataTransformer::new(JsonMappingStore::default())
        .process_data(&payload, Some(&schema), None)?;
    assert_eq!(skipped.processed_records.len(), 1);
    assert_eq!(skipped.report.skipped_records, 1);

    let nulled = DataTransformer::new(JsonMappingStore::default())
        .with_policy(CoercionPolicy::NullField)
        .process_data(&payload, Some(&schema), None)?;
    assert_eq!(nulled.processed_records.len(), 2);
    assert_eq!(nulled.processed_records[0].get("at"), Some(&Value::Null));

    let aborted = DataTransformer::new(JsonMappingStore::default())
        .with_policy(CoercionPolicy::Abort)
        .process_data(&payload, Some(&schema), None);
    assert!(aborted.is_err());
    Ok(())
}
