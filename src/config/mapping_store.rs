use crate::domain::mapping::MappingConfig;
use crate::domain::ports::MappingSource;
use crate::utils::error::{EtlError, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;

/// JSON mapping 檔：頂層 key 為 mapping key，值為該 key 的設定
///
/// 個別設定在查詢時才解析，壞掉的 key 不影響其他 key。
#[derive(Debug, Clone, Default)]
pub struct JsonMappingStore {
    entries: Map<String, Value>,
}

impl JsonMappingStore {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read(&path)?;
        let value: Value = serde_json::from_slice(&content)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(entries) => Ok(Self { entries }),
            _ => Err(EtlError::config(
                "mapping file must be a JSON object keyed by mapping key",
            )),
        }
    }
}

impl MappingSource for JsonMappingStore {
    fn get_key_map(&self, mapping_key: &str) -> Result<Option<MappingConfig>> {
        let Some(entry) = self.entries.get(mapping_key) else {
            return Ok(None);
        };

        serde_json::from_value(entry.clone())
            .map(Some)
            .map_err(|e| EtlError::ConfigValidationError {
                field: format!("mapping.{}", mapping_key),
                message: e.to_string(),
            })
    }
}

impl MappingSource for HashMap<String, MappingConfig> {
    fn get_key_map(&self, mapping_key: &str) -> Result<Option<MappingConfig>> {
        Ok(self.get(mapping_key).cloned())
    }
}
