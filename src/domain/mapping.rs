use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// 一組欄位映射設定，對應 mapping 檔中的一個 key
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MappingConfig {
    #[serde(default)]
    pub json_data_config: JsonDataConfig,
    #[serde(default)]
    pub special_mapping: Vec<SpecialMappingRule>,
    #[serde(default)]
    pub db_col_to_json_mapping: Option<FieldMappings>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub split_json_by_dot: bool,
}

impl MappingConfig {
    /// 只有 schema、沒有 mapping key 時使用的預設設定
    pub fn from_schema(schema: FieldMappings) -> Self {
        Self {
            db_col_to_json_mapping: Some(schema),
            ..Self::default()
        }
    }

    pub fn primary_key(&self) -> Option<&str> {
        self.json_data_config.primary_key.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct JsonDataConfig {
    #[serde(default)]
    pub data_envelope: Option<DataEnvelope>,
    #[serde(default)]
    pub primary_key: Option<String>,
}

/// 資料所在的路徑：單一 key 或逐層 key 列表
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DataEnvelope {
    Key(String),
    Path(Vec<String>),
}

impl DataEnvelope {
    pub fn keys(&self) -> Vec<&str> {
        match self {
            DataEnvelope::Key(key) => vec![key.as_str()],
            DataEnvelope::Path(keys) => keys.iter().map(String::as_str).collect(),
        }
    }

    /// 空字串或空列表視為未設定
    pub fn is_empty(&self) -> bool {
        match self {
            DataEnvelope::Key(key) => key.is_empty(),
            DataEnvelope::Path(keys) => keys.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpecialMappingRule {
    pub key: String,
    pub action: SplitAction,
    #[serde(default)]
    pub datatype_conversion: DatatypeConversion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitAction {
    Split,
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DatatypeConversion {
    #[serde(default)]
    pub list: Option<String>,
    #[serde(default, rename = "str")]
    pub scalar: Option<String>,
}

impl DatatypeConversion {
    pub fn target_dtype(&self, value_is_list: bool) -> Option<&str> {
        if value_is_list {
            self.list.as_deref()
        } else {
            self.scalar.as_deref()
        }
    }
}

/// 輸出欄位名稱 -> 欄位表達式，保留設定檔中的順序
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct FieldMappings(Vec<(String, String)>);

impl FieldMappings {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut mappings = Self::default();
        for (column, expression) in pairs {
            mappings.insert(column.into(), expression.into());
        }
        mappings
    }

    /// 同名欄位就地取代，新欄位附加在最後
    pub fn insert(&mut self, column: String, expression: String) {
        match self.0.iter_mut().find(|(existing, _)| *existing == column) {
            Some(entry) => entry.1 = expression,
            None => self.0.push((column, expression)),
        }
    }

    pub fn merged_with(&self, overrides: &FieldMappings) -> FieldMappings {
        let mut merged = self.clone();
        for (column, expression) in overrides.iter() {
            merged.insert(column.to_string(), expression.to_string());
        }
        merged
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(c, e)| (c.as_str(), e.as_str()))
    }

    pub fn columns(&self) -> Vec<&str> {
        self.0.iter().map(|(c, _)| c.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Map<String, Value>> for FieldMappings {
    type Error = String;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut pairs = Vec::with_capacity(map.len());
        for (column, expression) in map {
            match expression {
                Value::String(expression) => pairs.push((column, expression)),
                other => {
                    return Err(format!(
                        "field expression for '{}' must be a string, found {}",
                        column, other
                    ))
                }
            }
        }
        Ok(FieldMappings(pairs))
    }
}

// 舊版 mapping 檔把旗標存成字串 "True"
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(flag)) => flag,
        Some(Flag::Text(text)) => text.eq_ignore_ascii_case("true"),
        None => false,
    })
}
