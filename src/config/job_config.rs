use crate::core::functions::FunctionContext;
use crate::core::transformer::CoercionPolicy;
use crate::domain::mapping::FieldMappings;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_one_of, validate_path, validate_required_field,
    validate_url, Validate,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

pub const SOURCE_TYPES: [&str; 2] = ["file", "api"];
pub const OUTPUT_FORMATS: [&str; 2] = ["json", "csv"];

#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    pub job: JobInfo,
    pub source: SourceConfig,
    pub mapping: MappingSettings,
    pub context: Option<ContextConfig>,
    pub load: LoadConfig,
    pub error_handling: Option<ErrorHandlingConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobInfo {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub r#type: String,
    pub path: Option<String>,
    pub endpoint: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub headers: Option<HashMap<String, String>>,
    pub parameters: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MappingSettings {
    /// JSON mapping 檔，頂層為 mapping key -> 設定
    pub config_file: Option<String>,
    pub mapping_key: Option<String>,
    /// 覆寫或取代 db_col_to_json_mapping
    pub schema: Option<FieldMappings>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContextConfig {
    pub account_id: Option<String>,
    pub table_name: Option<String>,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    pub output_formats: Vec<String>,
    pub filenames: Option<FilenameConfig>,
    pub compression: Option<CompressionConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilenameConfig {
    pub json: Option<String>,
    pub csv: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompressionConfig {
    pub enabled: bool,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorHandlingConfig {
    pub on_coercion_error: Option<String>,
}

impl JobConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = substitute_env_vars(content)?;
        Ok(toml::from_str(&processed)?)
    }

    pub fn coercion_policy(&self) -> Result<CoercionPolicy> {
        match self
            .error_handling
            .as_ref()
            .and_then(|e| e.on_coercion_error.as_deref())
        {
            Some(policy) => policy.parse(),
            None => Ok(CoercionPolicy::default()),
        }
    }

    /// 自訂函式的執行資訊；未指定 file_name 時使用輸入檔路徑
    pub fn function_context(&self) -> FunctionContext {
        let context = self.context.clone().unwrap_or_default();
        FunctionContext {
            file_path: context.file_name.or_else(|| self.source.path.clone()),
            account_id: context.account_id,
            table_name: context.table_name,
        }
    }

    pub fn is_api_source(&self) -> bool {
        self.source.r#type == "api"
    }

    pub fn output_filename(&self, format: &str) -> String {
        let configured = self.load.filenames.as_ref().and_then(|f| match format {
            "json" => f.json.clone(),
            "csv" => f.csv.clone(),
            _ => None,
        });
        configured.unwrap_or_else(|| format!("{}.{}", self.job.name, format))
    }

    /// 啟用壓縮時的 ZIP 檔名
    pub fn archive_filename(&self) -> Option<String> {
        self.load
            .compression
            .as_ref()
            .filter(|c| c.enabled)
            .map(|c| {
                c.filename
                    .clone()
                    .unwrap_or_else(|| format!("{}_output.zip", self.job.name))
            })
    }
}

/// 替換 `${VAR}`；未設定的變數保留原樣
fn substitute_env_vars(content: &str) -> Result<String> {
    let re = regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
        .map_err(|e| EtlError::config(format!("invalid substitution pattern: {}", e)))?;

    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    });
    Ok(result.into_owned())
}

impl Validate for JobConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("job.name", &self.job.name)?;

        validate_one_of("source.type", &self.source.r#type, &SOURCE_TYPES)?;
        if self.is_api_source() {
            let endpoint = validate_required_field("source.endpoint", &self.source.endpoint)?;
            validate_url("source.endpoint", endpoint)?;
        } else {
            let path = validate_required_field("source.path", &self.source.path)?;
            validate_path("source.path", path)?;
        }

        if self.mapping.mapping_key.is_none() && self.mapping.schema.is_none() {
            return Err(EtlError::MissingConfigError {
                field: "mapping.mapping_key or mapping.schema".to_string(),
            });
        }
        if self.mapping.mapping_key.is_some() {
            let file = validate_required_field("mapping.config_file", &self.mapping.config_file)?;
            validate_path("mapping.config_file", file)?;
        }

        validate_path("load.output_path", &self.load.output_path)?;
        if self.load.output_formats.is_empty() {
            return Err(EtlError::MissingConfigError {
                field: "load.output_formats".to_string(),
            });
        }
        for format in &self.load.output_formats {
            validate_one_of("load.output_formats", format, &OUTPUT_FORMATS)?;
        }

        self.coercion_policy()?;
        Ok(())
    }
}
