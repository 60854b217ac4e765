use thiserror::Error;

/// 型別轉換失敗（FLOAT64 / INT64 / TIMESTAMP / DATE）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoercionError {
    #[error("Cannot convert {value} to {target}")]
    NotNumeric { value: String, target: &'static str },

    #[error("The timestamp did not match any of the allowed formats: {0}")]
    NoMatchingTimestampFormat(String),

    #[error("Unparseable date: {0}")]
    UnparseableDate(String),
}

impl CoercionError {
    /// DATE 解析失敗只影響單一欄位，其餘由批次策略決定
    pub fn is_field_local(&self) -> bool {
        matches!(self, CoercionError::UnparseableDate(_))
    }
}

/// data_envelope 無法定位到記錄列表
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnvelopeError {
    #[error("Envelope key '{0}' not found in payload")]
    MissingKey(String),

    #[error("Envelope does not hold a list or object (found {0})")]
    NotACollection(&'static str),
}

/// special_mapping 展開單筆記錄時的錯誤
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SplitError {
    #[error("Primary key '{0}' not found in record")]
    MissingPrimaryKey(String),

    #[error("Value under '{key}' is not an object (found {found})")]
    NotAnObject { key: String, found: &'static str },
}

/// 單一欄位解析結果的錯誤
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("Field '{field}' could not be resolved: {reason}")]
    Unresolved { field: String, reason: String },

    #[error("Field '{field}': {source}")]
    Coercion {
        field: String,
        #[source]
        source: CoercionError,
    },
}

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Coercion error: {0}")]
    CoercionError(#[from] CoercionError),

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn config(message: impl Into<String>) -> Self {
        EtlError::ConfigError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EtlError::ApiError(_) => ErrorCategory::Network,
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::CoercionError(_)
            | EtlError::ProcessingError { .. } => ErrorCategory::Data,
            EtlError::ZipError(_) | EtlError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::ConfigError { .. } | EtlError::MissingConfigError { .. } => {
                "Check the job file and the mapping file for the requested mapping key"
            }
            EtlError::ConfigValidationError { .. } | EtlError::InvalidConfigValueError { .. } => {
                "Fix the reported configuration field and run again"
            }
            EtlError::ApiError(_) => "Verify the source endpoint is reachable and returns JSON",
            EtlError::CoercionError(_) => {
                "Fix the source value or the type tag in db_col_to_json_mapping, or set on_coercion_error = \"skip_record\""
            }
            EtlError::SerializationError(_) => "Make sure the payload and mapping file are valid JSON",
            EtlError::CsvError(_) | EtlError::ProcessingError { .. } => {
                "Inspect the input payload for unexpected shapes"
            }
            EtlError::ZipError(_) | EtlError::IoError(_) => {
                "Check file permissions and available disk space"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Network => format!("Could not fetch the source payload: {}", self),
            ErrorCategory::Data => format!("Could not transform the payload: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

impl From<toml::de::Error> for EtlError {
    fn from(e: toml::de::Error) -> Self {
        EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
