pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{cli::LocalStorage, JobConfig, JsonMappingStore};

pub use core::{
    etl::EtlEngine,
    functions::FunctionContext,
    pipeline::MappingPipeline,
    transformer::{CoercionPolicy, DataTransformer},
};
pub use domain::mapping::{FieldMappings, MappingConfig};
pub use domain::model::{Record, TransformReport, TransformResult};
pub use utils::error::{EtlError, Result};
