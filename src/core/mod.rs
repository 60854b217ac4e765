pub mod coercion;
pub mod envelope;
pub mod etl;
pub mod functions;
pub mod pipeline;
pub mod resolver;
pub mod splitter;
pub mod tabular;
pub mod transformer;

pub use crate::domain::mapping::{FieldMappings, MappingConfig};
pub use crate::domain::model::{RawRecord, Record, TransformReport, TransformResult};
pub use crate::domain::ports::{MappingSource, Pipeline, RecordSink, Storage};
pub use crate::utils::error::Result;
