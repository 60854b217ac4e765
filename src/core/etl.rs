use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use serde_json::Value;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting ETL process...");

        tracing::info!("Extracting data...");
        let payload = self.pipeline.extract().await?;
        tracing::info!("Extracted payload ({})", describe(&payload));

        tracing::info!("Transforming data...");
        let result = self.pipeline.transform(payload).await?;
        let report = &result.report;
        tracing::info!(
            "Transformed {} records (expanded {}, skipped {}, null-filled fields {}, split failures {})",
            report.output_record_count,
            report.expanded_record_count,
            report.skipped_records,
            report.field_failures,
            report.split_failures
        );

        tracing::info!("Loading data...");
        let output_path = self.pipeline.load(result).await?;
        tracing::info!("Output saved to: {}", output_path);

        Ok(output_path)
    }
}

fn describe(payload: &Value) -> String {
    match payload {
        Value::Array(items) => format!("{} top-level items", items.len()),
        Value::Object(map) => format!("object with {} keys", map.len()),
        _ => "scalar".to_string(),
    }
}
