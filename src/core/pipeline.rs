use crate::config::JobConfig;
use crate::core::tabular::{normalize_records, render_csv};
use crate::core::transformer::DataTransformer;
use crate::domain::model::TransformResult;
use crate::domain::ports::{MappingSource, Pipeline, Storage};
use crate::utils::error::{EtlError, Result};
use reqwest::Client;
use serde_json::Value;
use std::io::Write;
use std::time::Duration;
use zip::write::{FileOptions, ZipWriter};

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// 讀取 JSON payload、依 mapping 轉換、輸出 JSON/CSV
pub struct MappingPipeline<S: Storage, M: MappingSource> {
    source_storage: S,
    sink_storage: S,
    job: JobConfig,
    transformer: DataTransformer<M>,
    client: Client,
}

impl<S: Storage, M: MappingSource> MappingPipeline<S, M> {
    pub fn new(source_storage: S, sink_storage: S, job: JobConfig, transformer: DataTransformer<M>) -> Self {
        Self {
            source_storage,
            sink_storage,
            job,
            transformer,
            client: Client::new(),
        }
    }

    pub fn job(&self) -> &JobConfig {
        &self.job
    }

    async fn fetch_api(&self) -> Result<Value> {
        let endpoint = self
            .job
            .source
            .endpoint
            .as_deref()
            .ok_or_else(|| EtlError::MissingConfigError {
                field: "source.endpoint".to_string(),
            })?;

        tracing::debug!("Making API request to: {}", endpoint);
        let mut request = self.client.get(endpoint).timeout(Duration::from_secs(
            self.job.source.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS),
        ));
        if let Some(headers) = &self.job.source.headers {
            for (name, value) in headers {
                request = request.header(name.as_str(), value.as_str());
            }
        }
        if let Some(parameters) = &self.job.source.parameters {
            request = request.query(parameters);
        }

        let response = request.send().await?;
        tracing::debug!("API response status: {}", response.status());
        if !response.status().is_success() {
            return Err(EtlError::ProcessingError {
                message: format!("{} returned HTTP {}", endpoint, response.status()),
            });
        }

        Ok(response.json().await?)
    }

    async fn read_source_file(&self) -> Result<Value> {
        let path = self
            .job
            .source
            .path
            .as_deref()
            .ok_or_else(|| EtlError::MissingConfigError {
                field: "source.path".to_string(),
            })?;

        tracing::debug!("Reading payload from: {}", path);
        let bytes = self.source_storage.read_file(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn render_outputs(&self, result: &TransformResult) -> Result<Vec<(String, Vec<u8>)>> {
        let records = normalize_records(&result.processed_records);
        let mut files = Vec::new();

        for format in &self.job.load.output_formats {
            let content = match format.as_str() {
                "json" => {
                    let rows: Vec<&serde_json::Map<String, Value>> =
                        records.iter().map(|r| &r.data).collect();
                    serde_json::to_vec_pretty(&rows)?
                }
                "csv" => render_csv(&records)?.into_bytes(),
                other => {
                    return Err(EtlError::InvalidConfigValueError {
                        field: "load.output_formats".to_string(),
                        value: other.to_string(),
                        reason: "Unsupported format".to_string(),
                    })
                }
            };
            files.push((self.job.output_filename(format), content));
        }
        Ok(files)
    }
}

fn build_archive(files: &[(String, Vec<u8>)], report: &[u8]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

    for (name, content) in files {
        zip.start_file::<_, ()>(name.as_str(), FileOptions::default())?;
        zip.write_all(content)?;
    }
    zip.start_file::<_, ()>("report.json", FileOptions::default())?;
    zip.write_all(report)?;

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[async_trait::async_trait]
impl<S, M> Pipeline for MappingPipeline<S, M>
where
    S: Storage,
    M: MappingSource + Send + Sync,
{
    async fn extract(&self) -> Result<Value> {
        if self.job.is_api_source() {
            self.fetch_api().await
        } else {
            self.read_source_file().await
        }
    }

    async fn transform(&self, payload: Value) -> Result<TransformResult> {
        self.transformer.process_data(
            &payload,
            self.job.mapping.schema.as_ref(),
            self.job.mapping.mapping_key.as_deref(),
        )
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let files = self.render_outputs(&result)?;
        let output_path = &self.job.load.output_path;

        if let Some(archive_name) = self.job.archive_filename() {
            let report = serde_json::to_vec_pretty(&result.report)?;
            let zip_data = build_archive(&files, &report)?;

            tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
            self.sink_storage.write_file(&archive_name, &zip_data).await?;
            return Ok(format!("{}/{}", output_path, archive_name));
        }

        for (name, content) in &files {
            tracing::debug!("Writing {} ({} bytes)", name, content.len());
            self.sink_storage.write_file(name, content).await?;
        }

        match files.as_slice() {
            [(name, _)] => Ok(format!("{}/{}", output_path, name)),
            _ => Ok(output_path.clone()),
        }
    }
}
