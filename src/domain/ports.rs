use crate::domain::mapping::MappingConfig;
use crate::domain::model::{Record, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// mapping key -> MappingConfig 的來源
pub trait MappingSource {
    /// 找不到 key 時回傳 `Ok(None)`；設定內容無法解析時才是錯誤
    fn get_key_map(&self, mapping_key: &str) -> Result<Option<MappingConfig>>;
}

/// 接收扁平化記錄的表格輸出端
pub trait RecordSink {
    fn write_records(&mut self, records: &[Record]) -> Result<()>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Value>;
    async fn transform(&self, payload: Value) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
