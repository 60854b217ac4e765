use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 原始 JSON 物件，一筆代表一個輸入實體
pub type RawRecord = Map<String, Value>;

/// 扁平化後的輸出記錄，欄位順序與 mapping 設定一致
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub data: Map<String, Value>,
}

impl Record {
    pub fn new(data: Map<String, Value>) -> Self {
        Self { data }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }
}

impl From<RawRecord> for Record {
    fn from(data: RawRecord) -> Self {
        Self { data }
    }
}

/// 單次轉換的統計，用於診斷
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransformReport {
    pub raw_record_count: usize,
    pub expanded_record_count: usize,
    pub output_record_count: usize,
    pub split_failures: usize,
    pub field_failures: usize,
    pub skipped_records: usize,
    pub pass_through: bool,
}

impl TransformReport {
    pub fn has_count_mismatch(&self) -> bool {
        self.raw_record_count != self.output_record_count
    }
}

/// 原始 payload 與轉換後記錄
#[derive(Debug, Clone)]
pub struct TransformResult {
    pub raw_data: Value,
    pub processed_records: Vec<Record>,
    pub report: TransformReport,
}
