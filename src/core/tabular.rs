use crate::domain::model::Record;
use crate::domain::ports::RecordSink;
use crate::utils::error::{EtlError, Result};
use serde_json::{Map, Value};
use std::io::Write;

/// 巢狀物件攤平成 `a.b` 欄位，字串 "None" 視為 null
pub fn normalize_records(records: &[Record]) -> Vec<Record> {
    records
        .iter()
        .map(|record| {
            let mut flat = Map::new();
            flatten_into(&mut flat, None, &record.data);
            Record::new(flat)
        })
        .collect()
}

fn flatten_into(target: &mut Map<String, Value>, prefix: Option<&str>, source: &Map<String, Value>) {
    for (key, value) in source {
        let column = match prefix {
            Some(prefix) => format!("{}.{}", prefix, key),
            None => key.clone(),
        };
        match value {
            Value::Object(nested) if !nested.is_empty() => flatten_into(target, Some(&column), nested),
            Value::String(s) if s == "None" => {
                target.insert(column, Value::Null);
            }
            other => {
                target.insert(column, other.clone());
            }
        }
    }
}

/// 所有記錄的欄位聯集，依第一次出現的順序
pub fn collect_columns(records: &[Record]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for key in record.data.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// 把記錄寫成 CSV，第一批記錄決定表頭
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    columns: Option<Vec<String>>,
}

impl<W: Write> CsvSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(inner),
            columns: None,
        }
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| EtlError::IoError(e.into_error()))
    }
}

impl<W: Write> RecordSink for CsvSink<W> {
    fn write_records(&mut self, records: &[Record]) -> Result<()> {
        if self.columns.is_none() {
            let columns = collect_columns(records);
            if columns.is_empty() {
                return Ok(());
            }
            self.writer.write_record(&columns)?;
            self.columns = Some(columns);
        }

        if let Some(columns) = &self.columns {
            for record in records {
                let row: Vec<String> = columns.iter().map(|c| cell(record.get(c))).collect();
                self.writer.write_record(&row)?;
            }
        }
        self.writer.flush()?;
        Ok(())
    }
}

pub fn render_csv(records: &[Record]) -> Result<String> {
    let mut sink = CsvSink::new(Vec::new());
    sink.write_records(records)?;
    let bytes = sink.into_inner()?;
    String::from_utf8(bytes).map_err(|e| EtlError::ProcessingError {
        message: format!("CSV output is not valid UTF-8: {}", e),
    })
}
