use crate::core::envelope::{extract_records, top_level_count};
use crate::core::functions::{FunctionContext, FunctionScope};
use crate::core::resolver::{FieldExpression, Resolver};
use crate::core::splitter::split_record;
use crate::domain::mapping::{FieldMappings, MappingConfig};
use crate::domain::model::{RawRecord, Record, TransformReport, TransformResult};
use crate::domain::ports::MappingSource;
use crate::utils::error::{EtlError, FieldError, Result};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::str::FromStr;

/// 欄位轉型失敗（INT64 / FLOAT64 / TIMESTAMP）時的批次策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CoercionPolicy {
    /// 丟棄整筆記錄，繼續處理其他記錄
    #[default]
    SkipRecord,
    /// 該欄位填 null
    NullField,
    /// 中止整個轉換
    Abort,
}

impl CoercionPolicy {
    pub const NAMES: [&'static str; 3] = ["skip_record", "null_field", "abort"];
}

impl FromStr for CoercionPolicy {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "skip_record" => Ok(CoercionPolicy::SkipRecord),
            "null_field" => Ok(CoercionPolicy::NullField),
            "abort" => Ok(CoercionPolicy::Abort),
            other => Err(EtlError::InvalidConfigValueError {
                field: "error_handling.on_coercion_error".to_string(),
                value: other.to_string(),
                reason: format!("Valid values: {}", Self::NAMES.join(", ")),
            }),
        }
    }
}

/// 依 mapping 設定把原始 JSON 轉成扁平記錄
///
/// 每次 `transform` 都是獨立的一輪：展開後的原始記錄只存在於該次呼叫，
/// 透過 [`FunctionScope`] 傳給 `${getAllData}`。
pub struct DataTransformer<M: MappingSource> {
    source: M,
    context: FunctionContext,
    policy: CoercionPolicy,
    fixed_now: Option<DateTime<Utc>>,
}

impl<M: MappingSource> DataTransformer<M> {
    pub fn new(source: M) -> Self {
        Self {
            source,
            context: FunctionContext::default(),
            policy: CoercionPolicy::default(),
            fixed_now: None,
        }
    }

    pub fn with_context(mut self, context: FunctionContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_policy(mut self, policy: CoercionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 固定 `${getDate}` 的時間，測試用
    pub fn with_fixed_time(mut self, now: DateTime<Utc>) -> Self {
        self.fixed_now = Some(now);
        self
    }

    /// 轉換並保留原始 payload；schema 與 mapping key 至少要有一個
    pub fn process_data(
        &self,
        payload: &Value,
        schema: Option<&FieldMappings>,
        mapping_key: Option<&str>,
    ) -> Result<TransformResult> {
        if schema.is_none() && mapping_key.is_none() {
            return Err(EtlError::config(
                "config-mapping-key or schema-id needed, if schema is not provided",
            ));
        }

        let (processed_records, report) = self.run(payload, mapping_key, schema)?;
        Ok(TransformResult {
            raw_data: payload.clone(),
            processed_records,
            report,
        })
    }

    pub fn transform(
        &self,
        payload: &Value,
        mapping_key: &str,
        schema_override: Option<&FieldMappings>,
    ) -> Result<Vec<Record>> {
        self.run(payload, Some(mapping_key), schema_override)
            .map(|(records, _)| records)
    }

    fn run(
        &self,
        payload: &Value,
        mapping_key: Option<&str>,
        schema_override: Option<&FieldMappings>,
    ) -> Result<(Vec<Record>, TransformReport)> {
        let mut report = TransformReport {
            raw_record_count: top_level_count(payload),
            ..TransformReport::default()
        };

        let resolved = match mapping_key {
            Some(key) => {
                let mapping = self.source.get_key_map(key)?;
                if mapping.is_none() {
                    tracing::warn!("Key: {} not available in mapping configuration", key);
                }
                mapping
            }
            None => None,
        };

        let mapping = match (resolved, schema_override) {
            (Some(mapping), _) => mapping,
            (None, Some(schema)) => MappingConfig::from_schema(schema.clone()),
            (None, None) => {
                tracing::warn!("No cleaning possible. Returning data as-is.");
                let records = self.pass_through(payload, &mut report);
                self.check_counts(&report);
                return Ok((records, report));
            }
        };

        let raw_data_list = self.generate_unique_raw_objects(payload, &mapping, &mut report);
        report.expanded_record_count = raw_data_list.len();

        let schema = match (&mapping.db_col_to_json_mapping, schema_override) {
            (Some(base), Some(overrides)) => base.merged_with(overrides),
            (Some(base), None) => base.clone(),
            (None, Some(overrides)) => overrides.clone(),
            (None, None) => {
                return Err(EtlError::config(
                    "no schema found for mapping raw data. Add db_col_to_json_mapping to the mapping file",
                ))
            }
        };
        if schema.is_empty() {
            return Err(EtlError::config("db_col_to_json_mapping is empty"));
        }

        let fields: Vec<(&str, FieldExpression)> = schema
            .iter()
            .map(|(column, expression)| (column, FieldExpression::parse(expression)))
            .collect();

        let resolver = Resolver {
            split_json_by_dot: mapping.split_json_by_dot,
            scope: FunctionScope {
                context: &self.context,
                raw_records: &raw_data_list,
                now: self.fixed_now.unwrap_or_else(Utc::now),
            },
        };

        let mut records = Vec::with_capacity(raw_data_list.len());
        for (index, raw) in raw_data_list.iter().enumerate() {
            if let Some(record) = self.map_raw_data_to_db_col(index, raw, &fields, &resolver, &mut report)? {
                records.push(record);
            }
        }

        report.output_record_count = records.len();
        self.check_counts(&report);
        Ok((records, report))
    }

    fn pass_through(&self, payload: &Value, report: &mut TransformReport) -> Vec<Record> {
        report.pass_through = true;
        let records: Vec<Record> = match extract_records(payload, &MappingConfig::default()) {
            Ok(raw) => raw.into_iter().map(Record::from).collect(),
            Err(e) => {
                tracing::warn!("Payload holds no records: {}", e);
                Vec::new()
            }
        };
        report.expanded_record_count = records.len();
        report.output_record_count = records.len();
        records
    }

    /// 取出 envelope 並依 special_mapping 展開，失敗的記錄記錄後略過
    fn generate_unique_raw_objects(
        &self,
        payload: &Value,
        mapping: &MappingConfig,
        report: &mut TransformReport,
    ) -> Vec<RawRecord> {
        let envelope = match extract_records(payload, mapping) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("Data envelope could not be resolved: {}", e);
                return Vec::new();
            }
        };

        if mapping.special_mapping.is_empty() {
            return envelope;
        }

        let mut unique_objects = Vec::new();
        for (index, data_obj) in envelope.iter().enumerate() {
            match split_record(data_obj, &mapping.special_mapping, mapping.primary_key()) {
                Ok(expanded) => unique_objects.extend(expanded),
                Err(e) => {
                    tracing::warn!("Record {} skipped during special mapping: {}", index, e);
                    report.split_failures += 1;
                }
            }
        }
        unique_objects
    }

    /// 回傳 `Ok(None)` 表示依策略丟棄該筆
    fn map_raw_data_to_db_col(
        &self,
        index: usize,
        raw: &RawRecord,
        fields: &[(&str, FieldExpression)],
        resolver: &Resolver<'_>,
        report: &mut TransformReport,
    ) -> Result<Option<Record>> {
        let mut data = Map::with_capacity(fields.len());

        for (column, expression) in fields {
            let value = match resolver.resolve(raw, expression) {
                Ok(value) => value,
                Err(FieldError::Coercion { field, source }) if !source.is_field_local() => {
                    match self.policy {
                        CoercionPolicy::Abort => return Err(EtlError::CoercionError(source)),
                        CoercionPolicy::SkipRecord => {
                            tracing::warn!(
                                "Record {} skipped: column '{}' from '{}': {}",
                                index,
                                column,
                                field,
                                source
                            );
                            report.skipped_records += 1;
                            return Ok(None);
                        }
                        CoercionPolicy::NullField => {
                            tracing::warn!("Record {} column '{}' set to null: {}", index, column, source);
                            report.field_failures += 1;
                            Value::Null
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Record {} column '{}' set to null: {}", index, column, e);
                    report.field_failures += 1;
                    Value::Null
                }
            };
            data.insert(column.to_string(), value);
        }

        tracing::debug!("Mapped record {} with {} columns", index, data.len());
        Ok(Some(Record::new(data)))
    }

    fn check_counts(&self, report: &TransformReport) {
        if report.has_count_mismatch() {
            tracing::info!(
                "The lengths of raw-data and processed data are unequal. \
                 Raw-data has {} records, processed-data has {} records. \
                 If this is expected, you can ignore this message.",
                report.raw_record_count,
                report.output_record_count
            );
        }
    }
}
