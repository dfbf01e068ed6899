use crate::config::toml_config::TomlConfig;
use crate::core::aggregator;
use crate::core::cache::LoadCache;
use crate::core::classifier::{self, FilterRules};
use crate::core::exporter::{ExportFormat, Exporter};
use crate::core::loader::{self, ColumnMapping, InputConfig};
use crate::domain::model::{Dataset, FilteredResult, RegionSummary, TransformResult};
use crate::utils::error::Result;
use chrono::NaiveDate;
use std::sync::Arc;

/// Everything a presentation layer needs from one run.
#[derive(Debug, Clone)]
pub struct PermitReport {
    pub dataset: Arc<Dataset>,
    pub filtered: FilteredResult,
    pub summary: RegionSummary,
    pub format: ExportFormat,
    pub started_export: Vec<u8>,
    pub upcoming_export: Vec<u8>,
}

pub fn load_dataset(bytes: &[u8], input: &InputConfig, columns: &ColumnMapping) -> Result<Dataset> {
    let table = loader::read_table(bytes, input)?;
    loader::load_records(&table, columns)
}

/// 分類與彙總；不做任何 I/O
pub fn analyze(dataset: &Dataset, config: &TomlConfig, today: NaiveDate) -> Result<TransformResult> {
    let rules = FilterRules::from(&config.filter);
    let filtered = classifier::classify(&dataset.records, today, &rules);
    let summary = aggregator::summarize(
        &filtered.started,
        &filtered.upcoming,
        config.aggregate.address_policy,
        &config.aggregate.total_label,
    )?;

    Ok(TransformResult {
        headers: dataset.headers.clone(),
        filtered,
        summary,
    })
}

pub fn exporter_for(config: &TomlConfig, today: NaiveDate) -> Exporter {
    Exporter::new(config.output.format, config.report.sheet_name.clone(), today)
}

/// Single-call entry point: uploaded bytes in, filtered buckets, summary and
/// both download streams out. Either export failing fails the whole call.
pub fn build_report(
    bytes: &[u8],
    config: &TomlConfig,
    today: NaiveDate,
    cache: Option<&LoadCache>,
) -> Result<PermitReport> {
    let dataset = match cache {
        Some(cache) => cache.get_or_load(bytes, &config.input, &config.columns)?,
        None => Arc::new(load_dataset(bytes, &config.input, &config.columns)?),
    };

    let result = analyze(&dataset, config, today)?;
    let exporter = exporter_for(config, today);
    let started_export = exporter.export("started", &result.headers, &result.filtered.started)?;
    let upcoming_export =
        exporter.export("upcoming", &result.headers, &result.filtered.upcoming)?;

    Ok(PermitReport {
        dataset,
        filtered: result.filtered,
        summary: result.summary,
        format: exporter.format(),
        started_export,
        upcoming_export,
    })
}
