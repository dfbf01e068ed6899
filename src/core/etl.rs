use crate::core::Pipeline;
use crate::domain::model::LoadOutcome;
use crate::utils::error::Result;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<LoadOutcome> {
        tracing::info!("Starting permit report run...");

        // Extract
        tracing::info!("📥 Loading records...");
        let dataset = self.pipeline.extract().await.inspect_err(log_failure)?;
        tracing::info!(
            "Loaded {} records ({} unparsable dates)",
            dataset.records.len(),
            dataset.unparsed_dates
        );

        // Transform
        tracing::info!("🔎 Filtering and summarizing...");
        let result = self.pipeline.transform(dataset).await.inspect_err(log_failure)?;
        tracing::info!(
            "Started: {}, upcoming: {}, regions: {}",
            result.filtered.started.len(),
            result.filtered.upcoming.len(),
            result.summary.regions.len()
        );

        // Load
        tracing::info!("💾 Writing outputs...");
        let outcome = self.pipeline.load(result).await.inspect_err(log_failure)?;
        tracing::info!("Wrote {} files", outcome.files.len());

        Ok(outcome)
    }
}

fn log_failure(e: &crate::utils::error::EtlError) {
    tracing::error!("❌ {} stage failed: {}", e.stage(), e);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::MemoryStorage;
    use crate::config::toml_config::TomlConfig;
    use crate::config::RunConfig;
    use crate::core::pipeline::PermitPipeline;
    use crate::utils::error::{EtlError, PipelineStage};
    use chrono::NaiveDate;

    fn run_config() -> RunConfig {
        RunConfig {
            input_path: "upload.csv".to_string(),
            output_path: "out".to_string(),
            today: NaiveDate::from_ymd_opt(2024, 5, 12).unwrap(),
            settings: TomlConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_run_writes_outputs() {
        let source = MemoryStorage::new();
        source
            .insert(
                "upload.csv",
                "공사명,광케이블 조수현황,공사시작일,공사종료일,시작주소\n굴착,144C,2024-05-13,2024-05-20,인천 남동\n".as_bytes(),
            )
            .await;
        let sink = MemoryStorage::new();
        let engine = EtlEngine::new(PermitPipeline::new(source, sink.clone(), run_config()));

        let outcome = engine.run().await.unwrap();

        assert_eq!(outcome.files.len(), 3);
        assert_eq!(outcome.summary.total().upcoming, 1);
        assert_eq!(
            sink.paths().await,
            vec!["started_this_month.xlsx", "summary.csv", "upcoming_this_month.xlsx"]
        );
    }

    #[tokio::test]
    async fn test_schema_error_stops_before_any_output() {
        let source = MemoryStorage::new();
        source.insert("upload.csv", "공사명,비고\n굴착,\n".as_bytes()).await;
        let sink = MemoryStorage::new();
        let engine = EtlEngine::new(PermitPipeline::new(source, sink.clone(), run_config()));

        let err = engine.run().await.unwrap_err();

        assert!(matches!(err, EtlError::SchemaError { .. }));
        assert_eq!(err.stage(), PipelineStage::Load);
        assert!(sink.paths().await.is_empty());
    }
}
