use crate::core::exporter::{bundle, summary_csv};
use crate::core::report::{analyze, exporter_for, load_dataset};
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::{Dataset, LoadOutcome, TransformResult};
use crate::utils::error::{EtlError, Result};

/// Reads the upload from `source`, writes every output to `sink`.
pub struct PermitPipeline<S: Storage, C: ConfigProvider> {
    pub(crate) source: S,
    pub(crate) sink: S,
    pub(crate) config: C,
}

impl<S: Storage, C: ConfigProvider> PermitPipeline<S, C> {
    pub fn new(source: S, sink: S, config: C) -> Self {
        Self {
            source,
            sink,
            config,
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for PermitPipeline<S, C> {
    async fn extract(&self) -> Result<Dataset> {
        tracing::debug!("Reading upload from: {}", self.config.input_path());
        let bytes = self.source.read_file(self.config.input_path()).await?;
        tracing::debug!("Read {} bytes", bytes.len());

        let settings = self.config.settings();
        load_dataset(&bytes, &settings.input, &settings.columns)
    }

    async fn transform(&self, data: Dataset) -> Result<TransformResult> {
        tracing::debug!("Reference date: {}", self.config.today());
        analyze(&data, self.config.settings(), self.config.today())
    }

    async fn load(&self, result: TransformResult) -> Result<LoadOutcome> {
        let settings = self.config.settings();
        let output = &settings.output;
        let exporter = exporter_for(settings, self.config.today());

        // 兩個輸出各自產生，一個失敗不影響另一個
        let exports = [
            (
                output.started_file(),
                exporter.export("started", &result.headers, &result.filtered.started),
            ),
            (
                output.upcoming_file(),
                exporter.export("upcoming", &result.headers, &result.filtered.upcoming),
            ),
        ];

        let mut files = Vec::new();
        let mut written: Vec<(String, Vec<u8>)> = Vec::new();
        let mut first_error: Option<EtlError> = None;

        for (name, export) in exports {
            match export {
                Ok(bytes) => {
                    tracing::debug!("Writing {} ({} bytes)", name, bytes.len());
                    self.sink.write_file(&name, &bytes).await?;
                    files.push(name.clone());
                    written.push((name, bytes));
                }
                Err(e) => {
                    tracing::error!("❌ {}", e);
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        let summary = summary_csv(&result.summary)?;
        self.sink.write_file(&output.summary_file, &summary).await?;
        files.push(output.summary_file.clone());

        if let Some(e) = first_error {
            return Err(e);
        }

        if output.bundle {
            let mut entries: Vec<(&str, &[u8])> = written
                .iter()
                .map(|(name, bytes)| (name.as_str(), bytes.as_slice()))
                .collect();
            entries.push((output.summary_file.as_str(), summary.as_slice()));

            let archive = bundle(&entries)?;
            tracing::debug!("Writing bundle {} ({} bytes)", output.bundle_file, archive.len());
            self.sink.write_file(&output.bundle_file, &archive).await?;
            files.push(output.bundle_file.clone());
        }

        Ok(LoadOutcome {
            files,
            summary: result.summary,
        })
    }
}
