use super::Stage;
use crate::bronze::LandingCopier;
use crate::context::RunContext;
use crate::core::{StageKind, StageOutput};
use crate::errors::PipelineError;
use crate::events::names;
use async_trait::async_trait;

/// Copies raw files into the landing area.
#[derive(Debug)]
pub struct BronzeStage {
    copier: LandingCopier,
}

impl BronzeStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(copier: LandingCopier) -> Self {
        Self { copier }
    }
}

#[async_trait]
impl Stage for BronzeStage {
    fn name(&self) -> &str {
        "bronze_layer"
    }

    fn kind(&self) -> StageKind {
        StageKind::Ingest
    }

    async fn execute(&self, ctx: &RunContext) -> Result<StageOutput, PipelineError> {
        let copier = self.copier.clone();
        let report = tokio::task::spawn_blocking(move || copier.copy_all())
            .await
            .map_err(|e| {
                PipelineError::io(
                    self.copier.landing_dir(),
                    std::io::Error::other(format!("copy worker did not complete: {e}")),
                )
            })??;

        for file in &report.files {
            ctx.try_emit_event(
                names::FILE_COPIED,
                Some(serde_json::json!({
                    "file": file.file_name,
                    "bytes": file.bytes,
                    "sha256": file.sha256,
                })),
            );
        }

        Ok(StageOutput::ok_empty()
            .with_value("files_copied", serde_json::json!(report.count()))
            .with_value("total_bytes", serde_json::json!(report.total_bytes()))
            .with_value("files", serde_json::to_value(&report.files).unwrap_or_default()))
    }
}
