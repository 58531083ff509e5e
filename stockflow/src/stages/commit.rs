use super::Stage;
use crate::context::RunContext;
use crate::core::{StageKind, StageOutput};
use crate::errors::PipelineError;
use crate::events::names;
use crate::state::Watermark;
use async_trait::async_trait;

/// Advances the watermark to the current time.
///
/// Only reached when every earlier stage succeeded.
#[derive(Debug)]
pub struct WatermarkCommitStage {
    watermark: Watermark,
}

impl WatermarkCommitStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(watermark: Watermark) -> Self {
        Self { watermark }
    }
}

#[async_trait]
impl Stage for WatermarkCommitStage {
    fn name(&self) -> &str {
        "update_last_run"
    }

    fn kind(&self) -> StageKind {
        StageKind::Commit
    }

    async fn execute(&self, ctx: &RunContext) -> Result<StageOutput, PipelineError> {
        let value = self.watermark.advance_to_now()?;
        ctx.try_emit_event(
            names::WATERMARK_UPDATED,
            Some(serde_json::json!({
                "key": self.watermark.key(),
                "previous": ctx.watermark(),
                "watermark": value,
            })),
        );
        Ok(StageOutput::ok_empty()
            .with_value("previous", serde_json::json!(ctx.watermark()))
            .with_value("watermark", serde_json::json!(value)))
    }
}
