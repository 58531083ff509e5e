use super::Stage;
use crate::config::GateMode;
use crate::context::RunContext;
use crate::core::{StageKind, StageOutput};
use crate::detect::ChangeDetector;
use crate::errors::PipelineError;
use crate::events::names;
use async_trait::async_trait;

/// Runs the change detector and records its decision.
///
/// In advisory mode the decision is only logged. In authoritative mode a
/// negative decision skips the rest of the run.
#[derive(Debug)]
pub struct GateStage {
    detector: ChangeDetector,
}

impl GateStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(detector: ChangeDetector) -> Self {
        Self { detector }
    }
}

#[async_trait]
impl Stage for GateStage {
    fn name(&self) -> &str {
        "check_new_data"
    }

    fn kind(&self) -> StageKind {
        StageKind::Gate
    }

    async fn execute(&self, ctx: &RunContext) -> Result<StageOutput, PipelineError> {
        let decision = self.detector.check(ctx.watermark())?;
        let mode = ctx.config().gate.mode;

        ctx.try_emit_event(
            names::GATE_DECIDED,
            Some(serde_json::json!({
                "should_run": decision.should_run,
                "file_count": decision.file_count,
                "latest_modified": decision.latest_modified,
                "watermark": decision.watermark,
                "mode": mode.to_string(),
            })),
        );

        let output = if mode == GateMode::Authoritative && !decision.should_run {
            StageOutput::skip(decision.reason())
        } else {
            StageOutput::ok_empty()
        };
        Ok(output
            .with_value("should_run", serde_json::json!(decision.should_run))
            .with_value("file_count", serde_json::json!(decision.file_count))
            .with_value("latest_modified", serde_json::json!(decision.latest_modified)))
    }
}
