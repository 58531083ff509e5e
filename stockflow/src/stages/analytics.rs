use super::Stage;
use crate::context::RunContext;
use crate::core::{StageKind, StageOutput};
use crate::errors::PipelineError;
use crate::events::names;
use crate::gold::{run_job, AnalyticsTrigger, JobSignal};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Triggers the external analytics job and waits for its outcome.
#[derive(Debug)]
pub struct AnalyticsStage {
    trigger: Arc<dyn AnalyticsTrigger>,
    timeout: Option<Duration>,
}

impl AnalyticsStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(trigger: Arc<dyn AnalyticsTrigger>, timeout: Option<Duration>) -> Self {
        Self { trigger, timeout }
    }
}

#[async_trait]
impl Stage for AnalyticsStage {
    fn name(&self) -> &str {
        "gold_layer"
    }

    fn kind(&self) -> StageKind {
        StageKind::Analytics
    }

    async fn execute(&self, ctx: &RunContext) -> Result<StageOutput, PipelineError> {
        let job_id = self.trigger.job_id().to_string();
        let run = run_job(self.trigger.as_ref(), self.timeout, |signal| {
            let event = match signal {
                JobSignal::Started { .. } => names::ANALYTICS_STARTED,
                JobSignal::Succeeded { .. } => names::ANALYTICS_SUCCEEDED,
                JobSignal::Failed { .. } => names::ANALYTICS_FAILED,
            };
            let mut payload = serde_json::to_value(signal).unwrap_or_default();
            if let Some(obj) = payload.as_object_mut() {
                obj.insert("job_id".to_string(), serde_json::json!(job_id));
            }
            ctx.try_emit_event(event, Some(payload));
        })
        .await?;

        Ok(StageOutput::ok_empty()
            .with_value("job_id", serde_json::json!(run.job_id))
            .with_value("external_run_id", serde_json::json!(run.run_id)))
    }
}
