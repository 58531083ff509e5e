//! Run record.

use super::RunState;
use crate::errors::{ErrorKind, PipelineError};
use crate::stages::StageResult;
use crate::utils::Timestamp;
use serde::{Deserialize, Serialize};

/// The stage that failed and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Failing stage name.
    pub stage: String,
    /// Error classification.
    pub kind: ErrorKind,
    /// Error message.
    pub message: String,
}

impl FailureRecord {
    /// Records `error` against `stage`.
    #[must_use]
    pub fn new(stage: impl Into<String>, error: &PipelineError) -> Self {
        Self {
            stage: stage.into(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Everything observed during one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Run id.
    pub run_id: String,
    /// Pipeline name.
    pub pipeline: String,
    /// When the run started.
    pub started_at: Timestamp,
    /// When the run reached a terminal state.
    pub ended_at: Option<Timestamp>,
    /// Current state.
    pub state: RunState,
    /// Watermark observed at run start.
    pub watermark: Option<f64>,
    /// Gate decision, once checked.
    pub should_run: Option<bool>,
    /// Watermark written at the end, on success.
    pub new_watermark: Option<f64>,
    /// Per-stage results, in execution order.
    pub stages: Vec<StageResult>,
    /// Failure details, when failed.
    pub failure: Option<FailureRecord>,
}

impl RunRecord {
    /// Creates a record in the `Start` state.
    #[must_use]
    pub fn new(
        run_id: impl Into<String>,
        pipeline: impl Into<String>,
        started_at: Timestamp,
        watermark: Option<f64>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            pipeline: pipeline.into(),
            started_at,
            ended_at: None,
            state: RunState::Start,
            watermark,
            should_run: None,
            new_watermark: None,
            stages: Vec::new(),
            failure: None,
        }
    }

    /// Returns the result of a named stage.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageResult> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Returns true if the run ended without failure.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.state.is_success()
    }

    /// Duration in milliseconds, once ended.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_ms(&self) -> Option<f64> {
        self.ended_at
            .map(|end| (end - self.started_at).num_milliseconds() as f64)
    }
}
