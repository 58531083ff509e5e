//! Per-stage result recorded in the run record.

use crate::core::{StageKind, StageOutput, StageStatus};
use crate::errors::{ErrorKind, PipelineError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of one stage within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    /// Stage name.
    pub name: String,
    /// Stage kind.
    pub kind: StageKind,
    /// Stage status.
    pub status: StageStatus,
    /// When the stage started.
    pub started_at: DateTime<Utc>,
    /// When the stage ended.
    pub ended_at: DateTime<Utc>,
    /// Diagnostic data from the stage output.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, serde_json::Value>,
    /// Skip reason, for skipped stages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    /// Error classification, for failed stages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Error message, for failed stages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageResult {
    /// Records a stage that returned an output.
    #[must_use]
    pub fn from_output(
        name: impl Into<String>,
        kind: StageKind,
        started_at: DateTime<Utc>,
        output: &StageOutput,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            status: output.status,
            started_at,
            ended_at: Utc::now(),
            data: output.data.clone(),
            skip_reason: output.skip_reason.clone(),
            error_kind: None,
            error: None,
        }
    }

    /// Records a failed stage.
    #[must_use]
    pub fn failed(
        name: impl Into<String>,
        kind: StageKind,
        started_at: DateTime<Utc>,
        error: &PipelineError,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            status: StageStatus::Fail,
            started_at,
            ended_at: Utc::now(),
            data: BTreeMap::new(),
            skip_reason: None,
            error_kind: Some(error.kind()),
            error: Some(error.to_string()),
        }
    }

    /// Returns the duration in milliseconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_ms(&self) -> f64 {
        (self.ended_at - self.started_at).num_milliseconds() as f64
    }

    /// Returns true if the stage succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns true if the stage failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status.is_failure()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_output() {
        let started = Utc::now();
        let output = StageOutput::ok_empty().with_value("files_copied", serde_json::json!(3));
        let result = StageResult::from_output("bronze", StageKind::Ingest, started, &output);

        assert_eq!(result.name, "bronze");
        assert!(result.is_success());
        assert_eq!(result.data["files_copied"], 3);
        assert!(result.error.is_none());
    }

    #[test]
    fn test_failed() {
        let started = Utc::now();
        let err = PipelineError::missing_input("landing directory", "/data/Bronze");
        let result = StageResult::failed("silver", StageKind::Transform, started, &err);

        assert!(result.is_failure());
        assert_eq!(result.error_kind, Some(ErrorKind::MissingInput));
        assert!(result.error.unwrap().contains("landing directory"));
    }

    #[test]
    fn test_duration() {
        let started = Utc::now();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let result = StageResult::from_output("gate", StageKind::Gate, started, &StageOutput::ok_empty());
        assert!(result.duration_ms() >= 10.0);
    }

    #[test]
    fn test_serialization_skips_empty_fields() {
        let result =
            StageResult::from_output("gate", StageKind::Gate, Utc::now(), &StageOutput::ok_empty());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "ok");
        assert!(json.get("error").is_none());
        assert!(json.get("data").is_none());
    }
}
