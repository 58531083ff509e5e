//! Stage output type.

use super::StageStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The output of a successful stage execution.
///
/// Failures travel as [`PipelineError`](crate::errors::PipelineError), so an
/// output is either `Ok` with diagnostic data or `Skip` with a reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutput {
    /// The status of the stage execution.
    pub status: StageStatus,

    /// Diagnostic data (counts, digests, decisions).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, serde_json::Value>,

    /// Skip reason (for skipped executions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
}

impl Default for StageOutput {
    fn default() -> Self {
        Self::ok_empty()
    }
}

impl StageOutput {
    /// Creates a successful output with data.
    #[must_use]
    pub fn ok(data: BTreeMap<String, serde_json::Value>) -> Self {
        Self {
            status: StageStatus::Ok,
            data,
            skip_reason: None,
        }
    }

    /// Creates a successful output with no data.
    #[must_use]
    pub fn ok_empty() -> Self {
        Self::ok(BTreeMap::new())
    }

    /// Creates a skip output with a reason.
    #[must_use]
    pub fn skip(reason: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Skip,
            data: BTreeMap::new(),
            skip_reason: Some(reason.into()),
        }
    }

    /// Adds a single data entry.
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Returns true if the stage was skipped.
    #[must_use]
    pub fn is_skip(&self) -> bool {
        self.status == StageStatus::Skip
    }

    /// Gets a value from the data.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }
}
