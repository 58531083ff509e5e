//! Run identity for tracking pipeline executions.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifies a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdentity {
    /// The unique ID for this pipeline run.
    pub pipeline_run_id: Uuid,

    /// The pipeline name.
    pub pipeline: String,
}

impl RunIdentity {
    /// Creates a new run identity with a generated run ID.
    #[must_use]
    pub fn new(pipeline: impl Into<String>) -> Self {
        Self {
            pipeline_run_id: Uuid::new_v4(),
            pipeline: pipeline.into(),
        }
    }

    /// Creates a run identity with a specific run ID.
    #[must_use]
    pub fn with_pipeline_run_id(pipeline: impl Into<String>, pipeline_run_id: Uuid) -> Self {
        Self {
            pipeline_run_id,
            pipeline: pipeline.into(),
        }
    }

    /// Returns the run ID as a string.
    #[must_use]
    pub fn run_id_str(&self) -> String {
        self.pipeline_run_id.to_string()
    }
}

impl fmt::Display for RunIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.pipeline, self.pipeline_run_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_identity_new_is_unique() {
        let a = RunIdentity::new("etl");
        let b = RunIdentity::new("etl");
        assert_ne!(a.pipeline_run_id, b.pipeline_run_id);
        assert_eq!(a.pipeline_run_id.get_version_num(), 4);
    }

    #[test]
    fn test_run_identity_display() {
        let id = Uuid::nil();
        let identity = RunIdentity::with_pipeline_run_id("etl", id);
        assert_eq!(identity.to_string(), format!("etl/{id}"));
        assert_eq!(identity.run_id_str(), id.to_string());
    }

    #[test]
    fn test_run_identity_serialization() {
        let identity = RunIdentity::new("etl");
        let json = serde_json::to_string(&identity).unwrap();
        let deserialized: RunIdentity = serde_json::from_str(&json).unwrap();
        assert_eq!(identity, deserialized);
    }
}
