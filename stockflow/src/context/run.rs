//! The context shared by every stage of one run.

use super::RunIdentity;
use crate::config::PipelineConfig;
use crate::events::{EventSink, NoOpEventSink};
use crate::utils::{now_unix_seconds, Timestamp};
use chrono::Utc;
use std::sync::Arc;

/// Immutable per-run context.
///
/// The watermark is read once by the orchestrator before the first stage
/// and frozen here, so every stage of a run observes the same value.
pub struct RunContext {
    identity: RunIdentity,
    config: Arc<PipelineConfig>,
    watermark: Option<f64>,
    started_at: Timestamp,
    started_unix: f64,
    event_sink: Arc<dyn EventSink>,
}

impl RunContext {
    /// Creates a run context.
    #[must_use]
    pub fn new(config: Arc<PipelineConfig>, watermark: Option<f64>) -> Self {
        Self {
            identity: RunIdentity::new(config.name.clone()),
            config,
            watermark,
            started_at: Utc::now(),
            started_unix: now_unix_seconds(),
            event_sink: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Sets the run identity.
    #[must_use]
    pub fn with_identity(mut self, identity: RunIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Returns the run identity.
    #[must_use]
    pub fn identity(&self) -> &RunIdentity {
        &self.identity
    }

    /// Returns the run ID as a string.
    #[must_use]
    pub fn run_id(&self) -> String {
        self.identity.run_id_str()
    }

    /// Returns the pipeline configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the watermark observed at run start.
    #[must_use]
    pub fn watermark(&self) -> Option<f64> {
        self.watermark
    }

    /// Returns when the run started.
    #[must_use]
    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// Returns when the run started, as Unix seconds.
    #[must_use]
    pub fn started_unix(&self) -> f64 {
        self.started_unix
    }

    /// Returns the event sink.
    #[must_use]
    pub fn event_sink(&self) -> &Arc<dyn EventSink> {
        &self.event_sink
    }

    /// Emits an event tagged with the run id. Never fails.
    pub fn try_emit_event(&self, event_type: &str, data: Option<serde_json::Value>) {
        let mut payload = data.unwrap_or_else(|| serde_json::json!({}));
        if let Some(obj) = payload.as_object_mut() {
            obj.insert("run_id".to_string(), serde_json::json!(self.run_id()));
        }
        self.event_sink.try_emit(event_type, Some(payload));
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("identity", &self.identity)
            .field("watermark", &self.watermark)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}
