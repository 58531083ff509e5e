//! Event sink system for observability.
//!
//! The orchestrator and stages emit lifecycle events (`run.started`,
//! `gate.decided`, `stage.failed`, `watermark.updated`, ...) through an
//! [`EventSink`] handed to them explicitly in the run context.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// Event type names emitted by the pipeline.
pub mod names {
    /// A run began.
    pub const RUN_STARTED: &str = "run.started";
    /// A run reached a successful terminal state.
    pub const RUN_COMPLETED: &str = "run.completed";
    /// A run ended because the gate said there was nothing to do.
    pub const RUN_SKIPPED: &str = "run.skipped";
    /// A run reached the failed terminal state.
    pub const RUN_FAILED: &str = "run.failed";
    /// The change detector produced a decision.
    pub const GATE_DECIDED: &str = "gate.decided";
    /// A stage began.
    pub const STAGE_STARTED: &str = "stage.started";
    /// A stage succeeded.
    pub const STAGE_COMPLETED: &str = "stage.completed";
    /// A stage ended the run early.
    pub const STAGE_SKIPPED: &str = "stage.skipped";
    /// A stage failed.
    pub const STAGE_FAILED: &str = "stage.failed";
    /// One raw file landed.
    pub const FILE_COPIED: &str = "bronze.file_copied";
    /// One table was cleaned and written.
    pub const TABLE_CLEANED: &str = "silver.table_cleaned";
    /// The external analytics job started.
    pub const ANALYTICS_STARTED: &str = "analytics.started";
    /// The external analytics job succeeded.
    pub const ANALYTICS_SUCCEEDED: &str = "analytics.succeeded";
    /// The external analytics job failed.
    pub const ANALYTICS_FAILED: &str = "analytics.failed";
    /// The watermark advanced.
    pub const WATERMARK_UPDATED: &str = "watermark.updated";
}
