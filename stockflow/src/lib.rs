//! # Stockflow
//!
//! An incremental bronze/silver/gold batch pipeline for stock analytics.
//!
//! A run is a strict linear chain of stages:
//!
//! - **Gate**: compares the newest raw file's modification time against
//!   the last-successful-run watermark
//! - **Bronze**: mirrors raw CSV files into the landing area
//! - **Silver**: cleans the landing tables and derives features into the
//!   processed area
//! - **Gold**: triggers the external analytics job and waits for it
//! - **Commit**: advances the watermark
//!
//! Stages hand off through filesystem locations. The first failing stage
//! ends the run and leaves the watermark untouched.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stockflow::prelude::*;
//! use std::sync::Arc;
//!
//! let config = PipelineConfig::load("stockflow.toml")?;
//! let store = Arc::new(JsonFileStateStore::new(config.state_file()));
//! let orchestrator = Orchestrator::from_config(config, store)?
//!     .with_event_sink(Arc::new(LoggingEventSink::default()));
//!
//! let record = orchestrator.run().await?;
//! println!("{}", record.state);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod bronze;
pub mod config;
pub mod context;
pub mod core;
pub mod detect;
pub mod errors;
pub mod events;
pub mod gold;
pub mod observability;
pub mod pipeline;
pub mod silver;
pub mod stages;
pub mod state;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::bronze::{CopyReport, LandingCopier};
    pub use crate::config::{GateMode, PipelineConfig, TriggerKind};
    pub use crate::context::{RunContext, RunIdentity};
    pub use crate::core::{StageKind, StageOutput, StageStatus};
    pub use crate::detect::{ChangeDetector, GateDecision};
    pub use crate::errors::{ErrorKind, PipelineError, RunFailed, StateError};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::gold::{build_trigger, AnalyticsTrigger, CommandTrigger, JobSignal};
    pub use crate::pipeline::{FailureRecord, Orchestrator, RunRecord, RunState};
    pub use crate::silver::{CleaningPipeline, CleaningReport, Dataset};
    pub use crate::stages::{Stage, StageResult};
    pub use crate::state::{InMemoryStateStore, JsonFileStateStore, StateStore, Watermark};
    pub use crate::utils::{iso_timestamp, now_unix_seconds, Timestamp};
}
