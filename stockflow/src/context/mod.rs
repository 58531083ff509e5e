//! Context management for pipeline execution.
//!
//! This module provides:
//! - Run identity for correlating log lines and events
//! - The per-run context handed to every stage

mod identity;
mod run;

pub use identity::RunIdentity;
pub use run::RunContext;
