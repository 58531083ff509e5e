//! Core domain model types for stockflow.
//!
//! This module contains the fundamental types shared by every stage:
//! - Stage status and kind enums
//! - Stage output type with factory methods

mod output;
mod status;

pub use output::StageOutput;
pub use status::{StageKind, StageStatus};
