//! Test support: a scripted analytics trigger and filesystem fixtures.
//!
//! Fixture helpers panic on I/O failure; they are meant for tests only.

pub mod fixtures;
mod mocks;

pub use fixtures::DataLayout;
pub use mocks::{ScriptedOutcome, ScriptedTrigger};
