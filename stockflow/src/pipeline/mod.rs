//! Pipeline orchestration: the run state machine, the run record and the
//! orchestrator that drives the stages.

mod orchestrator;
mod record;
mod state;

pub use orchestrator::Orchestrator;
pub use record::{FailureRecord, RunRecord};
pub use state::RunState;
