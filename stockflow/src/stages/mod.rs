//! Stage trait and the pipeline's stages.
//!
//! Stages hand off through filesystem locations, never in memory. Each
//! stage reads its own inputs from the location contract and reports a
//! [`StageOutput`] with diagnostic data, or a [`PipelineError`].

mod analytics;
mod bronze;
mod commit;
mod gate;
mod result;
mod silver;

pub use analytics::AnalyticsStage;
pub use bronze::BronzeStage;
pub use commit::WatermarkCommitStage;
pub use gate::GateStage;
pub use result::StageResult;
pub use silver::SilverStage;

use crate::context::RunContext;
use crate::core::{StageKind, StageOutput};
use crate::errors::PipelineError;
use async_trait::async_trait;
use std::fmt::Debug;

/// Trait for pipeline stages.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Returns the name of the stage.
    fn name(&self) -> &str;

    /// Returns the kind of the stage.
    fn kind(&self) -> StageKind;

    /// Executes the stage.
    ///
    /// A `Skip` output ends the run without failure.
    async fn execute(&self, ctx: &RunContext) -> Result<StageOutput, PipelineError>;
}
