use super::Stage;
use crate::context::RunContext;
use crate::core::{StageKind, StageOutput};
use crate::errors::PipelineError;
use crate::events::names;
use crate::silver::CleaningPipeline;
use async_trait::async_trait;

/// Cleans landing tables into the processed area.
#[derive(Debug)]
pub struct SilverStage {
    pipeline: CleaningPipeline,
}

impl SilverStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(pipeline: CleaningPipeline) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl Stage for SilverStage {
    fn name(&self) -> &str {
        "silver_layer"
    }

    fn kind(&self) -> StageKind {
        StageKind::Transform
    }

    async fn execute(&self, ctx: &RunContext) -> Result<StageOutput, PipelineError> {
        let report = self.pipeline.run().await?;

        let mut tables = serde_json::Map::new();
        for table in &report.tables {
            ctx.try_emit_event(
                names::TABLE_CLEANED,
                Some(serde_json::json!({
                    "table": table.dataset.name(),
                    "rows_in": table.stats.rows_in,
                    "rows_out": table.stats.rows_out,
                    "output": table.output.display().to_string(),
                })),
            );
            tables.insert(
                table.dataset.name().to_string(),
                serde_json::to_value(table.stats).unwrap_or_default(),
            );
        }

        Ok(StageOutput::ok_empty()
            .with_value("tables_cleaned", serde_json::json!(report.tables.len()))
            .with_value("tables", serde_json::Value::Object(tables)))
    }
}
