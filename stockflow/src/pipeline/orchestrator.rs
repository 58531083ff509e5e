//! Linear, fail-fast pipeline orchestrator.

use super::{FailureRecord, RunRecord, RunState};
use crate::bronze::LandingCopier;
use crate::config::PipelineConfig;
use crate::context::{RunContext, RunIdentity};
use crate::core::StageKind;
use crate::detect::ChangeDetector;
use crate::errors::{PipelineError, RunFailed};
use crate::events::{names, EventSink, NoOpEventSink};
use crate::gold::{build_trigger, AnalyticsTrigger};
use crate::observability::SpanTimer;
use crate::silver::CleaningPipeline;
use crate::stages::{
    AnalyticsStage, BronzeStage, GateStage, SilverStage, Stage, StageResult, WatermarkCommitStage,
};
use crate::state::{StateStore, Watermark};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};

/// Runs the stages in order, stopping at the first failure.
///
/// The watermark is read once before the first stage and written only by
/// the final commit stage.
pub struct Orchestrator {
    config: Arc<PipelineConfig>,
    watermark: Watermark,
    stages: Vec<Box<dyn Stage>>,
    event_sink: Arc<dyn EventSink>,
}

impl Orchestrator {
    /// Builds the standard chain: gate, landing copy, cleaning, analytics,
    /// watermark commit.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the configuration is invalid.
    pub fn new(
        config: PipelineConfig,
        store: Arc<dyn StateStore>,
        trigger: Arc<dyn AnalyticsTrigger>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        let watermark = Watermark::new(store, config.watermark.key.clone());

        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(GateStage::new(ChangeDetector::new(
                config.raw_dir(),
                config.extension.clone(),
            ))),
            Box::new(BronzeStage::new(LandingCopier::new(
                config.raw_dir(),
                config.landing_dir(),
                config.extension.clone(),
            ))),
            Box::new(SilverStage::new(CleaningPipeline::new(
                config.landing_dir(),
                config.processed_dir(),
                config.silver.clone(),
            ))),
            Box::new(AnalyticsStage::new(trigger, config.analytics.timeout())),
            Box::new(WatermarkCommitStage::new(watermark.clone())),
        ];

        Ok(Self {
            config: Arc::new(config),
            watermark,
            stages,
            event_sink: Arc::new(NoOpEventSink),
        })
    }

    /// Builds the standard chain with the trigger selected by configuration.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the configuration or trigger settings are invalid.
    pub fn from_config(
        config: PipelineConfig,
        store: Arc<dyn StateStore>,
    ) -> Result<Self, PipelineError> {
        let trigger = build_trigger(&config.analytics)?;
        Self::new(config, store, trigger)
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the watermark handle.
    #[must_use]
    pub fn watermark(&self) -> &Watermark {
        &self.watermark
    }

    /// Returns the stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Executes one run.
    ///
    /// Returns the record of a run that ended in `WatermarkUpdated` or
    /// `Skipped`.
    ///
    /// # Errors
    ///
    /// Returns [`RunFailed`] carrying the failing stage, its error and the
    /// record up to the failure. The watermark is unchanged in that case.
    pub async fn run(&self) -> Result<RunRecord, RunFailed> {
        let started_at = Utc::now();
        let observed = match self.watermark.read() {
            Ok(value) => value,
            Err(e) => {
                let err = PipelineError::from(e);
                error!(key = %self.watermark.key(), error = %err, "Failed to read watermark");
                let run_id = RunIdentity::new(self.config.name.clone()).run_id_str();
                let mut record = RunRecord::new(run_id, &self.config.name, started_at, None);
                record.state = RunState::Failed;
                record.ended_at = Some(Utc::now());
                record.failure = Some(FailureRecord::new("read_watermark", &err));
                return Err(RunFailed {
                    stage: "read_watermark".to_string(),
                    record: Box::new(record),
                    source: err,
                });
            }
        };

        let ctx = RunContext::new(Arc::clone(&self.config), observed)
            .with_event_sink(Arc::clone(&self.event_sink));
        let mut record = RunRecord::new(ctx.run_id(), &self.config.name, started_at, observed);

        let span = info_span!("pipeline_run", run_id = %ctx.run_id(), pipeline = %self.config.name);
        let outcome = self.run_stages(&ctx, &mut record).instrument(span).await;

        record.ended_at = Some(Utc::now());
        match outcome {
            Ok(()) => {
                let event = if record.state == RunState::Skipped {
                    names::RUN_SKIPPED
                } else {
                    names::RUN_COMPLETED
                };
                ctx.try_emit_event(
                    event,
                    Some(serde_json::json!({
                        "state": record.state.to_string(),
                        "duration_ms": record.duration_ms(),
                    })),
                );
                info!(
                    run_id = %record.run_id,
                    state = %record.state,
                    duration_ms = ?record.duration_ms(),
                    "Pipeline run finished"
                );
                Ok(record)
            }
            Err((stage, source)) => {
                ctx.try_emit_event(
                    names::RUN_FAILED,
                    Some(serde_json::json!({
                        "stage": stage,
                        "error_kind": source.kind().to_string(),
                        "error": source.to_string(),
                    })),
                );
                error!(
                    run_id = %record.run_id,
                    stage = %stage,
                    error_kind = %source.kind(),
                    error = %source,
                    "Pipeline run failed; watermark left at {:?}",
                    observed
                );
                Err(RunFailed {
                    stage,
                    record: Box::new(record),
                    source,
                })
            }
        }
    }

    async fn run_stages(
        &self,
        ctx: &RunContext,
        record: &mut RunRecord,
    ) -> Result<(), (String, PipelineError)> {
        info!(watermark = ?ctx.watermark(), stages = self.stages.len(), "Pipeline run started");
        ctx.try_emit_event(
            names::RUN_STARTED,
            Some(serde_json::json!({
                "pipeline": self.config.name,
                "watermark": ctx.watermark(),
            })),
        );

        for stage in &self.stages {
            let name = stage.name().to_string();
            let kind = stage.kind();
            let stage_started = Utc::now();
            let timer = SpanTimer::start(&name);

            info!(stage = %name, kind = %kind, "Stage started");
            ctx.try_emit_event(names::STAGE_STARTED, Some(serde_json::json!({ "stage": name })));

            let span = info_span!("stage", stage = %name, kind = %kind);
            let result = stage.execute(ctx).instrument(span).await;
            let duration_ms = timer.finish();

            let output = match result {
                Ok(output) => output,
                Err(err) => {
                    error!(stage = %name, error_kind = %err.kind(), error = %err, duration_ms, "Stage failed");
                    ctx.try_emit_event(
                        names::STAGE_FAILED,
                        Some(serde_json::json!({
                            "stage": name,
                            "error_kind": err.kind().to_string(),
                            "error": err.to_string(),
                            "duration_ms": duration_ms,
                        })),
                    );
                    record
                        .stages
                        .push(StageResult::failed(&name, kind, stage_started, &err));
                    record.state = RunState::Failed;
                    record.failure = Some(FailureRecord::new(&name, &err));
                    return Err((name, err));
                }
            };

            if kind == StageKind::Gate {
                record.should_run = output.get("should_run").and_then(serde_json::Value::as_bool);
            }
            if kind == StageKind::Commit {
                record.new_watermark = output.get("watermark").and_then(serde_json::Value::as_f64);
            }
            record
                .stages
                .push(StageResult::from_output(&name, kind, stage_started, &output));

            if output.is_skip() {
                let reason = output.skip_reason.clone().unwrap_or_default();
                info!(stage = %name, reason = %reason, duration_ms, "Stage skipped the run");
                ctx.try_emit_event(
                    names::STAGE_SKIPPED,
                    Some(serde_json::json!({ "stage": name, "reason": reason })),
                );
                record.state = RunState::Skipped;
                return Ok(());
            }

            match record.state.advance(kind) {
                Some(next) => record.state = next,
                None => warn!(stage = %name, state = %record.state, "Stage ran out of chain order"),
            }
            info!(stage = %name, state = %record.state, duration_ms, "Stage completed");
            ctx.try_emit_event(
                names::STAGE_COMPLETED,
                Some(serde_json::json!({
                    "stage": name,
                    "state": record.state.to_string(),
                    "duration_ms": duration_ms,
                })),
            );
        }
        Ok(())
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("pipeline", &self.config.name)
            .field("watermark", &self.watermark)
            .field("stages", &self.stage_names())
            .finish_non_exhaustive()
    }
}
