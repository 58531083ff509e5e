//! External analytics trigger.
//!
//! The analytics job is opaque. The pipeline issues one trigger request
//! for a fixed job reference and observes the lifecycle as explicit
//! [`JobSignal`] values: `Started` once the external runner accepts the
//! request, then exactly one of `Succeeded` or `Failed`.

mod command;
#[cfg(feature = "databricks")]
mod databricks;

pub use command::CommandTrigger;
#[cfg(feature = "databricks")]
pub use databricks::DatabricksTrigger;

use crate::config::{AnalyticsConfig, TriggerKind};
use crate::errors::PipelineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// A lifecycle signal from the external runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum JobSignal {
    /// The runner accepted the request.
    Started {
        /// External run id.
        run_id: String,
    },
    /// The run finished successfully.
    Succeeded {
        /// External run id.
        run_id: String,
    },
    /// The run failed, or could not be started.
    Failed {
        /// External run id, if one was assigned.
        run_id: Option<String>,
        /// Reason reported by the runner.
        reason: String,
    },
}

impl JobSignal {
    /// Returns the external run id, if any.
    #[must_use]
    pub fn run_id(&self) -> Option<&str> {
        match self {
            Self::Started { run_id } | Self::Succeeded { run_id } => Some(run_id),
            Self::Failed { run_id, .. } => run_id.as_deref(),
        }
    }

    /// Returns true for `Succeeded` and `Failed`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Started { .. })
    }
}

/// Client side of an external analytics job.
#[async_trait]
pub trait AnalyticsTrigger: Send + Sync + Debug {
    /// The fixed external job reference.
    fn job_id(&self) -> &str;

    /// Requests a run. Returns `Started` or `Failed`.
    async fn start(&self) -> Result<JobSignal, PipelineError>;

    /// Waits for the run's terminal signal (`Succeeded` or `Failed`).
    async fn await_terminal(&self, run_id: &str) -> Result<JobSignal, PipelineError>;
}

/// A completed external run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRun {
    /// The external job reference.
    pub job_id: String,
    /// The external run id.
    pub run_id: String,
    /// Every signal observed, in order.
    pub signals: Vec<JobSignal>,
}

/// Triggers the job and waits for its outcome.
///
/// `on_signal` sees every signal as it is observed. Only `Succeeded`
/// yields `Ok`; `Failed` and an expired `timeout` are `ExternalJob`
/// errors. There is no retry.
///
/// # Errors
///
/// Returns `ExternalJob` when the job fails, cannot be started, or does not
/// finish within `timeout`.
pub async fn run_job<F>(
    trigger: &dyn AnalyticsTrigger,
    timeout: Option<Duration>,
    mut on_signal: F,
) -> Result<JobRun, PipelineError>
where
    F: FnMut(&JobSignal) + Send,
{
    let job_id = trigger.job_id().to_string();
    let mut signals = Vec::with_capacity(2);

    let started = trigger.start().await.map_err(|e| log_failure(&job_id, None, e))?;
    on_signal(&started);
    let run_id = match &started {
        JobSignal::Started { run_id } => {
            info!(job_id = %job_id, run_id = %run_id, "Analytics job started");
            run_id.clone()
        }
        JobSignal::Failed { run_id, reason } => {
            let err = PipelineError::external_job(&job_id, run_id.clone(), reason.clone());
            return Err(log_failure(&job_id, run_id.as_deref(), err));
        }
        JobSignal::Succeeded { run_id } => {
            info!(job_id = %job_id, run_id = %run_id, "Analytics job finished on submit");
            signals.push(started.clone());
            return Ok(JobRun {
                job_id,
                run_id: run_id.clone(),
                signals,
            });
        }
    };
    signals.push(started);

    let wait = trigger.await_terminal(&run_id);
    let terminal = match timeout {
        Some(limit) => match tokio::time::timeout(limit, wait).await {
            Ok(result) => result,
            Err(_) => Ok(JobSignal::Failed {
                run_id: Some(run_id.clone()),
                reason: format!("no terminal signal within {}s", limit.as_secs_f64()),
            }),
        },
        None => wait.await,
    }
    .map_err(|e| log_failure(&job_id, Some(&run_id), e))?;
    on_signal(&terminal);

    match &terminal {
        JobSignal::Succeeded { .. } => {
            info!(job_id = %job_id, run_id = %run_id, "Analytics job succeeded");
            signals.push(terminal);
            Ok(JobRun {
                job_id,
                run_id,
                signals,
            })
        }
        JobSignal::Failed { reason, .. } => {
            let err = PipelineError::external_job(&job_id, Some(run_id.clone()), reason.clone());
            Err(log_failure(&job_id, Some(&run_id), err))
        }
        JobSignal::Started { .. } => {
            let err = PipelineError::external_job(
                &job_id,
                Some(run_id.clone()),
                "runner returned a non-terminal signal",
            );
            Err(log_failure(&job_id, Some(&run_id), err))
        }
    }
}

fn log_failure(job_id: &str, run_id: Option<&str>, err: PipelineError) -> PipelineError {
    error!(job_id = %job_id, run_id = ?run_id, error = %err, "Analytics job failed");
    err
}

/// Builds the trigger selected by `config.kind`.
///
/// # Errors
///
/// Returns `Config` when the selected trigger is not usable with the
/// given settings or was not compiled in.
pub fn build_trigger(config: &AnalyticsConfig) -> Result<Arc<dyn AnalyticsTrigger>, PipelineError> {
    match config.kind {
        TriggerKind::Command => Ok(Arc::new(CommandTrigger::from_config(config)?)),
        #[cfg(feature = "databricks")]
        TriggerKind::Databricks => Ok(Arc::new(DatabricksTrigger::from_config(config)?)),
        #[cfg(not(feature = "databricks"))]
        TriggerKind::Databricks => Err(PipelineError::Config(
            "analytics.kind = \"databricks\" requires the `databricks` feature".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTrigger;

    #[tokio::test]
    async fn test_success_collects_signals() {
        let trigger = ScriptedTrigger::succeeding("job-1");
        let mut seen = Vec::new();
        let run = run_job(&trigger, None, |s| seen.push(s.clone())).await.unwrap();

        assert_eq!(run.job_id, "job-1");
        assert_eq!(run.signals.len(), 2);
        assert_eq!(seen, run.signals);
        assert!(run.signals[1].is_terminal());
    }

    #[tokio::test]
    async fn test_failure_is_external_job_error() {
        let trigger = ScriptedTrigger::failing("job-1", "cluster terminated");
        let err = run_job(&trigger, None, |_| {}).await.unwrap_err();
        match err {
            PipelineError::ExternalJob { job_id, run_id, reason } => {
                assert_eq!(job_id, "job-1");
                assert!(run_id.is_some());
                assert_eq!(reason, "cluster terminated");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_start_rejection() {
        let trigger = ScriptedTrigger::rejecting("job-1", "quota exceeded");
        let err = run_job(&trigger, None, |_| {}).await.unwrap_err();
        assert!(matches!(err, PipelineError::ExternalJob { run_id: None, .. }));
        assert_eq!(trigger.await_calls(), 0);
    }

    #[tokio::test]
    async fn test_timeout_becomes_failure() {
        let trigger = ScriptedTrigger::succeeding("job-1").with_delay(Duration::from_secs(5));
        let err = run_job(&trigger, Some(Duration::from_millis(20)), |_| {})
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no terminal signal"));
    }

    #[test]
    fn test_build_rejects_empty_command() {
        let err = build_trigger(&AnalyticsConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_signal_serialization() {
        let json = serde_json::to_value(JobSignal::Failed {
            run_id: None,
            reason: "boom".to_string(),
        })
        .unwrap();
        assert_eq!(json["signal"], "failed");
        assert_eq!(json["reason"], "boom");
    }
}
