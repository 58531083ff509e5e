//! Scripted analytics trigger for tests.

use crate::errors::PipelineError;
use crate::gold::{AnalyticsTrigger, JobSignal};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

/// What a [`ScriptedTrigger`] reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedOutcome {
    /// Start, then succeed.
    Succeed,
    /// Start, then fail with the reason.
    Fail(String),
    /// Refuse to start, with the reason.
    Reject(String),
}

#[derive(Debug, Default)]
struct Calls {
    starts: usize,
    awaits: usize,
}

/// An analytics trigger that plays back a fixed outcome and counts calls.
#[derive(Debug)]
pub struct ScriptedTrigger {
    job_id: String,
    outcome: ScriptedOutcome,
    delay: Option<Duration>,
    calls: Mutex<Calls>,
}

impl ScriptedTrigger {
    /// Creates a trigger with the given outcome.
    #[must_use]
    pub fn new(job_id: impl Into<String>, outcome: ScriptedOutcome) -> Self {
        Self {
            job_id: job_id.into(),
            outcome,
            delay: None,
            calls: Mutex::new(Calls::default()),
        }
    }

    /// A trigger whose runs succeed.
    #[must_use]
    pub fn succeeding(job_id: impl Into<String>) -> Self {
        Self::new(job_id, ScriptedOutcome::Succeed)
    }

    /// A trigger whose runs fail with `reason`.
    #[must_use]
    pub fn failing(job_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(job_id, ScriptedOutcome::Fail(reason.into()))
    }

    /// A trigger that refuses to start.
    #[must_use]
    pub fn rejecting(job_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(job_id, ScriptedOutcome::Reject(reason.into()))
    }

    /// Delays the terminal signal.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `start` calls.
    #[must_use]
    pub fn start_calls(&self) -> usize {
        self.calls.lock().starts
    }

    /// Number of `await_terminal` calls.
    #[must_use]
    pub fn await_calls(&self) -> usize {
        self.calls.lock().awaits
    }

    /// Returns true if the trigger was never started.
    #[must_use]
    pub fn never_called(&self) -> bool {
        self.start_calls() == 0
    }
}

#[async_trait]
impl AnalyticsTrigger for ScriptedTrigger {
    fn job_id(&self) -> &str {
        &self.job_id
    }

    async fn start(&self) -> Result<JobSignal, PipelineError> {
        let n = {
            let mut calls = self.calls.lock();
            calls.starts += 1;
            calls.starts
        };
        Ok(match &self.outcome {
            ScriptedOutcome::Reject(reason) => JobSignal::Failed {
                run_id: None,
                reason: reason.clone(),
            },
            _ => JobSignal::Started {
                run_id: format!("scripted-{n}"),
            },
        })
    }

    async fn await_terminal(&self, run_id: &str) -> Result<JobSignal, PipelineError> {
        self.calls.lock().awaits += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(match &self.outcome {
            ScriptedOutcome::Succeed => JobSignal::Succeeded {
                run_id: run_id.to_string(),
            },
            ScriptedOutcome::Fail(reason) | ScriptedOutcome::Reject(reason) => JobSignal::Failed {
                run_id: Some(run_id.to_string()),
                reason: reason.clone(),
            },
        })
    }
}
