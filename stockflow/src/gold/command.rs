//! Analytics trigger that runs a local command.

use super::{AnalyticsTrigger, JobSignal};
use crate::config::AnalyticsConfig;
use crate::errors::PipelineError;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Environment variable carrying the job reference into the command.
pub const JOB_ID_ENV: &str = "STOCKFLOW_JOB_ID";
/// Environment variable carrying the run id into the command.
pub const RUN_ID_ENV: &str = "STOCKFLOW_RUN_ID";

/// Runs a configured command per trigger. Exit status 0 is success.
///
/// Dropping an unfinished wait kills the child.
#[derive(Debug)]
pub struct CommandTrigger {
    job_id: String,
    program: String,
    args: Vec<String>,
    running: Mutex<HashMap<String, Child>>,
}

impl CommandTrigger {
    /// Creates a trigger for `argv`.
    ///
    /// # Errors
    ///
    /// Returns `Config` if `argv` is empty.
    pub fn new(job_id: impl Into<String>, argv: &[String]) -> Result<Self, PipelineError> {
        let (program, args) = argv.split_first().ok_or_else(|| {
            PipelineError::Config("analytics.command must name a program".to_string())
        })?;
        Ok(Self {
            job_id: job_id.into(),
            program: program.clone(),
            args: args.to_vec(),
            running: Mutex::new(HashMap::new()),
        })
    }

    /// Creates a trigger from configuration.
    ///
    /// # Errors
    ///
    /// Returns `Config` if no command is configured.
    pub fn from_config(config: &AnalyticsConfig) -> Result<Self, PipelineError> {
        Self::new(config.job_id.clone(), &config.command)
    }
}

#[async_trait]
impl AnalyticsTrigger for CommandTrigger {
    fn job_id(&self) -> &str {
        &self.job_id
    }

    async fn start(&self) -> Result<JobSignal, PipelineError> {
        let run_id = Uuid::new_v4().to_string();
        let spawned = Command::new(&self.program)
            .args(&self.args)
            .env(JOB_ID_ENV, &self.job_id)
            .env(RUN_ID_ENV, &run_id)
            .kill_on_drop(true)
            .spawn();

        match spawned {
            Ok(child) => {
                debug!(program = %self.program, run_id = %run_id, pid = ?child.id(), "Spawned analytics command");
                self.running.lock().await.insert(run_id.clone(), child);
                Ok(JobSignal::Started { run_id })
            }
            Err(e) => Ok(JobSignal::Failed {
                run_id: None,
                reason: format!("failed to spawn '{}': {e}", self.program),
            }),
        }
    }

    async fn await_terminal(&self, run_id: &str) -> Result<JobSignal, PipelineError> {
        let child = self.running.lock().await.remove(run_id);
        let Some(mut child) = child else {
            return Err(PipelineError::external_job(
                &self.job_id,
                Some(run_id.to_string()),
                "unknown run id",
            ));
        };

        let status = child.wait().await.map_err(|e| {
            PipelineError::external_job(&self.job_id, Some(run_id.to_string()), e.to_string())
        })?;
        if status.success() {
            Ok(JobSignal::Succeeded {
                run_id: run_id.to_string(),
            })
        } else {
            Ok(JobSignal::Failed {
                run_id: Some(run_id.to_string()),
                reason: format!("command exited with {status}"),
            })
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::gold::run_job;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn test_zero_exit_succeeds() {
        let trigger = CommandTrigger::new("42", &sh("test \"$STOCKFLOW_JOB_ID\" = 42")).unwrap();
        let run = run_job(&trigger, None, |_| {}).await.unwrap();
        assert_eq!(run.job_id, "42");
    }

    #[tokio::test]
    async fn test_nonzero_exit_fails() {
        let trigger = CommandTrigger::new("42", &sh("exit 3")).unwrap();
        let err = run_job(&trigger, None, |_| {}).await.unwrap_err();
        assert!(matches!(err, PipelineError::ExternalJob { .. }));
    }

    #[tokio::test]
    async fn test_missing_program_fails_to_start() {
        let argv = vec!["/definitely/not/a/program".to_string()];
        let trigger = CommandTrigger::new("42", &argv).unwrap();
        let signal = trigger.start().await.unwrap();
        assert!(matches!(signal, JobSignal::Failed { run_id: None, .. }));
    }

    #[test]
    fn test_empty_argv_rejected() {
        assert!(CommandTrigger::new("42", &[]).is_err());
    }
}
