//! Databricks Jobs API trigger.

use super::{AnalyticsTrigger, JobSignal};
use crate::config::AnalyticsConfig;
use crate::errors::PipelineError;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Environment variable holding the personal access token.
pub const TOKEN_ENV: &str = "DATABRICKS_TOKEN";

const TERMINAL_STATES: &[&str] = &["TERMINATED", "SKIPPED", "INTERNAL_ERROR"];

#[derive(Debug, Deserialize)]
struct RunNowResponse {
    run_id: u64,
}

#[derive(Debug, Deserialize)]
struct RunState {
    life_cycle_state: String,
    #[serde(default)]
    result_state: Option<String>,
    #[serde(default)]
    state_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RunResponse {
    state: RunState,
}

/// Runs a Databricks job through Jobs API 2.1 and polls it to completion.
#[derive(Debug)]
pub struct DatabricksTrigger {
    job_id: String,
    numeric_job_id: u64,
    host: String,
    token: String,
    poll_interval: Duration,
    client: reqwest::Client,
}

impl DatabricksTrigger {
    /// Creates a trigger.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the job id is not numeric or the HTTP client
    /// cannot be built.
    pub fn new(
        job_id: impl Into<String>,
        host: impl Into<String>,
        token: impl Into<String>,
        poll_interval: Duration,
    ) -> Result<Self, PipelineError> {
        let job_id = job_id.into();
        let numeric_job_id = job_id.trim().parse::<u64>().map_err(|_| {
            PipelineError::Config(format!("Databricks job id '{job_id}' is not numeric"))
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| PipelineError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            job_id,
            numeric_job_id,
            host: host.into().trim_end_matches('/').to_string(),
            token: token.into(),
            poll_interval,
            client,
        })
    }

    /// Creates a trigger from configuration and `DATABRICKS_TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the host or token is missing.
    pub fn from_config(config: &AnalyticsConfig) -> Result<Self, PipelineError> {
        let host = config.host.clone().ok_or_else(|| {
            PipelineError::Config("analytics.host (or DATABRICKS_HOST) is required".to_string())
        })?;
        let token = std::env::var(TOKEN_ENV)
            .map_err(|_| PipelineError::Config(format!("{TOKEN_ENV} is not set")))?;
        Self::new(config.job_id.clone(), host, token, config.poll_interval())
    }

    fn transport_error(&self, run_id: Option<&str>, err: &reqwest::Error) -> PipelineError {
        PipelineError::external_job(&self.job_id, run_id.map(ToString::to_string), err.to_string())
    }
}

#[async_trait]
impl AnalyticsTrigger for DatabricksTrigger {
    fn job_id(&self) -> &str {
        &self.job_id
    }

    async fn start(&self) -> Result<JobSignal, PipelineError> {
        let response = self
            .client
            .post(format!("{}/api/2.1/jobs/run-now", self.host))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "job_id": self.numeric_job_id }))
            .send()
            .await
            .map_err(|e| self.transport_error(None, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Ok(JobSignal::Failed {
                run_id: None,
                reason: format!("run-now returned {status}: {body}"),
            });
        }
        let body: RunNowResponse = response
            .json()
            .await
            .map_err(|e| self.transport_error(None, &e))?;
        Ok(JobSignal::Started {
            run_id: body.run_id.to_string(),
        })
    }

    async fn await_terminal(&self, run_id: &str) -> Result<JobSignal, PipelineError> {
        let url = format!("{}/api/2.1/jobs/runs/get", self.host);
        loop {
            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .query(&[("run_id", run_id)])
                .send()
                .await
                .and_then(reqwest::Response::error_for_status)
                .map_err(|e| self.transport_error(Some(run_id), &e))?;
            let run: RunResponse = response
                .json()
                .await
                .map_err(|e| self.transport_error(Some(run_id), &e))?;

            let state = run.state;
            debug!(
                run_id = %run_id,
                life_cycle_state = %state.life_cycle_state,
                result_state = ?state.result_state,
                "Polled analytics run"
            );
            if TERMINAL_STATES.contains(&state.life_cycle_state.as_str()) {
                return Ok(if state.result_state.as_deref() == Some("SUCCESS") {
                    JobSignal::Succeeded {
                        run_id: run_id.to_string(),
                    }
                } else {
                    JobSignal::Failed {
                        run_id: Some(run_id.to_string()),
                        reason: format!(
                            "{} / {}: {}",
                            state.life_cycle_state,
                            state.result_state.as_deref().unwrap_or("NO_RESULT"),
                            state.state_message.unwrap_or_default()
                        ),
                    }
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_numeric_job_id_rejected() {
        let err = DatabricksTrigger::new("abc", "https://x", "t", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_host_trailing_slash_trimmed() {
        let trigger =
            DatabricksTrigger::new("68731414949078", "https://x/", "t", Duration::from_secs(1)).unwrap();
        assert_eq!(trigger.host, "https://x");
        assert_eq!(trigger.job_id(), "68731414949078");
    }

    #[test]
    fn test_run_state_parses() {
        let run: RunResponse = serde_json::from_str(
            r#"{"state":{"life_cycle_state":"TERMINATED","result_state":"FAILED","state_message":"boom"}}"#,
        )
        .unwrap();
        assert_eq!(run.state.result_state.as_deref(), Some("FAILED"));
    }
}
