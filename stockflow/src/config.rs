//! Pipeline configuration.
//!
//! Every field has a default so an empty TOML file (or no file at all)
//! yields the reference layout under `Data/`:
//!
//! ```toml
//! name = "stock_analytics_incremental_etl"
//!
//! [paths]
//! base_dir = "Data"
//!
//! [gate]
//! mode = "advisory"
//!
//! [analytics]
//! kind = "command"
//! command = ["./run_gold.sh"]
//! ```

use crate::errors::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that relocates the data root.
pub const HOME_ENV: &str = "STOCKFLOW_HOME";

/// Top-level configuration for one pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pipeline name, used in logs and run records.
    pub name: String,
    /// Storage locations.
    pub paths: PathsConfig,
    /// File-name suffix (without the dot) of raw tabular files.
    pub extension: String,
    /// Change-detection gate behavior.
    pub gate: GateConfig,
    /// Watermark state entry.
    pub watermark: WatermarkConfig,
    /// Cleaning stage settings.
    pub silver: SilverConfig,
    /// External analytics job settings.
    pub analytics: AnalyticsConfig,
    /// Logging settings, consumed by the binary.
    pub logging: LoggingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "stock_analytics_incremental_etl".to_string(),
            paths: PathsConfig::default(),
            extension: "csv".to_string(),
            gate: GateConfig::default(),
            watermark: WatermarkConfig::default(),
            silver: SilverConfig::default(),
            analytics: AnalyticsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the default configuration, honoring `STOCKFLOW_HOME`.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Loads a TOML configuration file and applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Io` if the file cannot be read and
    /// `PipelineError::Config` if it does not parse or validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        let mut config = Self::from_toml(&content)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML document without touching the environment.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Config` if the document does not parse.
    pub fn from_toml(content: &str) -> Result<Self, PipelineError> {
        toml::from_str(content).map_err(|e| PipelineError::Config(e.to_string()))
    }

    fn apply_env(&mut self) {
        if let Ok(home) = std::env::var(HOME_ENV) {
            if !home.trim().is_empty() {
                self.paths.base_dir = PathBuf::from(home);
            }
        }
        if self.analytics.host.is_none() {
            if let Ok(host) = std::env::var("DATABRICKS_HOST") {
                self.analytics.host = Some(host);
            }
        }
    }

    /// Sets the data root.
    #[must_use]
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.paths.base_dir = base_dir.into();
        self
    }

    /// Sets the gate mode.
    #[must_use]
    pub fn with_gate_mode(mut self, mode: GateMode) -> Self {
        self.gate.mode = mode;
        self
    }

    /// Enables or disables concurrent table cleaning.
    #[must_use]
    pub fn with_parallel_cleaning(mut self, parallel: bool) -> Self {
        self.silver.parallel = parallel;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Config` describing the first problem found.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.name.trim().is_empty() {
            return Err(PipelineError::Config(
                "pipeline name cannot be empty".to_string(),
            ));
        }
        if self.extension.trim().is_empty() {
            return Err(PipelineError::Config(
                "raw file extension cannot be empty".to_string(),
            ));
        }
        if self.watermark.key.trim().is_empty() {
            return Err(PipelineError::Config(
                "watermark key cannot be empty".to_string(),
            ));
        }
        if self.analytics.poll_interval_secs == 0 {
            return Err(PipelineError::Config(
                "analytics.poll_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Directory the external producer drops raw files into.
    #[must_use]
    pub fn raw_dir(&self) -> PathBuf {
        self.paths.resolve(self.paths.raw.as_deref(), "raw")
    }

    /// Landing (bronze) directory.
    #[must_use]
    pub fn landing_dir(&self) -> PathBuf {
        self.paths.resolve(self.paths.landing.as_deref(), "Bronze")
    }

    /// Processed (silver) directory.
    #[must_use]
    pub fn processed_dir(&self) -> PathBuf {
        self.paths.resolve(self.paths.processed.as_deref(), "processed")
    }

    /// File backing the watermark state store.
    #[must_use]
    pub fn state_file(&self) -> PathBuf {
        self.paths.resolve(self.paths.state_file.as_deref(), "state.json")
    }
}

/// Storage locations. Unset entries resolve under `base_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Data root.
    pub base_dir: PathBuf,
    /// Raw input directory.
    pub raw: Option<PathBuf>,
    /// Landing directory.
    pub landing: Option<PathBuf>,
    /// Processed directory.
    pub processed: Option<PathBuf>,
    /// Watermark state file.
    pub state_file: Option<PathBuf>,
    /// Directory for rolling log files.
    pub log_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("Data"),
            raw: None,
            landing: None,
            processed: None,
            state_file: None,
            log_dir: None,
        }
    }
}

impl PathsConfig {
    fn resolve(&self, explicit: Option<&Path>, default_name: &str) -> PathBuf {
        match explicit {
            Some(p) if p.is_absolute() => p.to_path_buf(),
            Some(p) => self.base_dir.join(p),
            None => self.base_dir.join(default_name),
        }
    }
}

/// Whether a negative gate decision stops the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateMode {
    /// The decision is logged; the chain runs regardless.
    #[default]
    Advisory,
    /// A negative decision ends the run as skipped.
    Authoritative,
}

impl fmt::Display for GateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Advisory => write!(f, "advisory"),
            Self::Authoritative => write!(f, "authoritative"),
        }
    }
}

/// Gate settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Gate mode.
    pub mode: GateMode,
}

/// Watermark settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkConfig {
    /// State-store key holding the last successful run time.
    pub key: String,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            key: "last_successful_run".to_string(),
        }
    }
}

/// Cleaning stage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SilverConfig {
    /// Clean the three tables concurrently.
    pub parallel: bool,
}

/// Which analytics trigger implementation to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// Run a local command.
    #[default]
    Command,
    /// Databricks Jobs API (requires the `databricks` feature).
    Databricks,
}

/// External analytics job settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Fixed external job reference.
    pub job_id: String,
    /// Trigger implementation.
    pub kind: TriggerKind,
    /// Argv for the command trigger.
    pub command: Vec<String>,
    /// Databricks workspace URL.
    pub host: Option<String>,
    /// Seconds between status polls.
    pub poll_interval_secs: u64,
    /// Upper bound on the wait for a terminal signal; `None` waits forever.
    pub timeout_secs: Option<u64>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            job_id: "68731414949078".to_string(),
            kind: TriggerKind::Command,
            command: Vec::new(),
            host: None,
            poll_interval_secs: 10,
            timeout_secs: None,
        }
    }
}

impl AnalyticsConfig {
    /// Poll interval as a `Duration`.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Terminal-wait timeout as a `Duration`.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Console log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level filter when `RUST_LOG` is unset.
    pub level: String,
    /// Console format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}
