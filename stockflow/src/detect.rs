//! Watermark-based change detection.
//!
//! The detector is a pure read: it lists the raw location, takes the
//! newest modification time among qualifying files and compares it with the
//! watermark observed at run start. It never writes anything.

use crate::errors::PipelineError;
use crate::utils::system_time_to_unix_seconds;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Outcome of a change-detection check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateDecision {
    /// Whether the run has new data to process.
    pub should_run: bool,
    /// Number of qualifying files found.
    pub file_count: usize,
    /// Newest modification time among them, as Unix seconds.
    pub latest_modified: Option<f64>,
    /// The watermark the decision was made against.
    pub watermark: Option<f64>,
}

impl GateDecision {
    /// Human-readable reason for the decision.
    #[must_use]
    pub fn reason(&self) -> String {
        match (self.file_count, self.latest_modified, self.watermark) {
            (0, _, _) => "no qualifying files in raw location".to_string(),
            (_, _, None) => "watermark unset".to_string(),
            (_, Some(latest), Some(wm)) if latest > wm => {
                format!("newest file at {latest} is after watermark {wm}")
            }
            (_, Some(latest), Some(wm)) => {
                format!("newest file at {latest} is not after watermark {wm}")
            }
            (_, None, Some(_)) => "no modification times available".to_string(),
        }
    }
}

/// Lists regular files in `dir` whose name ends in `.{extension}`, sorted
/// by file name.
///
/// # Errors
///
/// Returns `MissingInput` if `dir` does not exist or is not a directory,
/// and `Io` if it cannot be listed.
pub fn list_tabular_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, PipelineError> {
    if !dir.is_dir() {
        return Err(PipelineError::missing_input("raw data directory", dir));
    }
    let suffix = format!(".{extension}");
    let entries = fs::read_dir(dir).map_err(|e| PipelineError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| PipelineError::io(dir, e))?;
        let path = entry.path();
        let is_match = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(&suffix) && n.len() > suffix.len());
        if is_match && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Decides whether the raw location holds data newer than the watermark.
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    raw_dir: PathBuf,
    extension: String,
}

impl ChangeDetector {
    /// Creates a detector over `raw_dir` for files ending in `.{extension}`.
    #[must_use]
    pub fn new(raw_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            raw_dir: raw_dir.into(),
            extension: extension.into(),
        }
    }

    /// Returns the raw location being inspected.
    #[must_use]
    pub fn raw_dir(&self) -> &Path {
        &self.raw_dir
    }

    /// Runs the check against `watermark`.
    ///
    /// # Errors
    ///
    /// Returns `MissingInput` if the raw location is absent and `Io` if a
    /// file's metadata cannot be read.
    pub fn check(&self, watermark: Option<f64>) -> Result<GateDecision, PipelineError> {
        let files = list_tabular_files(&self.raw_dir, &self.extension)?;

        if files.is_empty() {
            info!(
                raw_dir = %self.raw_dir.display(),
                "No new files found in raw data directory"
            );
            return Ok(GateDecision {
                should_run: false,
                file_count: 0,
                latest_modified: None,
                watermark,
            });
        }

        let mut latest: Option<f64> = None;
        for file in &files {
            let modified = fs::metadata(file)
                .and_then(|m| m.modified())
                .map_err(|e| PipelineError::io(file, e))?;
            let secs = system_time_to_unix_seconds(modified);
            debug!(file = %file.display(), modified = secs, "Inspected raw file");
            latest = Some(latest.map_or(secs, |l: f64| l.max(secs)));
        }

        let should_run = match (watermark, latest) {
            (None, _) => true,
            (Some(wm), Some(l)) => l > wm,
            (Some(_), None) => false,
        };

        let decision = GateDecision {
            should_run,
            file_count: files.len(),
            latest_modified: latest,
            watermark,
        };
        info!(
            should_run,
            file_count = decision.file_count,
            latest_modified = ?latest,
            watermark = ?watermark,
            "New data check: {}",
            decision.reason()
        );
        Ok(decision)
    }
}
