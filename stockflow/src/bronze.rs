//! Landing copier.
//!
//! Mirrors every qualifying raw file into the landing area under the same
//! name. Each copy goes to a temporary sibling first and is renamed into
//! place, so a landing table is either the previous version or a complete
//! copy of the current raw file. Landing files without a raw counterpart
//! are left alone.

use crate::detect::list_tabular_files;
use crate::errors::PipelineError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// One landing copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopiedFile {
    /// File name shared by the raw file and its landing copy.
    pub file_name: String,
    /// Bytes written.
    pub bytes: u64,
    /// Hex SHA-256 of the content.
    pub sha256: String,
}

/// Summary of one copier run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyReport {
    /// Files copied, in name order.
    pub files: Vec<CopiedFile>,
}

impl CopyReport {
    /// Number of files copied.
    #[must_use]
    pub fn count(&self) -> usize {
        self.files.len()
    }

    /// Total bytes copied.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.bytes).sum()
    }
}

/// Copies raw tabular files into the landing area.
#[derive(Debug, Clone)]
pub struct LandingCopier {
    raw_dir: PathBuf,
    landing_dir: PathBuf,
    extension: String,
}

impl LandingCopier {
    /// Creates a copier.
    #[must_use]
    pub fn new(
        raw_dir: impl Into<PathBuf>,
        landing_dir: impl Into<PathBuf>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            raw_dir: raw_dir.into(),
            landing_dir: landing_dir.into(),
            extension: extension.into(),
        }
    }

    /// Returns the landing directory.
    #[must_use]
    pub fn landing_dir(&self) -> &Path {
        &self.landing_dir
    }

    /// Copies every qualifying file.
    ///
    /// Copies already completed before a failure stay in place.
    ///
    /// # Errors
    ///
    /// Returns `MissingInput` if the raw location is absent and `Io` for any
    /// failed read, write or rename.
    pub fn copy_all(&self) -> Result<CopyReport, PipelineError> {
        let files = match list_tabular_files(&self.raw_dir, &self.extension) {
            Ok(files) => files,
            Err(e) => {
                error!(raw_dir = %self.raw_dir.display(), error = %e, "Raw data directory not found");
                return Err(e);
            }
        };

        fs::create_dir_all(&self.landing_dir)
            .map_err(|e| PipelineError::io(&self.landing_dir, e))?;

        let mut report = CopyReport::default();
        for src in &files {
            let copied = self.copy_one(src).map_err(|e| {
                error!(file = %src.display(), error = %e, "Failed to copy raw file to landing area");
                e
            })?;
            info!(
                file = %copied.file_name,
                bytes = copied.bytes,
                sha256 = %copied.sha256,
                "Copied file to landing area"
            );
            report.files.push(copied);
        }

        info!(
            files_copied = report.count(),
            total_bytes = report.total_bytes(),
            landing_dir = %self.landing_dir.display(),
            "Total files copied: {}",
            report.count()
        );
        Ok(report)
    }

    fn copy_one(&self, src: &Path) -> Result<CopiedFile, PipelineError> {
        let file_name = src
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PipelineError::missing_input("file name", src))?
            .to_string();
        let dest = self.landing_dir.join(&file_name);
        let tmp = self.landing_dir.join(format!(".{file_name}.tmp"));

        let result = copy_hashed(src, &tmp).and_then(|(bytes, sha256)| {
            fs::rename(&tmp, &dest).map_err(|e| PipelineError::io(&dest, e))?;
            Ok(CopiedFile {
                file_name,
                bytes,
                sha256,
            })
        });
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }
}

fn copy_hashed(src: &Path, dest: &Path) -> Result<(u64, String), PipelineError> {
    let mut reader = File::open(src).map_err(|e| PipelineError::io(src, e))?;
    let mut writer = File::create(dest).map_err(|e| PipelineError::io(dest, e))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    let mut total = 0u64;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(PipelineError::io(src, e)),
        };
        hasher.update(&buf[..n]);
        writer
            .write_all(&buf[..n])
            .map_err(|e| PipelineError::io(dest, e))?;
        total += n as u64;
    }
    writer.sync_all().map_err(|e| PipelineError::io(dest, e))?;

    Ok((total, hex::encode(hasher.finalize())))
}
