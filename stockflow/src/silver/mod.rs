//! Cleaning and feature pipeline.
//!
//! Reads the three landing tables, cleans each one and writes it to the
//! processed area under its fixed name. Tables are independent; the
//! processing order only decides which failure is reported.

mod datasets;
mod features;
mod table;

pub use datasets::{CleanStats, Cleaned, Dataset};
pub use features::{
    daily_return, grouped_rolling_mean, risk_category, HIGH_RISK_PROFILE, LONG_WINDOW,
    SHORT_WINDOW,
};
pub use table::{read_table, require_columns, write_table, NULL_TOKENS};

use crate::config::SilverConfig;
use crate::errors::PipelineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Outcome for one cleaned table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableReport {
    /// The dataset.
    pub dataset: Dataset,
    /// Where the cleaned table was written.
    pub output: PathBuf,
    /// Row accounting.
    pub stats: CleanStats,
}

/// Outcome of a full cleaning pass, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningReport {
    /// Per-table outcomes.
    pub tables: Vec<TableReport>,
}

/// Cleans every landing table into the processed area.
#[derive(Debug, Clone)]
pub struct CleaningPipeline {
    landing_dir: PathBuf,
    processed_dir: PathBuf,
    config: SilverConfig,
}

impl CleaningPipeline {
    /// Creates a pipeline.
    #[must_use]
    pub fn new(
        landing_dir: impl Into<PathBuf>,
        processed_dir: impl Into<PathBuf>,
        config: SilverConfig,
    ) -> Self {
        Self {
            landing_dir: landing_dir.into(),
            processed_dir: processed_dir.into(),
            config,
        }
    }

    /// Returns the processed directory.
    #[must_use]
    pub fn processed_dir(&self) -> &Path {
        &self.processed_dir
    }

    fn prepare(&self) -> Result<(), PipelineError> {
        if !self.landing_dir.is_dir() {
            let err = PipelineError::missing_input("landing directory", &self.landing_dir);
            error!(landing_dir = %self.landing_dir.display(), error = %err, "Silver layer failed");
            return Err(err);
        }
        fs::create_dir_all(&self.processed_dir)
            .map_err(|e| PipelineError::io(&self.processed_dir, e))
    }

    /// Cleans one dataset and writes its output.
    ///
    /// # Errors
    ///
    /// Returns the first error hit while reading, cleaning or writing.
    pub fn clean_one(&self, dataset: Dataset) -> Result<TableReport, PipelineError> {
        let input = self.landing_dir.join(dataset.input_file());
        let output = self.processed_dir.join(dataset.output_file());

        let result = read_table(dataset.name(), &input)
            .and_then(|df| dataset.clean(df))
            .and_then(|mut cleaned| {
                write_table(dataset.name(), &mut cleaned.table, &output)?;
                Ok(cleaned.stats)
            });

        match result {
            Ok(stats) => {
                info!(
                    table = dataset.name(),
                    rows_in = stats.rows_in,
                    rows_out = stats.rows_out,
                    nulls_dropped = stats.nulls_dropped,
                    duplicates_dropped = stats.duplicates_dropped,
                    "Cleaned {} successfully",
                    dataset
                );
                Ok(TableReport {
                    dataset,
                    output,
                    stats,
                })
            }
            Err(e) => {
                error!(table = dataset.name(), input = %input.display(), error = %e, "Failed to clean table");
                Err(e)
            }
        }
    }

    /// Cleans the tables one after another on the calling thread, stopping
    /// at the first failure.
    ///
    /// # Errors
    ///
    /// Returns `MissingInput` if the landing area is absent, otherwise the
    /// first table's error.
    pub fn run_blocking(&self) -> Result<CleaningReport, PipelineError> {
        self.prepare()?;
        let mut report = CleaningReport::default();
        for dataset in Dataset::ALL {
            report.tables.push(self.clean_one(dataset)?);
        }
        Ok(report)
    }

    /// Runs the pass on blocking worker threads.
    ///
    /// With `parallel` enabled all tables are cleaned concurrently; the
    /// reported error is still the first failing table in processing order.
    ///
    /// # Errors
    ///
    /// Same as [`run_blocking`](Self::run_blocking).
    pub async fn run(&self) -> Result<CleaningReport, PipelineError> {
        info!(parallel = self.config.parallel, "Silver layer transformation started");

        if !self.config.parallel {
            let this = self.clone();
            return tokio::task::spawn_blocking(move || this.run_blocking())
                .await
                .map_err(|e| self.worker_error(&e))?;
        }

        self.prepare()?;
        let handles: Vec<_> = Dataset::ALL
            .into_iter()
            .map(|dataset| {
                let this = self.clone();
                tokio::task::spawn_blocking(move || this.clean_one(dataset))
            })
            .collect();

        let mut report = CleaningReport::default();
        for joined in futures::future::join_all(handles).await {
            let table = joined.map_err(|e| self.worker_error(&e))??;
            report.tables.push(table);
        }
        Ok(report)
    }

    fn worker_error(&self, err: &tokio::task::JoinError) -> PipelineError {
        PipelineError::io(
            &self.landing_dir,
            std::io::Error::other(format!("cleaning worker did not complete: {err}")),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::DataLayout;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_landing_dir() {
        let dir = TempDir::new().unwrap();
        let layout = DataLayout::new(dir.path());
        let pipeline = CleaningPipeline::new(
            layout.landing_dir(),
            layout.processed_dir(),
            SilverConfig::default(),
        );
        let err = pipeline.run().await.unwrap_err();
        assert!(matches!(err, PipelineError::MissingInput { .. }));
    }

    #[tokio::test]
    async fn test_writes_three_outputs() {
        let dir = TempDir::new().unwrap();
        let layout = DataLayout::new(dir.path());
        layout.write_landing_defaults();

        let pipeline = CleaningPipeline::new(
            layout.landing_dir(),
            layout.processed_dir(),
            SilverConfig::default(),
        );
        let report = pipeline.run().await.unwrap();
        let names: Vec<_> = report.tables.iter().map(|t| t.dataset).collect();
        assert_eq!(names, Dataset::ALL.to_vec());
        for dataset in Dataset::ALL {
            assert!(layout.processed_dir().join(dataset.output_file()).is_file());
        }
    }

    #[tokio::test]
    async fn test_sequential_stops_at_first_failure() {
        let dir = TempDir::new().unwrap();
        let layout = DataLayout::new(dir.path());
        layout.write_landing_defaults();
        layout.write_landing("portfolio_transactions.csv", "txn_id,amount\n1,10\n");

        let pipeline = CleaningPipeline::new(
            layout.landing_dir(),
            layout.processed_dir(),
            SilverConfig::default(),
        );
        let err = pipeline.run().await.unwrap_err();
        assert!(matches!(err, PipelineError::SchemaOrParse { ref table, .. } if table == "portfolio_transactions"));
        assert!(layout.processed_dir().join("investor_master_clean.csv").is_file());
        assert!(!layout.processed_dir().join("stock_prices_clean.csv").exists());
    }

    #[tokio::test]
    async fn test_parallel_reports_first_failure_in_order() {
        let dir = TempDir::new().unwrap();
        let layout = DataLayout::new(dir.path());
        layout.write_landing_defaults();
        layout.write_landing("portfolio_transactions.csv", "txn_id,amount\n1,10\n");
        std::fs::remove_file(layout.landing_dir().join("stock_prices.csv")).unwrap();

        let config = SilverConfig { parallel: true };
        let pipeline = CleaningPipeline::new(layout.landing_dir(), layout.processed_dir(), config);
        let err = pipeline.run().await.unwrap_err();
        assert!(matches!(err, PipelineError::SchemaOrParse { ref table, .. } if table == "portfolio_transactions"));
    }
}
