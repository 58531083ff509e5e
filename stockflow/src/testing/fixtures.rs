//! Filesystem fixtures: a data root laid out the way the pipeline expects,
//! and sample tables.

use crate::config::PipelineConfig;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Sample investor master table with one duplicate and one null row.
pub const INVESTOR_MASTER_CSV: &str = "\
investor_id,name,risk_profile
1,Asha,High
2,Bram,Low
2,Bram,Low
3,Chen,
4,Dana,Medium
";

/// Sample transactions with one unparseable date.
pub const PORTFOLIO_TRANSACTIONS_CSV: &str = "\
txn_id,investor_id,symbol,quantity,trade_date
101,1,AAA,10,2024-01-02
102,2,BBB,5,2024-01-03
103,2,BBB,5,not-a-date
104,4,AAA,7,2024-01-04
";

/// Builds a stock prices table: `days` rows per symbol, interleaved by
/// date, with close prices rising by one per day.
#[must_use]
pub fn stock_prices_csv(symbols: &[&str], days: usize) -> String {
    let mut out = String::from("trade_date,symbol,open_price,close_price\n");
    for day in 0..days {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.checked_add_days(chrono::Days::new(day as u64)))
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        for (i, symbol) in symbols.iter().enumerate() {
            let base = 100.0 * (i + 1) as f64 + day as f64;
            out.push_str(&format!("{date},{symbol},{base:.1},{:.1}\n", base + 1.0));
        }
    }
    out
}

/// Creates an empty file, including parent directories.
///
/// # Panics
///
/// Panics on I/O failure.
pub fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, b"").expect("write file");
}

/// Sets a file's modification time to `unix_seconds`.
///
/// # Panics
///
/// Panics on I/O failure or a negative time.
pub fn set_mtime(path: &Path, unix_seconds: f64) {
    assert!(unix_seconds >= 0.0, "mtime must be after the epoch");
    let time = UNIX_EPOCH + Duration::from_secs_f64(unix_seconds);
    let file = fs::OpenOptions::new()
        .write(true)
        .open(path)
        .expect("open for mtime");
    file.set_modified(time).expect("set mtime");
}

/// Modification time of `path` as Unix seconds.
///
/// # Panics
///
/// Panics on I/O failure.
#[must_use]
pub fn mtime(path: &Path) -> f64 {
    let modified: SystemTime = fs::metadata(path)
        .and_then(|m| m.modified())
        .expect("read mtime");
    crate::utils::system_time_to_unix_seconds(modified)
}

/// A data root with the default raw / landing / processed layout.
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    /// Uses `root` as the data root. Nothing is created.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Data root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// A default configuration rooted here.
    #[must_use]
    pub fn config(&self) -> PipelineConfig {
        PipelineConfig::new().with_base_dir(&self.root)
    }

    /// Raw directory.
    #[must_use]
    pub fn raw_dir(&self) -> PathBuf {
        self.config().raw_dir()
    }

    /// Landing directory.
    #[must_use]
    pub fn landing_dir(&self) -> PathBuf {
        self.config().landing_dir()
    }

    /// Processed directory.
    #[must_use]
    pub fn processed_dir(&self) -> PathBuf {
        self.config().processed_dir()
    }

    /// Creates the raw directory.
    ///
    /// # Panics
    ///
    /// Panics on I/O failure.
    pub fn create_raw_dir(&self) {
        fs::create_dir_all(self.raw_dir()).expect("create raw dir");
    }

    /// Writes a raw file.
    ///
    /// # Panics
    ///
    /// Panics on I/O failure.
    pub fn write_raw(&self, name: &str, content: &str) -> PathBuf {
        write(&self.raw_dir(), name, content)
    }

    /// Writes a landing file.
    ///
    /// # Panics
    ///
    /// Panics on I/O failure.
    pub fn write_landing(&self, name: &str, content: &str) -> PathBuf {
        write(&self.landing_dir(), name, content)
    }

    /// Writes the three sample tables to the raw directory.
    pub fn write_raw_defaults(&self) {
        self.write_raw("investor_master.csv", INVESTOR_MASTER_CSV);
        self.write_raw("portfolio_transactions.csv", PORTFOLIO_TRANSACTIONS_CSV);
        self.write_raw("stock_prices.csv", &stock_prices_csv(&["AAA", "BBB"], 25));
    }

    /// Writes the three sample tables to the landing directory.
    pub fn write_landing_defaults(&self) {
        self.write_landing("investor_master.csv", INVESTOR_MASTER_CSV);
        self.write_landing("portfolio_transactions.csv", PORTFOLIO_TRANSACTIONS_CSV);
        self.write_landing("stock_prices.csv", &stock_prices_csv(&["AAA", "BBB"], 25));
    }

    /// Reads a processed table as text.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be read.
    #[must_use]
    pub fn read_processed(&self, name: &str) -> String {
        fs::read_to_string(self.processed_dir().join(name)).expect("read processed table")
    }

    /// Sets the modification time of every raw file.
    pub fn age_raw_files(&self, unix_seconds: f64) {
        if let Ok(entries) = fs::read_dir(self.raw_dir()) {
            for entry in entries.flatten() {
                set_mtime(&entry.path(), unix_seconds);
            }
        }
    }
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    fs::create_dir_all(dir).expect("create dir");
    let path = dir.join(name);
    fs::write(&path, content).expect("write fixture");
    path
}
