//! The three cleaned tables and their rules.
//!
//! Every dataset goes through the same sequence: coerce `trade_date` where
//! present, drop rows with a null cell, drop exact duplicates, then derive
//! its features. Stock prices additionally drop the rows whose derived
//! values are undefined.

use super::features::{
    daily_return, grouped_rolling_mean, risk_category, LONG_WINDOW, SHORT_WINDOW,
};
use super::table::require_columns;
use crate::errors::PipelineError;
use crate::utils::parse_trade_date;
use chrono::{NaiveDateTime, Timelike};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A cleaned table produced by the cleaning stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    /// Investor reference data.
    InvestorMaster,
    /// Buy/sell records.
    PortfolioTransactions,
    /// Daily open/close prices per symbol.
    StockPrices,
}

impl Dataset {
    /// All datasets in processing order.
    pub const ALL: [Self; 3] = [
        Self::InvestorMaster,
        Self::PortfolioTransactions,
        Self::StockPrices,
    ];

    /// Logical table name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::InvestorMaster => "investor_master",
            Self::PortfolioTransactions => "portfolio_transactions",
            Self::StockPrices => "stock_prices",
        }
    }

    /// Landing file name.
    #[must_use]
    pub fn input_file(self) -> String {
        format!("{}.csv", self.name())
    }

    /// Processed file name.
    #[must_use]
    pub fn output_file(self) -> String {
        format!("{}_clean.csv", self.name())
    }

    /// Columns the rules read.
    #[must_use]
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            Self::InvestorMaster => &["risk_profile"],
            Self::PortfolioTransactions => &["trade_date"],
            Self::StockPrices => &["trade_date", "symbol", "open_price", "close_price"],
        }
    }

    /// Applies this dataset's cleaning and feature rules.
    ///
    /// # Errors
    ///
    /// Returns `SchemaOrParse` when a required column is missing or a
    /// price cannot be read as a number.
    pub fn clean(self, df: DataFrame) -> Result<Cleaned, PipelineError> {
        let name = self.name();
        let rows_in = df.height();
        require_columns(name, &df, self.required_columns())?;

        let (mut df, dates_coerced) = match self {
            Self::InvestorMaster => (df, 0),
            Self::PortfolioTransactions | Self::StockPrices => coerce_trade_dates(name, df)?,
        };

        let before = df.height();
        let complete = no_nulls(&df);
        df = collect(name, df.lazy().filter(complete))?;
        let nulls_dropped = before - df.height();

        if self == Self::StockPrices {
            to_float(name, &mut df, "open_price")?;
            to_float(name, &mut df, "close_price")?;
        }

        let before = df.height();
        let subset = Some(
            df.get_column_names()
                .iter()
                .map(|column| column.as_str().into())
                .collect(),
        );
        df = collect(
            name,
            df.lazy().unique_stable(subset, UniqueKeepStrategy::First),
        )?;
        let duplicates_dropped = before - df.height();

        let mut undefined_dropped = 0;
        match self {
            Self::InvestorMaster => {
                df = collect(name, df.lazy().with_column(risk_category()))?;
            }
            Self::PortfolioTransactions => {}
            Self::StockPrices => {
                let derived = collect(
                    name,
                    df.lazy().with_columns([
                        daily_return(),
                        grouped_rolling_mean("close_price", "symbol", SHORT_WINDOW).alias("ma_5"),
                        grouped_rolling_mean("close_price", "symbol", LONG_WINDOW).alias("ma_20"),
                    ]),
                )?;
                let before = derived.height();
                // A zero open over a non-zero close is an infinite return and
                // stays; zero over zero is NaN and goes.
                df = collect(
                    name,
                    derived.lazy().filter(
                        col("daily_return")
                            .is_not_nan()
                            .and(col("ma_5").is_not_null())
                            .and(col("ma_20").is_not_null()),
                    ),
                )?;
                undefined_dropped = before - df.height();
            }
        }

        Ok(Cleaned {
            stats: CleanStats {
                rows_in,
                dates_coerced,
                nulls_dropped,
                duplicates_dropped,
                undefined_dropped,
                rows_out: df.height(),
            },
            table: df,
        })
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Row accounting for one cleaned table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanStats {
    /// Rows read from the landing file.
    pub rows_in: usize,
    /// `trade_date` values that did not parse and became null.
    pub dates_coerced: usize,
    /// Rows dropped for containing a null.
    pub nulls_dropped: usize,
    /// Exact duplicates dropped.
    pub duplicates_dropped: usize,
    /// Rows dropped because a derived value was undefined.
    pub undefined_dropped: usize,
    /// Rows written.
    pub rows_out: usize,
}

/// A cleaned table and its accounting.
#[derive(Debug, Clone)]
pub struct Cleaned {
    /// The cleaned table.
    pub table: DataFrame,
    /// Row accounting.
    pub stats: CleanStats,
}

fn collect(name: &str, frame: LazyFrame) -> Result<DataFrame, PipelineError> {
    frame
        .collect()
        .map_err(|e| PipelineError::schema(name, e.to_string()))
}

fn no_nulls(df: &DataFrame) -> Expr {
    df.get_column_names()
        .iter()
        .map(|column| col(column.as_str()).is_not_null())
        .reduce(|acc, expr| acc.and(expr))
        .unwrap_or_else(|| lit(true))
}

fn to_float(name: &str, df: &mut DataFrame, column: &str) -> Result<(), PipelineError> {
    let cast = df
        .column(column)
        .map_err(|e| PipelineError::schema(name, e.to_string()))?
        .as_materialized_series()
        .strict_cast(&DataType::Float64)
        .map_err(|e| {
            PipelineError::schema(name, format!("column '{column}' is not numeric: {e}"))
        })?;
    df.with_column(cast)
        .map_err(|e| PipelineError::schema(name, e.to_string()))?;
    Ok(())
}

/// Parses `trade_date` in place. Unparseable values become null. Returns
/// the frame and how many non-null values were nulled.
fn coerce_trade_dates(name: &str, mut df: DataFrame) -> Result<(DataFrame, usize), PipelineError> {
    let schema_err = |e: PolarsError| PipelineError::schema(name, e.to_string());
    let raw = df
        .column("trade_date")
        .map_err(schema_err)?
        .cast(&DataType::String)
        .map_err(schema_err)?;
    let raw = raw.as_materialized_series().str().map_err(schema_err)?;

    let parsed: Vec<Option<NaiveDateTime>> = raw
        .into_iter()
        .map(|v| v.and_then(parse_trade_date))
        .collect();
    let coerced = raw
        .into_iter()
        .zip(&parsed)
        .filter(|(text, p)| text.is_some() && p.is_none())
        .count();

    let date_only = parsed
        .iter()
        .flatten()
        .all(|dt| dt.num_seconds_from_midnight() == 0 && dt.nanosecond() == 0);
    let fmt = if date_only {
        "%Y-%m-%d"
    } else {
        "%Y-%m-%d %H:%M:%S"
    };

    let formatted: StringChunked = parsed
        .iter()
        .map(|p| p.map(|dt| dt.format(fmt).to_string()))
        .collect();
    df.with_column(formatted.with_name("trade_date".into()).into_series())
        .map_err(schema_err)?;
    Ok((df, coerced))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::silver::table::read_table;
    use crate::testing::fixtures::stock_prices_csv;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn frame(name: &str, csv: &str) -> DataFrame {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(format!("{name}.csv"));
        std::fs::write(&path, csv).unwrap();
        read_table(name, &path).unwrap()
    }

    fn text(df: &DataFrame, name: &str) -> Vec<String> {
        let column = df.column(name).unwrap().cast(&DataType::String).unwrap();
        column
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap().to_string())
            .collect()
    }

    fn floats(df: &DataFrame, name: &str) -> Vec<f64> {
        df.column(name)
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .map(Option::unwrap)
            .collect()
    }

    #[test]
    fn test_investor_duplicate_collapses_to_one_high_risk_row() {
        let input = frame("investor_master", "id,risk_profile\n1,High\n1,High\n");
        let cleaned = Dataset::InvestorMaster.clean(input).unwrap();
        assert_eq!(cleaned.table.height(), 1);
        assert_eq!(text(&cleaned.table, "risk_category"), vec!["High Risk"]);
        assert_eq!(cleaned.stats.duplicates_dropped, 1);
    }

    #[test]
    fn test_investor_requires_risk_profile() {
        let input = frame("investor_master", "id\n1\n");
        let err = Dataset::InvestorMaster.clean(input).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaOrParse { .. }));
    }

    #[test]
    fn test_short_investor_row_is_dropped_as_null() {
        let input = frame(
            "investor_master",
            "investor_id,risk_profile\n1,High\n2\n3,Low\n",
        );
        let cleaned = Dataset::InvestorMaster.clean(input).unwrap();
        assert_eq!(text(&cleaned.table, "investor_id"), vec!["1", "3"]);
        assert_eq!(cleaned.stats.nulls_dropped, 1);
    }

    #[test]
    fn test_numerically_equal_rows_are_duplicates() {
        let input = frame(
            "portfolio_transactions",
            "txn_id,trade_date,amount\n1,2024-01-02,10\n1,2024-01-02,10.0\n",
        );
        let cleaned = Dataset::PortfolioTransactions.clean(input).unwrap();
        assert_eq!(cleaned.table.height(), 1);
        assert_eq!(cleaned.stats.duplicates_dropped, 1);
    }

    #[test]
    fn test_transactions_drop_unparseable_dates() {
        let input = frame(
            "portfolio_transactions",
            "txn_id,trade_date\n1,2024-01-02\n2,not a date\n3,01/03/2024\n4,\n",
        );
        let cleaned = Dataset::PortfolioTransactions.clean(input).unwrap();
        assert_eq!(text(&cleaned.table, "txn_id"), vec!["1", "3"]);
        assert_eq!(
            text(&cleaned.table, "trade_date"),
            vec!["2024-01-02", "2024-01-03"]
        );
        assert_eq!(cleaned.stats.dates_coerced, 1);
        assert_eq!(cleaned.stats.nulls_dropped, 2);
    }

    #[test]
    fn test_dates_that_normalize_equal_are_duplicates() {
        let input = frame(
            "portfolio_transactions",
            "txn_id,trade_date\n1,2024-01-02\n1,01/02/2024\n",
        );
        let cleaned = Dataset::PortfolioTransactions.clean(input).unwrap();
        assert_eq!(cleaned.table.height(), 1);
    }

    #[test]
    fn test_datetime_output_when_times_present() {
        let input = frame(
            "portfolio_transactions",
            "txn_id,trade_date\n1,2024-01-02 09:30:00\n2,2024-01-03\n",
        );
        let cleaned = Dataset::PortfolioTransactions.clean(input).unwrap();
        assert_eq!(
            text(&cleaned.table, "trade_date"),
            vec!["2024-01-02 09:30:00", "2024-01-03 00:00:00"]
        );
    }

    #[test]
    fn test_stock_features() {
        let input = frame("stock_prices", &stock_prices_csv(&["A", "B"], 21));
        let cleaned = Dataset::StockPrices.clean(input).unwrap();

        assert_eq!(
            cleaned.table.get_column_names_str(),
            vec![
                "trade_date", "symbol", "open_price", "close_price", "daily_return", "ma_5",
                "ma_20"
            ]
        );
        // Only the last two days have a 20-row history.
        assert_eq!(text(&cleaned.table, "symbol"), vec!["A", "B", "A", "B"]);
        assert_eq!(cleaned.stats.undefined_dropped, 38);

        // A closes at 101 + day: day 19 averages days 15..=19 and 0..=19.
        let ma_5 = floats(&cleaned.table, "ma_5");
        let ma_20 = floats(&cleaned.table, "ma_20");
        assert!((ma_5[0] - 118.0).abs() < 1e-9);
        assert!((ma_20[0] - 110.5).abs() < 1e-9);
        assert!(ma_5[1] > 200.0 && ma_20[1] > 200.0);
    }

    #[test]
    fn test_stock_zero_open_keeps_infinite_return_drops_nan() {
        let mut csv = String::from("trade_date,symbol,open_price,close_price\n");
        for day in 1..=19 {
            csv.push_str(&format!("2024-01-{day:02},A,10,11\n"));
        }
        csv.push_str("2024-01-20,A,0,5\n2024-01-21,A,0,0\n");

        let cleaned = Dataset::StockPrices
            .clean(frame("stock_prices", &csv))
            .unwrap();
        assert_eq!(text(&cleaned.table, "trade_date"), vec!["2024-01-20"]);
        assert_eq!(floats(&cleaned.table, "daily_return"), vec![f64::INFINITY]);
        assert_eq!(cleaned.stats.undefined_dropped, 20);
    }

    #[test]
    fn test_stock_non_numeric_price_is_schema_error() {
        let input = frame(
            "stock_prices",
            "trade_date,symbol,open_price,close_price\n2024-01-01,A,ten,5\n",
        );
        let err = Dataset::StockPrices.clean(input).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaOrParse { .. }));
        assert!(err.to_string().contains("open_price"));
    }

    #[test]
    fn test_file_names() {
        assert_eq!(Dataset::StockPrices.input_file(), "stock_prices.csv");
        assert_eq!(
            Dataset::PortfolioTransactions.output_file(),
            "portfolio_transactions_clean.csv"
        );
    }
}
