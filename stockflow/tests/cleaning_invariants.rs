//! Properties of the cleaned tables written to the processed area.

use pretty_assertions::assert_eq;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use stockflow::config::SilverConfig;
use stockflow::silver::{CleaningPipeline, Dataset, NULL_TOKENS};
use stockflow::testing::DataLayout;
use tempfile::TempDir;

struct Output {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Output {
    fn read(path: &Path) -> Self {
        let mut reader = csv::Reader::from_path(path).unwrap();
        let headers = reader.headers().unwrap().iter().map(String::from).collect();
        let rows = reader
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect();
        Self { headers, rows }
    }

    fn col(&self, name: &str) -> usize {
        self.headers.iter().position(|h| h == name).unwrap()
    }

    fn floats(&self, name: &str) -> Vec<f64> {
        let idx = self.col(name);
        self.rows.iter().map(|r| r[idx].parse().unwrap()).collect()
    }
}

async fn clean(layout: &DataLayout) {
    CleaningPipeline::new(
        layout.landing_dir(),
        layout.processed_dir(),
        SilverConfig::default(),
    )
    .run()
    .await
    .unwrap();
}

fn output(layout: &DataLayout, dataset: Dataset) -> Output {
    Output::read(&layout.processed_dir().join(dataset.output_file()))
}

#[tokio::test]
async fn outputs_have_no_nulls_and_no_duplicates() {
    let dir = TempDir::new().unwrap();
    let layout = DataLayout::new(dir.path());
    layout.write_landing_defaults();
    layout.write_landing(
        "investor_master.csv",
        "investor_id,name,risk_profile\n1,A,High\n1,A,High\n2,NULL,Low\n3,C,NaN\n4,D,Low\n4,D,Low\n",
    );
    clean(&layout).await;

    for dataset in Dataset::ALL {
        let out = output(&layout, dataset);
        let mut seen = HashSet::new();
        for row in &out.rows {
            assert!(
                row.iter().all(|c| !NULL_TOKENS.contains(&c.as_str())),
                "{dataset}: null cell in {row:?}"
            );
            assert!(seen.insert(row.clone()), "{dataset}: duplicate row {row:?}");
        }
    }
    assert_eq!(output(&layout, Dataset::InvestorMaster).rows.len(), 2);
}

#[tokio::test]
async fn single_duplicated_high_investor_yields_one_row() {
    let dir = TempDir::new().unwrap();
    let layout = DataLayout::new(dir.path());
    layout.write_landing_defaults();
    layout.write_landing("investor_master.csv", "id,risk_profile\n1,High\n1,High\n");
    clean(&layout).await;

    let out = output(&layout, Dataset::InvestorMaster);
    assert_eq!(out.headers, vec!["id", "risk_profile", "risk_category"]);
    assert_eq!(out.rows, vec![vec!["1", "High", "High Risk"]]);
}

#[tokio::test]
async fn numerically_equal_transactions_collapse() {
    let dir = TempDir::new().unwrap();
    let layout = DataLayout::new(dir.path());
    layout.write_landing_defaults();
    layout.write_landing(
        "portfolio_transactions.csv",
        "txn_id,trade_date,amount\n1,2024-01-02,10\n1,2024-01-02,10.0\n2,2024-01-03,7.5\n",
    );
    clean(&layout).await;

    let out = output(&layout, Dataset::PortfolioTransactions);
    assert_eq!(out.rows.len(), 2);
    assert_eq!(out.floats("amount"), vec![10.0, 7.5]);
}

#[tokio::test]
async fn short_rows_are_dropped_by_the_null_rule() {
    let dir = TempDir::new().unwrap();
    let layout = DataLayout::new(dir.path());
    layout.write_landing_defaults();
    layout.write_landing(
        "investor_master.csv",
        "investor_id,risk_profile\n1,High\n2\n3,Low\n",
    );
    clean(&layout).await;

    let out = output(&layout, Dataset::InvestorMaster);
    assert_eq!(
        out.rows,
        vec![vec!["1", "High", "High Risk"], vec!["3", "Low", "Low Risk"]]
    );
}

#[tokio::test]
async fn risk_category_follows_profile() {
    let dir = TempDir::new().unwrap();
    let layout = DataLayout::new(dir.path());
    layout.write_landing_defaults();
    layout.write_landing(
        "investor_master.csv",
        "id,risk_profile\n1,High\n2,Low\n3,Medium\n4,high\n5,HIGH\n",
    );
    clean(&layout).await;

    let out = output(&layout, Dataset::InvestorMaster);
    let profile = out.col("risk_profile");
    let category = out.col("risk_category");
    assert_eq!(out.rows.len(), 5);
    for row in &out.rows {
        let expected = if row[profile] == "High" { "High Risk" } else { "Low Risk" };
        assert_eq!(row[category], expected);
    }
}

#[tokio::test]
async fn daily_return_matches_prices() {
    let dir = TempDir::new().unwrap();
    let layout = DataLayout::new(dir.path());
    layout.write_landing_defaults();
    clean(&layout).await;

    let out = output(&layout, Dataset::StockPrices);
    assert!(!out.rows.is_empty());
    let open = out.floats("open_price");
    let close = out.floats("close_price");
    let ret = out.floats("daily_return");
    for i in 0..out.rows.len() {
        let expected = (close[i] - open[i]) / open[i];
        assert!((ret[i] - expected).abs() < 1e-12, "row {i}: {} vs {expected}", ret[i]);
    }
}

#[tokio::test]
async fn rolling_means_stay_within_symbol() {
    let dir = TempDir::new().unwrap();
    let layout = DataLayout::new(dir.path());
    layout.write_landing_defaults();

    // A and B interleaved by date, A closes near 10, B near 1000.
    let mut csv = String::from("trade_date,symbol,open_price,close_price\n");
    for day in 1..=25 {
        csv.push_str(&format!("2024-02-{day:02},A,10,{}\n", 10 + day));
        csv.push_str(&format!("2024-02-{day:02},B,1000,{}\n", 1000 + day));
    }
    layout.write_landing("stock_prices.csv", &csv);
    clean(&layout).await;

    let out = output(&layout, Dataset::StockPrices);
    let symbol = out.col("symbol");
    let ma_5 = out.floats("ma_5");
    let ma_20 = out.floats("ma_20");

    let mut per_symbol: HashMap<&str, usize> = HashMap::new();
    for (i, row) in out.rows.iter().enumerate() {
        *per_symbol.entry(row[symbol].as_str()).or_default() += 1;
        if row[symbol] == "A" {
            assert!(ma_5[i] < 100.0 && ma_20[i] < 100.0);
        } else {
            assert!(ma_5[i] > 900.0 && ma_20[i] > 900.0);
        }
    }
    // 25 rows per symbol; the first 19 of each lack a 20-row history.
    assert_eq!(per_symbol["A"], 6);
    assert_eq!(per_symbol["B"], 6);

    // A's first surviving row is day 20: ma_5 over days 16..=20.
    let first_a = out.rows.iter().position(|r| r[symbol] == "A").unwrap();
    assert_eq!(out.rows[first_a][out.col("trade_date")], "2024-02-20");
    assert!((ma_5[first_a] - 28.0).abs() < 1e-9);
    assert!((ma_20[first_a] - 20.5).abs() < 1e-9);
}

#[tokio::test]
async fn unparseable_trade_dates_are_dropped_not_fatal() {
    let dir = TempDir::new().unwrap();
    let layout = DataLayout::new(dir.path());
    layout.write_landing_defaults();
    clean(&layout).await;

    let out = output(&layout, Dataset::PortfolioTransactions);
    let ids: Vec<_> = out.rows.iter().map(|r| r[out.col("txn_id")].as_str()).collect();
    assert_eq!(ids, vec!["101", "102", "104"]);
}

#[tokio::test]
async fn rerun_overwrites_with_identical_output() {
    let dir = TempDir::new().unwrap();
    let layout = DataLayout::new(dir.path());
    layout.write_landing_defaults();

    clean(&layout).await;
    let first: Vec<_> = Dataset::ALL
        .iter()
        .map(|d| layout.read_processed(&d.output_file()))
        .collect();
    clean(&layout).await;
    let second: Vec<_> = Dataset::ALL
        .iter()
        .map(|d| layout.read_processed(&d.output_file()))
        .collect();
    assert_eq!(first, second);
}
