//! Benchmarks for the cleaning pass.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use polars::prelude::*;
use stockflow::silver::{grouped_rolling_mean, read_table, Dataset, LONG_WINDOW};
use stockflow::testing::fixtures::stock_prices_csv;
use std::fs;

fn rolling_mean_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("grouped_rolling_mean");
    for rows in [1_000usize, 10_000, 100_000] {
        let symbols: Vec<String> = (0..rows).map(|i| format!("S{}", i % 50)).collect();
        #[allow(clippy::cast_precision_loss)]
        let values: Vec<f64> = (0..rows).map(|i| 100.0 + (i % 97) as f64).collect();
        let df = df!("symbol" => symbols, "close_price" => values).expect("frame");
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, _| {
            b.iter(|| {
                black_box(&df)
                    .clone()
                    .lazy()
                    .select([grouped_rolling_mean("close_price", "symbol", LONG_WINDOW)])
                    .collect()
                    .expect("rolling mean")
            });
        });
    }
    group.finish();
}

fn stock_prices_benchmark(c: &mut Criterion) {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let path = dir.path().join("stock_prices.csv");
    let symbols = ["AAA", "BBB", "CCC", "DDD", "EEE", "FFF", "GGG", "HHH"];
    fs::write(&path, stock_prices_csv(&symbols, 500)).expect("write fixture");

    c.bench_function("clean_stock_prices_4000_rows", |b| {
        b.iter(|| {
            let df = read_table("stock_prices", &path).expect("read");
            black_box(Dataset::StockPrices.clean(df).expect("clean"))
        });
    });
}

criterion_group!(benches, rolling_mean_benchmark, stock_prices_benchmark);
criterion_main!(benches);
