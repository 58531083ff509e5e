//! Stockflow CLI: run the pipeline or any single stage.
//!
//! Commands:
//! - `run`: the full chain (gate, bronze, silver, gold, watermark commit)
//! - `check`: report the gate decision without running anything
//! - `bronze`: copy raw files into the landing area
//! - `silver`: clean the landing tables into the processed area
//! - `watermark show | set | clear`: inspect or edit the watermark

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use stockflow::bronze::LandingCopier;
use stockflow::config::{GateMode, LogFormat, PipelineConfig};
use stockflow::detect::ChangeDetector;
use stockflow::events::LoggingEventSink;
use stockflow::observability::logging;
use stockflow::pipeline::{Orchestrator, RunRecord};
use stockflow::silver::CleaningPipeline;
use stockflow::state::{JsonFileStateStore, StateStore, Watermark};
use stockflow::utils::unix_seconds_to_timestamp;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "stockflow",
    version,
    about = "Incremental bronze/silver/gold stock analytics pipeline"
)]
struct Cli {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Data root; overrides the config file and STOCKFLOW_HOME.
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Console log format.
    #[arg(long, global = true, value_enum)]
    log_format: Option<FormatArg>,

    /// Print results as JSON on stdout.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Pretty,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline once.
    Run {
        /// Skip the run when the gate finds no new data.
        #[arg(long, default_value_t = false)]
        authoritative: bool,

        /// Clean the three tables concurrently.
        #[arg(long, default_value_t = false)]
        parallel: bool,
    },
    /// Report whether the raw location has data newer than the watermark.
    Check,
    /// Copy raw files into the landing area.
    Bronze,
    /// Clean landing tables into the processed area.
    Silver {
        /// Clean the three tables concurrently.
        #[arg(long, default_value_t = false)]
        parallel: bool,
    },
    /// Inspect or edit the watermark.
    Watermark {
        #[command(subcommand)]
        action: WatermarkAction,
    },
}

#[derive(Subcommand)]
enum WatermarkAction {
    /// Print the current watermark.
    Show,
    /// Set the watermark to the given Unix seconds.
    Set {
        /// Unix seconds, fractional allowed.
        seconds: f64,
    },
    /// Remove the watermark so the next run treats all data as new.
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::from_env(),
    };
    if let Some(base_dir) = &cli.base_dir {
        config = config.with_base_dir(base_dir);
    }
    if let Some(format) = cli.log_format {
        config.logging.format = match format {
            FormatArg::Pretty => LogFormat::Pretty,
            FormatArg::Json => LogFormat::Json,
        };
    }
    config.validate()?;

    let _guard = logging::init(&config.logging, config.paths.log_dir.as_deref())?;

    match cli.command {
        Commands::Run {
            authoritative,
            parallel,
        } => {
            if authoritative {
                config = config.with_gate_mode(GateMode::Authoritative);
            }
            if parallel {
                config = config.with_parallel_cleaning(true);
            }
            run_pipeline(config, cli.json).await
        }
        Commands::Check => run_check(&config, cli.json),
        Commands::Bronze => run_bronze(&config, cli.json),
        Commands::Silver { parallel } => {
            if parallel {
                config = config.with_parallel_cleaning(true);
            }
            run_silver(&config, cli.json).await
        }
        Commands::Watermark { action } => run_watermark(&config, &action, cli.json),
    }
}

fn state_store(config: &PipelineConfig) -> Arc<dyn StateStore> {
    Arc::new(JsonFileStateStore::new(config.state_file()))
}

fn watermark(config: &PipelineConfig) -> Watermark {
    Watermark::new(state_store(config), config.watermark.key.clone())
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_record(record: &RunRecord, json: bool) -> Result<()> {
    if json {
        return print_json(record);
    }
    println!("run {} ended in state {}", record.run_id, record.state);
    for stage in &record.stages {
        match &stage.error {
            Some(error) => println!("  {:<16} {:<5} {error}", stage.name, stage.status.to_string()),
            None => println!(
                "  {:<16} {:<5} {:.0} ms",
                stage.name,
                stage.status.to_string(),
                stage.duration_ms()
            ),
        }
    }
    Ok(())
}

async fn run_pipeline(config: PipelineConfig, json: bool) -> Result<()> {
    let store = state_store(&config);
    let orchestrator = Orchestrator::from_config(config, store)?
        .with_event_sink(Arc::new(LoggingEventSink::debug()));

    match orchestrator.run().await {
        Ok(record) => print_record(&record, json),
        Err(failed) => {
            print_record(&failed.record, json)?;
            Err(failed.into())
        }
    }
}

fn run_check(config: &PipelineConfig, json: bool) -> Result<()> {
    let observed = watermark(config).read()?;
    let decision = ChangeDetector::new(config.raw_dir(), config.extension.clone()).check(observed)?;
    if json {
        return print_json(&decision);
    }
    println!(
        "should_run={} files={} ({})",
        decision.should_run,
        decision.file_count,
        decision.reason()
    );
    Ok(())
}

fn run_bronze(config: &PipelineConfig, json: bool) -> Result<()> {
    let report = LandingCopier::new(
        config.raw_dir(),
        config.landing_dir(),
        config.extension.clone(),
    )
    .copy_all()?;
    if json {
        return print_json(&report);
    }
    println!(
        "copied {} files ({} bytes) to {}",
        report.count(),
        report.total_bytes(),
        config.landing_dir().display()
    );
    Ok(())
}

async fn run_silver(config: &PipelineConfig, json: bool) -> Result<()> {
    let report = CleaningPipeline::new(
        config.landing_dir(),
        config.processed_dir(),
        config.silver.clone(),
    )
    .run()
    .await?;
    if json {
        return print_json(&report);
    }
    for table in &report.tables {
        println!(
            "{:<24} {:>7} -> {:<7} {}",
            table.dataset.name(),
            table.stats.rows_in,
            table.stats.rows_out,
            table.output.display()
        );
    }
    Ok(())
}

fn run_watermark(config: &PipelineConfig, action: &WatermarkAction, json: bool) -> Result<()> {
    let watermark = watermark(config);
    match action {
        WatermarkAction::Show => {
            let value = watermark.read()?;
            if json {
                return print_json(&serde_json::json!({
                    "key": watermark.key(),
                    "watermark": value,
                }));
            }
            match value {
                Some(secs) => {
                    let when = unix_seconds_to_timestamp(secs)
                        .map_or_else(|| "out of range".to_string(), |t| t.to_rfc3339());
                    println!("{} = {secs} ({when})", watermark.key());
                }
                None => println!("{} is unset", watermark.key()),
            }
        }
        WatermarkAction::Set { seconds } => {
            if !seconds.is_finite() || *seconds < 0.0 {
                bail!("watermark must be a non-negative number of seconds, got {seconds}");
            }
            watermark.set(*seconds)?;
            info!(key = %watermark.key(), watermark = seconds, "Watermark set");
        }
        WatermarkAction::Clear => {
            watermark.clear()?;
            info!(key = %watermark.key(), "Watermark cleared");
        }
    }
    Ok(())
}
