//! CLI entry point for the revenue forecast.

use anyhow::{Result, anyhow};
use clap::Parser;
use revenue_forecast::{ForecastConfig, ForecastPipeline, ForecastReport, GroupType};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Linear revenue forecast with BI-ready CSV exports",
    long_about = "Fits a linear regression of revenue on sales features and writes\n\
                  predictions, coefficients and a performance summary as CSV.\n\n\
                  EXAMPLES:\n  \
                  # Run with the default dataset and output locations\n  \
                  revenue-forecast\n\n  \
                  # Custom input and output directory\n  \
                  revenue-forecast -i sales.csv -o exports/\n\n  \
                  # Machine-readable run report\n  \
                  revenue-forecast --json | jq .mae"
)]
struct Args {
    /// Path to the sales CSV
    ///
    /// Defaults to data/raw/sales_forecasting_dataset.csv
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Directory for the output CSV files
    ///
    /// Defaults to data/processed
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// JSON configuration file; command-line flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fraction of rows held out for evaluation (0.0 - 1.0, exclusive)
    #[arg(long)]
    test_ratio: Option<f64>,

    /// Seed for the train/test shuffle
    #[arg(long)]
    seed: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all logs; only the final run report is written.
    #[arg(long)]
    json: bool,

    /// Also write forecast_report.json to the output directory
    #[arg(short = 'r', long)]
    emit_report: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    let config = build_config(&args)?;

    let mut builder = ForecastPipeline::builder().config(config);
    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }
    let pipeline = builder.build()?;

    match pipeline.run() {
        Ok(report) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_summary(&report);
            }
            Ok(())
        }
        Err(e) => {
            if args.json {
                println!("{}", serde_json::json!({ "error": e }));
            } else {
                error!("Forecast failed: {}", e);
            }
            Err(anyhow!("Forecast failed: {}", e))
        }
    }
}

/// Start from the config file (or defaults) and apply command-line overrides.
fn build_config(args: &Args) -> Result<ForecastConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            ForecastConfig::from_json_file(path)?
        }
        None => ForecastConfig::default(),
    };

    if let Some(input) = &args.input {
        config.input_path = input.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(ratio) = args.test_ratio {
        config.test_ratio = ratio;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if args.emit_report {
        config.emit_report = true;
    }

    config.validate()?;
    Ok(config)
}

/// Human-readable run summary. Uses `println!` so it shows regardless of
/// log level.
fn print_summary(report: &ForecastReport) {
    println!();
    println!("Model trained");
    println!(
        "  Rows: {} ({} train / {} test)",
        report.total_rows, report.train_rows, report.test_rows
    );
    println!("  MAE: {:.2}", report.mae);
    println!("  R² Score: {:.2}", report.r2_score);
    println!();

    let groups: Vec<_> = report
        .metrics
        .iter()
        .filter(|m| m.group_type != GroupType::Global)
        .collect();
    if !groups.is_empty() {
        println!(
            "{:<18} {:<20} {:>8} {:>14} {:>10}",
            "Group", "Value", "Rows", "MAE", "R²"
        );
        println!("{}", "-".repeat(74));
        for m in groups {
            println!(
                "{:<18} {:<20} {:>8} {:>14.2} {:>10.2}",
                m.group_type.as_str(),
                m.group_value,
                m.row_count,
                m.mae,
                m.r2_score
            );
        }
        println!();
    }

    for warning in &report.warnings {
        println!("Warning: {}", warning);
    }

    println!("Predictions saved: {}", report.outputs.predictions.display());
    println!("Coefficients saved: {}", report.outputs.coefficients.display());
    println!("Summary saved: {}", report.outputs.metrics.display());
    println!("Duration: {}ms", report.duration_ms);
}
