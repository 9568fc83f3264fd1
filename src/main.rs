//! CLI entry point for the Aadhaar insights pipeline.
//!
//! Provides subcommands for profiling a raw extract, cleaning one dataset and
//! running the full analysis over all three datasets.

use aadhaar_insights::analyzers::analyzer::run_analysis;
use aadhaar_insights::analyzers::types::Granularity;
use aadhaar_insights::cleaning::clean;
use aadhaar_insights::cleaning::types::{DatasetKind, RawDataset};
use aadhaar_insights::config::{AnalysisConfig, MethodKind};
use aadhaar_insights::{
    loader::load_dataset,
    output::{print_json, print_pretty, write_clean_dataset, write_report},
    stats::quality_report,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "aadhaar_insights")]
#[command(about = "Clean and analyze Aadhaar enrolment and update extracts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a data quality report for a raw extract
    Quality {
        /// Dataset kind of the extract
        #[arg(short, long, value_enum)]
        kind: DatasetKind,

        /// CSV file or directory of CSV parts
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },
    /// Clean one extract and write it as CSV
    Clean {
        /// Dataset kind of the extract
        #[arg(short, long, value_enum)]
        kind: DatasetKind,

        /// CSV file or directory of CSV parts
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// CSV file to write the cleaned table to
        #[arg(short, long)]
        output: PathBuf,

        /// Optional TOML config supplying the state alias table
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Run the full analysis over all three datasets
    Analyze {
        /// Enrolment CSV file or directory
        #[arg(long)]
        enrolment: PathBuf,

        /// Demographic update CSV file or directory
        #[arg(long)]
        demographic: PathBuf,

        /// Biometric update CSV file or directory
        #[arg(long)]
        biometric: PathBuf,

        /// Optional TOML config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory to write tables and summary.json to
        #[arg(short = 'd', long, default_value = "outputs")]
        output_dir: PathBuf,

        /// Time bucket width for trends
        #[arg(long, value_enum)]
        granularity: Option<Granularity>,

        /// Anomaly detection method
        #[arg(long, value_enum)]
        method: Option<MethodKind>,

        /// IQR fence multiplier
        #[arg(long)]
        iqr_multiplier: Option<f64>,

        /// Absolute z-score above which a bucket is flagged
        #[arg(long)]
        zscore_threshold: Option<f64>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/aadhaar_insights.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("aadhaar_insights.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Quality { kind, input } => {
            let raw = load(kind, &input)?;
            let report = quality_report(&raw);
            print_pretty(&report);
            info!(
                rows = report.total_rows,
                columns = report.total_columns,
                missing_cells = report.missing_cells(),
                duplicates = report.duplicates,
                "Quality report"
            );
            print_json(&report)?;
        }
        Commands::Clean {
            kind,
            input,
            output,
            config,
        } => {
            let config = AnalysisConfig::load(config.as_deref())
                .context("Failed to load config file")?;
            let raw = load(kind, &input)?;
            let result = clean(&raw, &config.state_aliases)
                .with_context(|| format!("Failed to clean {kind} dataset"))?;

            write_clean_dataset(&output, &result.dataset)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!(
                raw_rows = result.raw_rows,
                kept = result.dataset.len(),
                discarded = result.discarded(),
                output = %output.display(),
                "Clean finished"
            );
            print_json(&result.discards)?;
        }
        Commands::Analyze {
            enrolment,
            demographic,
            biometric,
            config,
            output_dir,
            granularity,
            method,
            iqr_multiplier,
            zscore_threshold,
        } => {
            let mut config = AnalysisConfig::load(config.as_deref())
                .context("Failed to load config file")?;
            if let Some(granularity) = granularity {
                config.granularity = granularity;
            }
            if let Some(method) = method {
                config.method = method;
            }
            if let Some(multiplier) = iqr_multiplier {
                config.iqr_multiplier = multiplier;
            }
            if let Some(threshold) = zscore_threshold {
                config.zscore_threshold = threshold;
            }

            let enrolment = load(DatasetKind::Enrolment, &enrolment)?;
            let demographic = load(DatasetKind::Demographic, &demographic)?;
            let biometric = load(DatasetKind::Biometric, &biometric)?;

            let report = run_analysis(&enrolment, &demographic, &biometric, &config)
                .context("Analysis failed")?;
            write_report(&output_dir, &report)
                .with_context(|| format!("Failed to write report to {}", output_dir.display()))?;

            print_json(&report.summary())?;
        }
    }

    Ok(())
}

/// Loads one extract, naming the path on failure.
fn load(kind: DatasetKind, path: &Path) -> Result<RawDataset> {
    load_dataset(kind, path)
        .with_context(|| format!("Failed to load {kind} data from {}", path.display()))
}
