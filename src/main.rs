//! CLI entry point for the trip-info statistics tool.
//!
//! Analyses one or more trip-info files (local or over HTTP): fills the
//! configured histograms, totals the delivery category, estimates its
//! operating cost, and writes a summary plus chart-ready JSON reports.

use std::ffi::OsStr;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use tripinfo_stats::{
    aggregation::{PrefixClassifier, run, run_sharded},
    config::PipelineConfig,
    fetch::load_source,
    output::{Report, SummaryRow, append_summary_record, write_report_json, write_summary},
    parser::{RecordFormat, parse_records},
};

#[derive(Parser)]
#[command(name = "tripinfo_stats")]
#[command(about = "Histograms and delivery cost estimates from simulated trip records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse one or more trip-info files or URLs, one report per source
    Analyze {
        /// Paths or URLs of trip-info files (csv, json or xml, optionally gzipped)
        #[arg(value_name = "FILE_OR_URL", required = true)]
        sources: Vec<String>,

        /// JSON pipeline configuration; defaults are used when omitted
        #[arg(short, long)]
        config: Option<String>,

        /// Record format, inferred from the file extension when omitted
        #[arg(short, long)]
        format: Option<String>,

        /// Identifier prefix of category members (overrides the config)
        #[arg(long)]
        prefix: Option<String>,

        /// Personnel cost per hour (overrides the config)
        #[arg(long)]
        labor_rate: Option<f64>,

        /// Fuel consumption in liters per 100 km (overrides the config)
        #[arg(long)]
        fuel_consumption: Option<f64>,

        /// Fuel price per liter (overrides the config)
        #[arg(long)]
        fuel_price: Option<f64>,

        /// Directory to write one JSON report per source into
        #[arg(short, long)]
        report_dir: Option<String>,

        /// CSV file to append one summary row per source to
        #[arg(short, long)]
        summary_csv: Option<String>,

        /// Split each source into this many shards aggregated in parallel
        #[arg(long, default_value_t = 1)]
        shards: usize,
    },
    /// Print the effective pipeline configuration as JSON
    PrintConfig {
        /// JSON pipeline configuration to load
        #[arg(short, long)]
        config: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/tripinfo_stats.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("tripinfo_stats.log"));

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
        Commands::Analyze {
            sources,
            config,
            format,
            prefix,
            labor_rate,
            fuel_consumption,
            fuel_price,
            report_dir,
            summary_csv,
            shards,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(prefix) = prefix {
                config.category.prefix = prefix;
            }
            if let Some(rate) = labor_rate {
                config.cost.labor_rate_per_hour = rate;
            }
            if let Some(consumption) = fuel_consumption {
                config.cost.fuel_liters_per_100 = consumption;
            }
            if let Some(price) = fuel_price {
                config.cost.fuel_price_per_liter = price;
            }
            let format = format.map(|f| f.parse::<RecordFormat>()).transpose()?;

            if let Some(dir) = &report_dir {
                std::fs::create_dir_all(dir)?;
            }

            let report_files = report_dir
                .as_deref()
                .map(|dir| report_paths(dir, &sources))
                .unwrap_or_default();

            for (index, source) in sources.iter().enumerate() {
                let report = analyze_source(source, &config, format, shards)
                    .await
                    .with_context(|| format!("failed to analyse {source}"))?;

                write_summary(&mut std::io::stdout().lock(), &report)?;

                if let Some(path) = report_files.get(index) {
                    let file = File::create(path)
                        .with_context(|| format!("failed to create {}", path.display()))?;
                    write_report_json(BufWriter::new(file), &report)?;
                    info!(path = %path.display(), "Report written");
                }

                if let Some(csv) = &summary_csv {
                    append_summary_record(csv, &SummaryRow::from(&report))?;
                }
            }

            info!(sources = sources.len(), "Finished analysing all sources");
        }
        Commands::PrintConfig { config } => {
            let config = load_config(config.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn load_config(path: Option<&str>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::load(path).with_context(|| format!("failed to load config {path}")),
        None => Ok(PipelineConfig::default()),
    }
}

/// Loads, decodes and aggregates one source.
#[tracing::instrument(skip(config, format), fields(category = %config.category.name))]
async fn analyze_source(
    source: &str,
    config: &PipelineConfig,
    format: Option<RecordFormat>,
    shards: usize,
) -> Result<Report> {
    let bytes = load_source(source).await?;
    let format = format.unwrap_or_else(|| RecordFormat::from_path(source));
    let records = parse_records(&bytes, format)?;

    let classifier = PrefixClassifier::new(config.category.prefix.clone());
    let result = if shards > 1 {
        run_sharded(&records, config, &classifier, shards)?
    } else {
        run(&records, config, &classifier)?
    };

    info!(
        records = result.all.count,
        members = result.category.count,
        others = result.non_category_count(),
        "Source aggregated"
    );

    Ok(Report::build(source, &result, &config.cost))
}

/// One `<dir>/<name>.json` per source, `name` being the source file name
/// without extensions. Sources sharing a name are prefixed with their parent
/// directory, and suffixed with their position if that still clashes.
fn report_paths(dir: &str, sources: &[String]) -> Vec<PathBuf> {
    let segments: Vec<Vec<&str>> = sources
        .iter()
        .map(|s| s.split('/').filter(|p| !p.is_empty() && *p != ".").collect())
        .collect();
    let stems: Vec<&str> = segments
        .iter()
        .map(|seg| {
            seg.last()
                .and_then(|name| name.split('.').next())
                .filter(|stem| !stem.is_empty())
                .unwrap_or("report")
        })
        .collect();

    let names: Vec<String> = stems
        .iter()
        .zip(&segments)
        .map(|(stem, seg)| {
            let shared = stems.iter().filter(|s| *s == stem).count() > 1;
            match seg.len().checked_sub(2).map(|i| seg[i]) {
                Some(parent) if shared => format!("{parent}_{stem}"),
                _ => stem.to_string(),
            }
        })
        .collect();

    names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            if names.iter().filter(|n| *n == name).count() > 1 {
                Path::new(dir).join(format!("{name}_{}.json", i + 1))
            } else {
                Path::new(dir).join(format!("{name}.json"))
            }
        })
        .collect()
}
