//! weatherstore CLI
//!
//! Loads the sources listed in the manifest, then runs one report:
//! - Show every observation
//! - Structure info
//! - Wind, temperature and correlation summaries
//! - Monthly stats file
//!
//! # Configuration
//!
//! Settings come from `--config`, `~/.config/weatherstore/config.toml` or
//! `./weatherstore.toml`, with `WEATHERSTORE_*` environment overrides.
//! `RUST_LOG` takes precedence over the configured log level.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use weatherstore::config::{generate_default_config, Config, LoggingConfig};
use weatherstore::{report, IngestPipeline, Pairing, RecordCollection};

#[derive(Parser)]
#[command(name = "weatherstore")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Weather observation store and monthly statistics")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Manifest listing the source files to load
    #[arg(short, long, global = true)]
    pub manifest: Option<PathBuf>,

    /// Shuffle seed for a reproducible insertion order
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print every observation in chronological order
    Show,

    /// Show record count, tree height and per-month counts
    Info,

    /// Average wind speed and sample stdev for one month
    Wind {
        #[arg(short, long)]
        year: i32,
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,
    },

    /// Monthly average temperature and stdev for a year
    Temps {
        #[arg(short, long)]
        year: i32,
    },

    /// Pearson correlations S_T, S_R and T_R for one month
    Correlate {
        /// Year (0 = all years)
        #[arg(short, long)]
        year: i32,
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,
    },

    /// Write the monthly stats file for a year
    Report {
        #[arg(short, long)]
        year: i32,
        /// Output path (default: <report_dir>/MonthlyStats_<year>.txt)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        let content = generate_default_config();
        match output {
            Some(path) => {
                std::fs::write(path, content)
                    .with_context(|| format!("Failed to write config to {:?}", path))?;
                println!("Config written to {:?}", path);
            }
            None => print!("{}", content),
        }
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(manifest) = &cli.manifest {
        config.data.manifest = manifest.display().to_string();
    }
    if let Some(seed) = cli.seed {
        config.ingest.shuffle_seed = Some(seed);
    }

    init_tracing(&config.logging);
    tracing::debug!("weatherstore v{}", env!("CARGO_PKG_VERSION"));

    let pipeline = IngestPipeline::from_config(&config)?;
    let manifest = config.data.manifest_path();
    let mut collection = RecordCollection::new();
    let load = pipeline
        .load(&manifest, &mut collection)
        .with_context(|| format!("Failed to load data from manifest {:?}", manifest))?;

    let json = cli.format == OutputFormat::Json;

    match cli.command {
        Commands::Show => {
            if json {
                let all: Vec<_> = collection.iter().collect();
                println!("{}", serde_json::to_string_pretty(&all)?);
            } else {
                for line in collection.display_all() {
                    println!("{}", line);
                }
            }
        }

        Commands::Info => {
            let info = report::structure_info(&collection);
            if json {
                let body = serde_json::json!({ "load": load, "structure": info });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                println!("Load:          {}", load);
                if let Some(seed) = load.seed {
                    println!("Shuffle seed:  {}", seed);
                }
                print!("{}", info);
            }
        }

        Commands::Wind { year, month } => {
            let summary = report::wind_summary(&collection, year, month)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{}", summary);
            }
        }

        Commands::Temps { year } => {
            let temps = report::monthly_temperatures(&collection, year);
            if json {
                println!("{}", serde_json::to_string_pretty(&temps)?);
            } else {
                println!("{}", year);
                for month in &temps {
                    println!("{}", month);
                }
            }
        }

        Commands::Correlate { year, month } => {
            let results: Vec<(Pairing, f64)> = Pairing::ALL
                .into_iter()
                .map(|p| (p, report::correlation(&collection, year, month, p)))
                .collect();

            if json {
                let body: serde_json::Map<String, serde_json::Value> = results
                    .iter()
                    .map(|(p, r)| (p.label().to_string(), serde_json::json!(r)))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                let scope = if year == 0 {
                    format!("month {} (all years)", month)
                } else {
                    format!("{}/{}", month, year)
                };
                println!("Sample Pearson correlation, {}", scope);
                for (pairing, r) in &results {
                    println!("  {}: {:.2}", pairing, r);
                }
            }
        }

        Commands::Report { year, output } => {
            let path = output.unwrap_or_else(|| config.data.report_path(year));
            let rows = report::write_monthly_stats(&collection, year, &path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print!("{}", report::render_monthly_stats(year, &rows));
                println!("Written to {:?}", path);
            }
        }

        Commands::Config { .. } => {}
    }

    Ok(())
}

/// Install the global subscriber; logs go to stderr so stdout stays parseable
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("weatherstore={}", logging.level)));

    let registry = tracing_subscriber::registry().with(filter);

    match logging.format.as_str() {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        _ => registry
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
            .init(),
    }
}
