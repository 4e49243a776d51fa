use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;

use nba_medallion::config::MedallionConfig;
use nba_medallion::logging;
use nba_medallion::routing::{parse_key, Dispatcher, DryRunJob, S3Event, Season};

#[derive(Parser)]
#[command(
    name = "medallion",
    version,
    about = "Storage event routing and API throttling for NBA stats pipelines"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify object keys
    ParseKey {
        /// Object keys as they appear in storage
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Print the season label for a date
    Season {
        /// Date in YYYY-MM-DD form
        date: NaiveDate,
    },
    /// Dispatch an S3 notification batch to a dry-run job
    Route {
        /// Notification JSON file, or `-` for stdin
        input: PathBuf,
    },
    /// Print the effective configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = MedallionConfig::load(cli.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.json_logs {
        config.logging.json = true;
    }

    logging::init(&config.logging);

    match cli.command {
        Commands::ParseKey { keys } => {
            for key in keys {
                let output = match parse_key(&key) {
                    Some(descriptor) => serde_json::to_string(&descriptor)?,
                    None => serde_json::json!({ "original_key": key, "recognized": false })
                        .to_string(),
                };
                println!("{output}");
            }
            Ok(())
        }
        Commands::Season { date } => {
            println!("{}", Season::for_date(date));
            Ok(())
        }
        Commands::Route { input } => route(&input, &config).await,
        Commands::ShowConfig => {
            print!("{}", config.to_yaml()?);
            Ok(())
        }
    }
}

async fn route(input: &Path, config: &MedallionConfig) -> anyhow::Result<()> {
    let payload = if input.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read notification from stdin")?;
        buf
    } else {
        tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("failed to read {}", input.display()))?
    };

    let event = S3Event::from_json(&payload)?;
    info!(records = event.records.len(), "Notification batch loaded");

    let dispatcher = Dispatcher::new(DryRunJob, config.routing.clone());
    let report = dispatcher.dispatch(&event).await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.is_success() {
        anyhow::bail!("{report}");
    }
    Ok(())
}
