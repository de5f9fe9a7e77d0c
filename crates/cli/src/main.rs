// ABOUTME: Process entry point for the bullion price scraper.
// ABOUTME: Loads configuration, installs tracing, then runs the scheduler, a single cycle or a probe.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use bullion_core::cycle::{run_cycle, sinks_from_config};
use bullion_core::{Config, Scraper};
use clap::{Parser, Subcommand};
use tokio::time::MissedTickBehavior;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Periodically scrape gold and silver prices into CSV and JSON histories.
#[derive(Parser, Debug)]
#[command(name = "bullion")]
#[command(about = "Scrape precious-metal prices on a schedule", long_about = None)]
struct Cli {
    /// JSON config file. Built-in defaults are used when absent.
    #[arg(long, env = "BULLION_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Override the CSV history path.
    #[arg(long, global = true)]
    csv: Option<PathBuf>,

    /// Override the JSON history path.
    #[arg(long, global = true)]
    json: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a cycle now and then every `interval_secs` until interrupted.
    Run,
    /// Run a single cycle and print the record.
    Once {
        /// Output compact JSON instead of pretty.
        #[arg(long, default_value_t = false)]
        compact: bool,
    },
    /// Report status, content type and size for every source without extracting.
    Probe,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("bullion=info,bullion_core=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    };
    if let Some(path) = &cli.csv {
        config.output.csv = Some(path.clone());
    }
    if let Some(path) = &cli.json {
        config.output.json = Some(path.clone());
    }
    config.validate()?;
    Ok(config)
}

async fn run_forever(scraper: &Scraper) {
    let config = scraper.config();
    let sinks = sinks_from_config(&config.output);
    info!(
        sources = config.sources.len(),
        interval_secs = config.interval_secs,
        max_attempts = config.max_attempts,
        "bullion scheduler started"
    );

    let mut ticker = tokio::time::interval(config.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_cycle(scraper, &sinks).await;
                let next = chrono::Local::now()
                    + chrono::Duration::seconds(config.interval_secs as i64);
                info!(next = %next.format("%Y-%m-%d %H:%M:%S"), "waiting for next cycle");
            }
            _ = &mut shutdown => {
                info!("interrupt received, stopping");
                break;
            }
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(&cli).context("loading configuration")?;
    let scraper = Scraper::new(config)?;

    match cli.command {
        Command::Run => {
            run_forever(&scraper).await;
            Ok(ExitCode::SUCCESS)
        }
        Command::Once { compact } => {
            let sinks = sinks_from_config(&scraper.config().output);
            let report = run_cycle(&scraper, &sinks).await;
            let json = if compact {
                serde_json::to_string(&report.record)?
            } else {
                serde_json::to_string_pretty(&report.record)?
            };
            println!("{}", json);
            Ok(ExitCode::SUCCESS)
        }
        Command::Probe => {
            let reports = scraper.probe().await;
            for report in &reports {
                println!("{}", report);
            }
            if reports.iter().any(|r| r.is_ok()) {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(1))
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            error!(error = %format!("{:#}", err), "bullion failed");
            eprintln!("error: {:#}", err);
            ExitCode::from(2)
        }
    }
}
