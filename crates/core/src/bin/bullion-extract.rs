// ABOUTME: CLI binary for offline price extraction from a saved page or script payload.
// ABOUTME: Runs the markup or embedded extractor on a local file and prints the record as JSON.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use bullion_core::{Config, Scraper};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "bullion-extract")]
#[command(about = "Extract metal prices from a saved HTML page or script payload")]
struct Args {
    /// HTML file to run the markup extractor on
    #[arg(long = "html", conflicts_with = "embedded", required_unless_present = "embedded")]
    html: Option<PathBuf>,

    /// Script file with `identifier = [...];` arrays
    #[arg(long = "embedded")]
    embedded: Option<PathBuf>,

    /// JSON config supplying ranges, markers, mapping and synonyms
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Source tag written into the record
    #[arg(long = "source", default_value = "local-file")]
    source: String,

    /// Print compact JSON instead of pretty-printed
    #[arg(long = "compact")]
    compact: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match Config::from_path(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::from(2);
            }
        },
        None => Config::default(),
    };
    let scraper = match Scraper::new(config) {
        Ok(scraper) => scraper,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(2);
        }
    };

    let (path, embedded) = match (&args.html, &args.embedded) {
        (Some(path), _) => (path, false),
        (None, Some(path)) => (path, true),
        (None, None) => {
            eprintln!("error: one of --html or --embedded is required");
            return ExitCode::from(2);
        }
    };
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("error reading file {:?}: {}", path, e);
            return ExitCode::from(1);
        }
    };

    let record = if embedded {
        match scraper.extract_embedded(&content, &args.source) {
            Ok(record) => record,
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::from(1);
            }
        }
    } else {
        scraper.extract_markup(&content, &args.source)
    };

    let output = if args.compact {
        serde_json::to_string(&record)
    } else {
        serde_json::to_string_pretty(&record)
    };
    match output {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("error serializing record: {}", e);
            return ExitCode::from(1);
        }
    }

    if record.is_complete() {
        ExitCode::SUCCESS
    } else {
        eprintln!("warning: primary price not found");
        ExitCode::from(3)
    }
}
