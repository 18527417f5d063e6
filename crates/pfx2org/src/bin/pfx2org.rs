//! Command-line front end for the pfx2org lookup service
//!
//! Thin caller of the query interface: loads the table once, runs a single
//! query, prints matching records as JSON lines on stdout. Status and
//! diagnostics go to stderr so output stays pipeable.

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use pfx2org::LookupService;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "pfx2org",
    version,
    about = "Resolve IP prefixes and organization names against a prefix-to-organization table"
)]
struct Cli {
    /// Path to the Parquet prefix-to-organization table
    #[arg(long)]
    data: PathBuf,

    /// Optional JSON side table of organization name -> tags
    #[arg(long)]
    org_sizes: Option<PathBuf>,

    /// Owner column name in the source table
    #[arg(long)]
    owner_column: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a prefix (CIDR or bare address) to its covering table entry
    Prefix {
        /// Query, e.g. 216.1.81.0/24 or 216.1.81.5
        query: String,
    },
    /// Case-insensitive substring search over organization owners
    Org {
        /// Name fragment, e.g. "corp"
        fragment: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut opener = LookupService::from(&cli.data);
    if let Some(column) = &cli.owner_column {
        opener = opener.owner_column(column);
    }
    if let Some(path) = &cli.org_sizes {
        opener = opener.org_sizes(path);
    }
    let service = opener
        .load()
        .with_context(|| format!("failed to load {}", cli.data.display()))?;

    match cli.command {
        Command::Prefix { query } => {
            let entry = service
                .search_by_prefix(&query)
                .context("invalid IP prefix format")?;
            match entry {
                Some(entry) => {
                    eprintln!("{} record(s) under {}", entry.len(), entry.prefix());
                    for record in entry.records() {
                        println!("{}", serde_json::to_string(record.as_ref())?);
                    }
                }
                None => eprintln!("no matching prefix found"),
            }
        }
        Command::Org { fragment } => {
            if let Some(tags) = service.organization_info(&fragment) {
                eprintln!("tags: {}", tags);
            }
            let matches = service.search_by_organization(&fragment);
            if matches.is_empty() {
                eprintln!("no matching organizations found");
            } else {
                eprintln!("found {} result(s)", matches.len());
                for record in &matches {
                    println!("{}", serde_json::to_string(record.as_ref())?);
                }
            }
        }
    }

    Ok(())
}

fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
