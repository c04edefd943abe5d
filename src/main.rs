//! Polite-Gate main entry point
//!
//! This is the command-line interface for checking URLs against the gate and
//! for inspecting or resetting its visit ledger.

use anyhow::Context;
use clap::Parser;
use polite_gate::config::{load_config, Config};
use polite_gate::storage::open_store;
use polite_gate::PolitenessGate;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Polite-Gate: a robots.txt politeness gate
///
/// Checks whether each URL may be crawled under its host's robots.txt,
/// waiting out per-host cooldowns and remembering them across runs.
#[derive(Parser, Debug)]
#[command(name = "polite-gate")]
#[command(version = "1.0.0")]
#[command(about = "A robots.txt politeness gate", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// URLs to check, in order
    #[arg(value_name = "URL")]
    urls: Vec<String>,

    /// User agent to check robots.txt rules for (defaults to the configured crawler name)
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the gate settings without checking anything
    #[arg(long, conflicts_with_all = ["stats", "clear_unreachable"])]
    dry_run: bool,

    /// Show what the visit ledger holds and exit
    #[arg(long, conflicts_with_all = ["dry_run", "clear_unreachable"])]
    stats: bool,

    /// Forget every host marked unreachable and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    clear_unreachable: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.clear_unreachable {
        handle_clear_unreachable(&config)?;
    } else {
        let user_agent = cli
            .user_agent
            .unwrap_or_else(|| config.user_agent.crawler_name.clone());
        handle_check(&config, &user_agent, &cli.urls).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("polite_gate=info,warn"),
            1 => EnvFilter::new("polite_gate=debug,info"),
            2 => EnvFilter::new("polite_gate=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Handles the --dry-run mode: validates config and shows the gate settings
fn handle_dry_run(config: &Config) {
    println!("=== Polite-Gate Dry Run ===\n");

    println!("Gate:");
    println!("  Ledger: {} ({:?})", config.gate.state_path, config.gate.backend);
    println!("  Buffer: {}s", config.gate.buffer_seconds);
    println!("  Max wait: {}s", config.gate.max_wait_seconds);
    println!(
        "  Demote cached hosts on long waits: {}",
        config.gate.demote_cached_hosts
    );

    println!("\nUser Agent:");
    println!("  Header: {}", config.user_agent.header_value());

    println!("\nFetcher:");
    println!("  Timeout: {}s", config.fetcher.timeout_seconds);
    println!("  Connect timeout: {}s", config.fetcher.connect_timeout_seconds);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: summarizes the visit ledger
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let store = open_store(&config.gate)?;
    let ledger = store.load()?;

    println!("Ledger: {}\n", config.gate.state_path);

    println!("Known hosts ({}):", ledger.hosts.len());
    for (host, record) in &ledger.hosts {
        let last_visit = chrono::DateTime::<chrono::Utc>::from_timestamp(record.last_visit, 0)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| record.last_visit.to_string());
        println!(
            "  - {} (last visit {}, wait {}s)",
            host, last_visit, record.wait_seconds
        );
    }

    println!("\nUnreachable hosts ({}):", ledger.unreachable.len());
    for host in &ledger.unreachable {
        println!("  - {}", host);
    }

    Ok(())
}

/// Handles the --clear-unreachable mode
fn handle_clear_unreachable(config: &Config) -> anyhow::Result<()> {
    let mut store = open_store(&config.gate)?;
    let mut ledger = store.load()?;

    let count = ledger.unreachable.len();
    ledger.unreachable.clear();
    store.save(&ledger)?;

    println!("✓ Cleared {} unreachable hosts", count);
    Ok(())
}

/// Handles the default mode: checks every URL in order
async fn handle_check(config: &Config, user_agent: &str, urls: &[String]) -> anyhow::Result<()> {
    if urls.is_empty() {
        anyhow::bail!("No URLs given to check");
    }

    let mut gate = PolitenessGate::from_config(config)?;

    for url in urls {
        match gate.is_allowed(url, user_agent).await {
            Ok(true) => println!("allowed\t{}", url),
            Ok(false) => println!("denied\t{}", url),
            Err(polite_gate::GateError::Url(e)) => {
                tracing::warn!("Skipping {}: {}", url, e);
                println!("invalid\t{}", url);
            }
            Err(e) => return Err(e).context("Failed to persist gate state"),
        }
    }

    Ok(())
}
