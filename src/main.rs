//! spider-scheduler main entry point
//!
//! This is the command-line interface for the spider-scheduler crawl core.

use anyhow::Context;
use clap::Parser;
use spider_scheduler::config::{load_config_with_hash, Config, QueueBackend};
use spider_scheduler::crawler::Coordinator;
use spider_scheduler::output::{load_statistics, print_statistics};
use spider_scheduler::storage::open_storage;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// spider-scheduler: paced URL scheduling for a polite crawler
///
/// Hands out one URL at a time across many domains, never faster than each
/// domain's configured delay, and records every claim in a SQLite store.
#[derive(Parser, Debug)]
#[command(name = "spider-scheduler")]
#[command(version)]
#[command(about = "Paced URL scheduling for a polite crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Stop the first time any domain's queue runs dry
    #[arg(long)]
    once: bool,

    /// Stop after claiming this many URLs
    #[arg(long, value_name = "N")]
    limit: Option<u64>,

    /// Clear leftover queued URLs before starting (sqlite queue backend)
    #[arg(long)]
    fresh: bool,

    /// Validate config and show the domain table without scheduling anything
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show page statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    apply_overrides(&mut config, &cli);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_schedule(&config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("spider_scheduler=info,warn"),
            1 => EnvFilter::new("spider_scheduler=debug,info"),
            2 => EnvFilter::new("spider_scheduler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Claimed URLs go to stdout; keep logs off it.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Folds command-line switches into the loaded configuration
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if cli.once {
        config.scheduler.once = true;
    }
    if let Some(limit) = cli.limit {
        config.scheduler.claim_limit = limit;
    }
    if cli.fresh {
        config.queue.fresh = true;
    }
}

/// Handles the --dry-run mode: validates config and shows the domain table
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== spider-scheduler Dry Run ===\n");

    println!("Scheduler:");
    println!("  Run once: {}", config.scheduler.once);
    if config.scheduler.claim_limit > 0 {
        println!("  Claim limit: {}", config.scheduler.claim_limit);
    } else {
        println!("  Claim limit: unlimited");
    }

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    println!("\nQueue:");
    match config.queue.backend {
        QueueBackend::Memory => println!("  Backend: memory"),
        QueueBackend::Sqlite => {
            println!("  Backend: sqlite");
            println!("  Fresh: {}", config.queue.fresh);
        }
    }

    let policies = config
        .domain_policies()
        .context("Invalid domain in configuration")?;

    println!("\nDomains ({}):", policies.len());
    for policy in &policies {
        println!(
            "  - {} every {}ms ({})",
            policy.key(),
            policy.delay().as_millis(),
            policy.url()
        );
        for url in policy.reseed_urls() {
            println!("    * {}", url);
        }
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would seed {} URLs across {} domains",
        policies.iter().map(|p| p.reseed_urls().len()).sum::<usize>(),
        policies.len()
    );

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let storage = open_storage(Path::new(&config.storage.database_path))
        .context("Failed to open database")?;
    let stats = load_statistics(&storage).context("Failed to load statistics")?;

    print_statistics(&stats);

    Ok(())
}

/// Handles the main scheduling run
async fn handle_schedule(config: &Config) -> anyhow::Result<()> {
    tracing::info!(
        "Scheduling {} domains with the {:?} queue backend",
        config.domains.len(),
        config.queue.backend
    );

    let coordinator = Coordinator::new(config).context("Failed to start scheduler")?;

    let stop = coordinator.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, stopping");
            stop.stop();
        }
    });

    let summary = coordinator
        .run(|claim| println!("{}", claim.page.url))
        .await
        .context("Scheduler failed")?;

    let mut domains: Vec<_> = summary.claims_by_domain.iter().collect();
    domains.sort();
    for (domain, count) in domains {
        tracing::info!("  {}: {} claims", domain, count);
    }

    Ok(())
}
