//! TMDb Sweep main entry point
//!
//! This is the command-line interface for the TMDb catalog sweep.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use tmdb_sweep::config::{load_config_with_hash, Config, StoreBackend};
use tmdb_sweep::crawler::{run_sweep, RunOutcome};
use tmdb_sweep::storage::{open_storage, RestStorage};
use tracing_subscriber::EnvFilter;

/// TMDb Sweep: a resumable, quota-bounded catalog ingester
///
/// Walks the discover endpoint year by year and region by region, enriches
/// every listed movie, and upserts the results. Rerunning after a quota
/// exit continues from the stored checkpoint.
#[derive(Parser, Debug)]
#[command(name = "tmdb-sweep")]
#[command(version)]
#[command(about = "A resumable, quota-bounded TMDb catalog ingester", long_about = None)]
struct Cli {
    /// Path to an optional TOML configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the traversal plan without calling any API
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let (config, config_hash) = match load_config_with_hash(cli.config.as_deref()) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e).context("configuration is unusable");
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let outcome = handle_sweep(config, config_hash).await?;
    match outcome {
        RunOutcome::Done => tracing::info!("Sweep complete"),
        RunOutcome::QuotaExit => tracing::info!("Stopped on quota; rerun to resume"),
        RunOutcome::AlreadyComplete => tracing::info!("Nothing left to sweep"),
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tmdb_sweep=info,warn"),
            1 => EnvFilter::new("tmdb_sweep=debug,info"),
            2 => EnvFilter::new("tmdb_sweep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: prints what would be swept
fn handle_dry_run(config: &Config) {
    let sweep = &config.sweep;
    let regions: Vec<&str> = sweep.regions.iter().map(|r| r.as_str()).collect();

    println!("=== TMDb Sweep Dry Run ===\n");

    println!("Traversal:");
    println!("  Years: {}..={}", sweep.start_year, sweep.end_year);
    println!("  Regions: {}", regions.join(", "));
    println!("  Language filter: {}", sweep.language_filter);

    println!("\nAPI:");
    println!("  Base URL: {}", config.api.base_url);
    println!("  Image base URL: {}", config.api.image_base_url);

    println!("\nRetry:");
    println!("  Max attempts: {}", config.retry.max_attempts);
    println!("  Retry delay: {}ms", config.retry.retry_delay_ms);
    println!("  Rate-limit fallback: {}ms", config.retry.rate_limit_fallback_ms);

    println!("\nStore:");
    match config.store.backend {
        StoreBackend::Rest => {
            println!("  Backend: rest ({})", config.secrets.store_url);
            println!("  Records table: {}", config.store.records_table);
            println!("  Progress table: {}", config.store.progress_table);
        }
        StoreBackend::Sqlite => println!("  Backend: sqlite ({})", config.store.sqlite_path),
    }
    println!("  Batch size: {}", config.store.batch_size);

    let years = (sweep.end_year - sweep.start_year + 1) as usize;
    println!("\n✓ Configuration is valid");
    println!("✓ Would sweep {} (year, region) pairs", years * sweep.regions.len());
}

/// Opens the configured store and runs the sweep
async fn handle_sweep(config: Config, config_hash: String) -> anyhow::Result<RunOutcome> {
    let outcome = match config.store.backend {
        StoreBackend::Rest => {
            let store = RestStorage::new(
                &config.secrets.store_url,
                &config.secrets.store_key,
                &config.store,
            )
            .context("failed to build REST store client")?;
            run_sweep(config, config_hash, store).await
        }
        StoreBackend::Sqlite => {
            let path = config.store.sqlite_path.clone();
            let store = open_storage(Path::new(&path))
                .with_context(|| format!("failed to open {}", path))?;
            run_sweep(config, config_hash, store).await
        }
    };

    match outcome {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            tracing::error!("Sweep failed: {}", e);
            Err(e).context("sweep aborted")
        }
    }
}
