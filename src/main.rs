//! Profile-Harvester main entry point
//!
//! This is the command-line interface for the profile harvester.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use profile_harvester::config::{load_config_with_hash, Config};
use profile_harvester::harvester::{Harvester, Phase};
use profile_harvester::output::{
    generate_markdown_summary, generate_summary, print_run_summary, print_statistics,
};
use profile_harvester::storage::SqliteJournal;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Profile-Harvester: a concurrent profile scraper
///
/// Searches a people directory for the configured names, then fetches every
/// profile found. Results are deduplicated and appended to CSV files in
/// batches while many fetches run concurrently.
#[derive(Parser, Debug)]
#[command(name = "profile-harvester")]
#[command(version = "1.0.0")]
#[command(about = "A concurrent profile scraper", long_about = None)]
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

    /// Which phases to run
    #[arg(long, value_enum, default_value_t = PhaseArg::All)]
    phase: PhaseArg,

    /// Validate config and show what would be fetched without fetching
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics of the latest run from the journal and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PhaseArg {
    All,
    Search,
    Profiles,
}

impl PhaseArg {
    fn phases(self) -> &'static [Phase] {
        match self {
            PhaseArg::All => &[Phase::Search, Phase::Profiles],
            PhaseArg::Search => &[Phase::Search],
            PhaseArg::Profiles => &[Phase::Profiles],
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(config, cli.phase.phases())
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_harvest(config, cli.phase.phases(), &config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("profile_harvester=info,warn"),
            1 => EnvFilter::new("profile_harvester=debug,info"),
            2 => EnvFilter::new("profile_harvester=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be fetched
fn handle_dry_run(config: Config, phases: &[Phase]) -> anyhow::Result<()> {
    println!("=== Profile-Harvester Dry Run ===\n");

    println!("Harvester Configuration:");
    println!("  Workers: {}", config.harvester.worker_count);
    println!("  Retries per item: {}", config.harvester.max_attempts);
    println!("  Batch threshold: {}", config.harvester.batch_threshold);

    println!("\nFetcher:");
    println!("  Timeout: {}s", config.fetcher.timeout_secs);
    match &config.proxy {
        Some(proxy) => println!("  Proxy: {} (country {})", proxy.endpoint, proxy.country),
        None => println!("  Proxy: none"),
    }

    println!("\nOutput:");
    println!("  Search results: {}", config.output.search_path);
    println!("  Profiles: {}", config.output.profile_path);
    println!("  Journal: {}", config.output.journal_path);
    if let Some(summary) = &config.output.summary_path {
        println!("  Summary: {}", summary);
    }

    let harvester = Harvester::new(config);

    if phases.contains(&Phase::Search) {
        let items = harvester.search_items()?;
        println!("\nSearches ({}):", items.len());
        for item in &items {
            println!("  - {}: {}", item.key, item.url);
        }
    }

    if phases.contains(&Phase::Profiles) {
        let search_path = &harvester.config().output.search_path;
        if phases.contains(&Phase::Search) {
            println!("\nProfiles: read from {} after the search phase", search_path);
        } else {
            let items = harvester.profile_items()?;
            println!("\nProfiles ({}) from {}:", items.len(), search_path);
            for item in &items {
                println!("  - {}: {}", item.key, item.url);
            }
        }
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: shows the latest run from the journal
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Journal: {}\n", config.output.journal_path);

    let journal = SqliteJournal::new(Path::new(&config.output.journal_path))?;
    let summary = generate_summary(&journal)?;
    print_statistics(&summary);

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config, phases: &[Phase], config_hash: &str) -> anyhow::Result<()> {
    tracing::info!(
        "Harvesting {} keywords with {} workers",
        config.search.keywords.len(),
        config.harvester.worker_count
    );

    let journal_path = config.output.journal_path.clone();
    let summary_path = config.output.summary_path.clone();

    let harvester = Harvester::new(config);
    let summary = match harvester.run(phases, config_hash).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            return Err(e.into());
        }
    };

    print_run_summary(&summary);

    if let Some(summary_path) = summary_path {
        let journal = SqliteJournal::new(Path::new(&journal_path))?;
        let run_summary = generate_summary(&journal)?;
        generate_markdown_summary(&run_summary, Path::new(&summary_path))
            .with_context(|| format!("failed to write {}", summary_path))?;
        println!("\n✓ Summary written to: {}", summary_path);
    }

    Ok(())
}
