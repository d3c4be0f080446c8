//! News-Ripple main entry point
//!
//! This is the command-line interface for the News-Ripple news crawler.

use clap::Parser;
use news_ripple::config::{load_config_with_hash, load_env_file, validate, Config};
use news_ripple::crawler::run_crawl;
use news_ripple::output::{
    load_store_statistics, print_statistics, print_store_statistics, StoreStatistics,
};
use news_ripple::storage::open_store;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// News-Ripple: A polite single-site news crawler
///
/// News-Ripple walks a news site breadth-first from a seed article, extracts
/// a structured record from every article page with an LLM, and stores one
/// JSON file per URL so interrupted crawls pick up where they left off.
#[derive(Parser, Debug)]
#[command(name = "news-ripple")]
#[command(version)]
#[command(about = "A polite single-site news crawler", long_about = None)]
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

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show how many records are already stored and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Read environment variables (such as the API key) from this file
    /// instead of looking for a .env file
    #[arg(long, value_name = "FILE")]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match load_env_file(cli.env_file.as_deref()) {
        Ok(Some(path)) => tracing::debug!("Loaded environment from {}", path.display()),
        Ok(None) => {}
        Err(e) => {
            tracing::error!("{}", e);
            return Err(e.into());
        }
    }

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(&config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("news_ripple=info,warn"),
            1 => EnvFilter::new("news_ripple=debug,info"),
            2 => EnvFilter::new("news_ripple=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let plan = validate(config)?;

    println!("=== News-Ripple Dry Run ===\n");

    println!("Crawl Plan:");
    println!("  Seed URL: {}", plan.seed);
    if plan.seed_fetch_url != plan.seed {
        println!("  Seed requested as: {}", plan.seed_fetch_url);
    }
    println!(
        "  Target domain: {}{}",
        plan.guard.domain(),
        if plan.guard.includes_subdomains() {
            " (including subdomains)"
        } else {
            ""
        }
    );
    println!("  Request delay: {}ms", plan.delay.as_millis());
    match config.crawler.max_pages {
        0 => println!("  Max pages: unbounded"),
        n => println!("  Max pages: {}", n),
    }

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());
    println!(
        "  robots.txt: {}",
        if config.fetcher.respect_robots {
            "respected"
        } else {
            "ignored"
        }
    );

    println!("\nArticle Links:");
    println!("  Path pattern: {}", config.links.path_pattern);
    println!("  Id parameter: {}", config.links.id_param);

    println!("\nExtraction:");
    println!("  Endpoint: {}", config.extraction.base_url);
    println!("  Model: {}", config.extraction.model);
    println!("  API key variable: {}", config.extraction.api_key_env);

    println!("\nOutput:");
    println!(
        "  Records: {}",
        Path::new(&config.output.data_root)
            .join(plan.guard.domain())
            .display()
    );

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: counts records already in the store
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let plan = validate(config)?;
    let domain = plan.guard.domain();
    let root = Path::new(&config.output.data_root).join(domain);

    println!("Store: {}\n", root.display());

    // A store that was never written holds nothing; don't create it just to count
    let stats = if root.is_dir() {
        let store = open_store(Path::new(&config.output.data_root), domain)?;
        load_store_statistics(&store, domain)?
    } else {
        StoreStatistics {
            domain: domain.to_string(),
            records: 0,
        }
    };

    print_store_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    match run_crawl(config).await {
        Ok(stats) => {
            print_statistics(&stats);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed [{}]: {}", e.kind(), e);
            Err(e.into())
        }
    }
}
