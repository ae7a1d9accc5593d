//! auction-scraper main entry point
//!
//! This is the command-line interface for the auction-scraper ingester.

use anyhow::Context;
use auction_scraper::config::{load_config, validate, Config};
use auction_scraper::scraper::{open_scraper, Scraper};
use auction_scraper::storage::SqliteStore;
use auction_scraper::{Backend, ScrapeError};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// auction-scraper: a polite auction site ingester
///
/// Scrapes auctions, seller profiles and search results from auction
/// listing sites into a local SQLite database, optionally keeping the raw
/// pages and images.
#[derive(Parser, Debug)]
#[command(name = "auction-scraper")]
#[command(version)]
#[command(about = "A polite auction site ingester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Site to scrape
    #[arg(short, long, value_enum)]
    backend: Option<Backend>,

    /// Path to the SQLite database
    #[arg(long, value_name = "PATH")]
    db_path: Option<PathBuf>,

    /// Root directory for saved pages and images
    #[arg(long, value_name = "DIR")]
    data_location: Option<PathBuf>,

    /// Save the raw HTML of every scraped page
    #[arg(long)]
    save_pages: bool,

    /// Download the images of every scraped auction
    #[arg(long)]
    save_images: bool,

    /// Override the site's base URI
    #[arg(long, value_name = "URI")]
    base_uri: Option<String>,

    /// Minimum seconds between requests
    #[arg(long, value_name = "SECS")]
    cooldown: Option<f64>,

    /// Inline iframe contents into scraped pages
    #[arg(long)]
    resolve_frames: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape auctions by id or URI into the database
    Auction {
        #[arg(required = true, value_name = "AUCTION")]
        auctions: Vec<String>,
    },

    /// Scrape seller profiles by id or URI into the database
    Profile {
        #[arg(required = true, value_name = "PROFILE")]
        profiles: Vec<String>,
    },

    /// Search, then scrape every hit and its seller into the database
    Search {
        /// Results to keep per query, or "all"
        #[arg(value_name = "N", value_parser = parse_result_cap)]
        n_results: ResultCap,

        #[arg(required = true, value_name = "QUERY")]
        queries: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy)]
struct ResultCap(Option<usize>);

fn parse_result_cap(value: &str) -> Result<ResultCap, String> {
    if value.eq_ignore_ascii_case("all") {
        return Ok(ResultCap(None));
    }
    value
        .parse()
        .map(|n| ResultCap(Some(n)))
        .map_err(|_| format!("expected a number or \"all\", got '{}'", value))
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = build_config(&cli)?;
    let mut scraper = open_scraper(&config).context("Failed to set up scraper")?;

    let verbose = cli.verbose > 0;
    let succeeded = match &cli.command {
        Command::Auction { auctions } => {
            handle_auctions(&mut scraper, auctions, cli.save_pages, cli.save_images, verbose).await
        }
        Command::Profile { profiles } => {
            handle_profiles(&mut scraper, profiles, cli.save_pages, verbose).await
        }
        Command::Search { n_results, queries } => {
            handle_search(
                &mut scraper,
                queries,
                n_results.0,
                cli.save_pages,
                cli.save_images,
                verbose,
            )
            .await
        }
    };

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("auction_scraper=info,warn"),
            1 => EnvFilter::new("auction_scraper=debug,info"),
            _ => EnvFilter::new("auction_scraper=trace,debug"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the configuration file, if any, and applies command line overrides
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(backend) = cli.backend {
        config.scraper.backend = Some(backend);
    }
    if let Some(path) = &cli.db_path {
        config.scraper.database_path = Some(path.clone());
    }
    if let Some(location) = &cli.data_location {
        config.scraper.data_location = Some(location.clone());
    }
    if let Some(base) = &cli.base_uri {
        config.site.base_uri = Some(base.clone());
    }
    if let Some(cooldown) = cli.cooldown {
        config.scraper.cooldown_secs = cooldown;
    }
    if cli.resolve_frames {
        config.scraper.resolve_frames = true;
    }

    validate(&config).context("Invalid configuration")?;
    Ok(config)
}

async fn handle_auctions(
    scraper: &mut Scraper<SqliteStore>,
    auctions: &[String],
    save_pages: bool,
    save_images: bool,
    verbose: bool,
) -> bool {
    let mut succeeded = true;
    for reference in auctions {
        match scraper
            .scrape_auction_to_db(reference, save_pages, save_images)
            .await
        {
            Ok(auction) => tracing::info!(
                "Stored auction {}: {}",
                auction.id(),
                auction.title.as_deref().unwrap_or("(untitled)")
            ),
            Err(e) => {
                report_error(&e, verbose);
                succeeded = false;
            }
        }
    }
    succeeded
}

async fn handle_profiles(
    scraper: &mut Scraper<SqliteStore>,
    profiles: &[String],
    save_pages: bool,
    verbose: bool,
) -> bool {
    let mut succeeded = true;
    for reference in profiles {
        match scraper.scrape_profile_to_db(reference, save_pages).await {
            Ok(profile) => tracing::info!(
                "Stored profile {}: {}",
                profile.id(),
                profile.name.as_deref().unwrap_or("(unnamed)")
            ),
            Err(e) => {
                report_error(&e, verbose);
                succeeded = false;
            }
        }
    }
    succeeded
}

async fn handle_search(
    scraper: &mut Scraper<SqliteStore>,
    queries: &[String],
    n_results: Option<usize>,
    save_pages: bool,
    save_images: bool,
    verbose: bool,
) -> bool {
    match scraper
        .scrape_search_to_db(queries, n_results, save_pages, save_images)
        .await
    {
        Ok(scraped) => {
            tracing::info!(
                "Stored {} auction(s) and {} profile(s)",
                scraped.auctions.len(),
                scraped.profiles.len()
            );
            true
        }
        Err(ScrapeError::Aggregate(aggregate)) => {
            tracing::info!(
                "Stored {} auction(s) and {} profile(s)",
                aggregate.auctions.len(),
                aggregate.profiles.len()
            );
            eprintln!("{} item(s) failed:", aggregate.failures.len());
            for failure in &aggregate.failures {
                eprint!("{} {}: ", failure.kind, failure.id);
                report_error(&failure.error, verbose);
            }
            false
        }
        Err(e) => {
            report_error(&e, verbose);
            false
        }
    }
}

/// Prints an error: one line, or full detail with its source chain when
/// verbose
fn report_error(error: &ScrapeError, verbose: bool) {
    if !verbose {
        eprintln!("{}", error);
        return;
    }

    eprintln!("{:?}", error);
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        eprintln!("  caused by: {}", cause);
        source = cause.source();
    }
}
