//! auction-scraper: a polite auction site ingester
//!
//! This crate scrapes auctions, seller profiles and search results from
//! auction listing sites and stores them in a local SQLite database. Site
//! specific parsing lives behind the [`adapters::SiteAdapter`] trait; the
//! rest of the crate (request pacing, search de-pagination, the bulk
//! pipeline, persistence and image caching) is shared by every site.

pub mod adapters;
pub mod config;
pub mod models;
pub mod scraper;
pub mod storage;
pub mod text;

use thiserror::Error;

/// Main error type for scraping operations
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The remote resource was unreachable or answered with a non-success status
    #[error("Could not find page {uri}: {reason}")]
    NotFound { uri: String, reason: String },

    /// The page was fetched but matched no known layout
    ///
    /// This often means the scraper is being served an anti-scraping page.
    #[error("Failed to parse {uri}: {message}")]
    Parse { uri: String, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Aggregate(Box<AggregateError>),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScrapeError {
    pub(crate) fn parse(uri: &str, message: impl Into<String>) -> Self {
        Self::Parse {
            uri: uri.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn not_found(uri: &str, reason: impl Into<String>) -> Self {
        Self::NotFound {
            uri: uri.to_string(),
            reason: reason.into(),
        }
    }
}

/// What kind of entity a bulk-run failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Auction,
    Profile,
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auction => write!(f, "auction"),
            Self::Profile => write!(f, "profile"),
        }
    }
}

/// One failed item of a bulk run
#[derive(Debug)]
pub struct ItemFailure {
    pub kind: ItemKind,
    pub id: String,
    pub error: ScrapeError,
}

/// Failures collected during a bulk search run
///
/// Everything that was scraped successfully before and after the failures is
/// carried along; those records are already committed to the store.
#[derive(Debug)]
pub struct AggregateError {
    pub failures: Vec<ItemFailure>,
    pub auctions: Vec<models::AuctionRecord>,
    pub profiles: Vec<models::ProfileRecord>,
}

impl std::fmt::Display for AggregateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} item(s) failed during search scrape", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "\n  {} {}: {}", failure.kind, failure.id, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Missing setting: {0}")]
    Missing(&'static str),
}

/// Result type alias for scraping operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use adapters::{Backend, SiteAdapter};
pub use config::Config;
pub use models::{AuctionRecord, ProfileRecord, SearchResultRef, SearchResults};
pub use scraper::{Fetcher, Scraper};
pub use storage::{RecordStore, SqliteStore};
