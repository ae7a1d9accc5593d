//! Scraping orchestration
//!
//! This module ties a site adapter to the shared machinery:
//! - Rate-limited fetching ([`Fetcher`], [`Cooldown`])
//! - Search de-pagination ([`depaginate`])
//! - Raw page and image archival ([`Archive`], [`cache_images`])
//! - Single-entity and bulk scrapes into a record store ([`Scraper`])

mod archive;
mod cooldown;
mod fetcher;
mod images;
mod pipeline;
mod search;

pub use archive::{Archive, ArchivePaths};
pub use cooldown::Cooldown;
pub use fetcher::{build_http_client, Fetcher};
pub use images::cache_images;
pub use pipeline::{RetryPolicy, SearchScrape};
pub use search::depaginate;

use crate::adapters::{AdapterOptions, SiteAdapter};
use crate::config::Config;
use crate::storage::{RecordStore, SqliteStore};
use crate::{ConfigError, Result};

/// A site adapter bound to a fetcher, a record store and an archive
///
/// All requests of one scraper share the fetcher's cooldown.
pub struct Scraper<S: RecordStore> {
    adapter: Box<dyn SiteAdapter>,
    fetcher: Fetcher,
    store: S,
    archive: Archive,
    search_retry: RetryPolicy,
}

impl<S: RecordStore> Scraper<S> {
    pub fn new(adapter: Box<dyn SiteAdapter>, fetcher: Fetcher, store: S, archive: Archive) -> Self {
        Self {
            adapter,
            fetcher,
            store,
            archive,
            search_retry: RetryPolicy::default(),
        }
    }

    /// Replaces the retry policy used for each query of a bulk search
    pub fn with_search_retry(mut self, policy: RetryPolicy) -> Self {
        self.search_retry = policy;
        self
    }

    pub fn adapter(&self) -> &dyn SiteAdapter {
        self.adapter.as_ref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }
}

/// Builds a scraper backed by SQLite from a validated configuration
///
/// # Arguments
///
/// * `config` - Configuration with a backend and database path set
///
/// # Returns
///
/// * `Ok(Scraper)` - Ready scraper; database tables and archive directories exist
/// * `Err(ScrapeError)` - A required setting is missing or setup failed
pub fn open_scraper(config: &Config) -> Result<Scraper<SqliteStore>> {
    let backend = config.scraper.backend.ok_or(ConfigError::Missing("backend"))?;
    let database_path = config
        .scraper
        .database_path
        .as_deref()
        .ok_or(ConfigError::Missing("database-path"))?;

    let uris = backend.site_uris(&config.site)?;
    let adapter = backend.build(
        uris,
        AdapterOptions {
            resolve_frames: config.scraper.resolve_frames,
        },
    );

    let client = build_http_client(&config.user_agent)?;
    let fetcher = Fetcher::new(client, config.cooldown());

    let store = SqliteStore::open(database_path, adapter.schema())?;

    let paths = ArchivePaths::resolve(
        config.scraper.data_location.as_deref(),
        adapter.backend_name(),
        &config.paths,
    );
    let archive = Archive::new(adapter.backend_name(), paths)?;

    tracing::info!(
        "Scraping {} into {}",
        adapter.backend_name(),
        database_path.display()
    );

    Ok(Scraper::new(adapter, fetcher, store, archive))
}
