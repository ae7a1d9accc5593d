//! Site adapters
//!
//! Each supported site implements [`SiteAdapter`]: it knows the site's URI
//! layout, the extra columns it stores, and how to turn fetched pages into
//! records. The rest of the crate only talks to the trait.
//!
//! Sites change their markup over time, so parsers are written as ordered
//! lists of strategies tried through [`parse_with_fallbacks`].

pub mod catawiki;
pub mod ebay;
mod html;
mod json;
pub mod liveauctioneers;
mod uris;

pub use uris::{is_uri, SiteDefaults, SiteUris};

use crate::config::SiteOverrides;
use crate::models::{AuctionRecord, ProfileRecord, SearchResults};
use crate::scraper::Fetcher;
use crate::storage::SiteSchema;
use crate::{ConfigResult, Result, ScrapeError};
use async_trait::async_trait;
use serde::Deserialize;

/// Capability contract of a site
///
/// Fetch methods take the scraper's fetcher so that every request, the
/// adapter's extra API calls included, respects one cooldown.
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    /// Stable site name, used in table and file names
    fn backend_name(&self) -> &'static str;

    /// Table names and site-specific columns
    fn schema(&self) -> SiteSchema;

    fn uris(&self) -> &SiteUris;

    fn auction_uri(&self, reference: &str) -> Result<String> {
        self.uris().auction_uri(reference)
    }

    fn profile_uri(&self, reference: &str) -> Result<String> {
        self.uris().profile_uri(reference)
    }

    fn search_uri(&self, query: &str, page: u32) -> Result<String> {
        self.uris().search_uri(query, page)
    }

    /// Fetches and parses an auction page
    ///
    /// # Returns
    ///
    /// The auction and the raw page content, for archival.
    async fn fetch_auction(&self, fetcher: &mut Fetcher, uri: &str) -> Result<(AuctionRecord, String)>;

    /// Fetches and parses a profile page
    async fn fetch_profile(&self, fetcher: &mut Fetcher, uri: &str) -> Result<(ProfileRecord, String)>;

    /// Fetches and parses one page of search results
    async fn fetch_search_page(
        &self,
        fetcher: &mut Fetcher,
        uri: &str,
    ) -> Result<(SearchResults, String)>;
}

/// Adapter behaviour switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdapterOptions {
    /// Inline iframe contents into fetched auction and profile pages
    ///
    /// Sites whose item data lives in a frame inline it regardless.
    pub resolve_frames: bool,
}

/// The supported sites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Catawiki,
    Ebay,
    #[value(name = "liveauctioneers")]
    LiveAuctioneers,
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Catawiki => catawiki::BACKEND_NAME,
            Self::Ebay => ebay::BACKEND_NAME,
            Self::LiveAuctioneers => liveauctioneers::BACKEND_NAME,
        }
    }

    pub fn defaults(&self) -> &'static SiteDefaults {
        match self {
            Self::Catawiki => &catawiki::DEFAULTS,
            Self::Ebay => &ebay::DEFAULTS,
            Self::LiveAuctioneers => &liveauctioneers::DEFAULTS,
        }
    }

    /// Resolves the site's URI templates, applying configured overrides
    pub fn site_uris(&self, overrides: &SiteOverrides) -> ConfigResult<SiteUris> {
        let defaults = self.defaults();
        SiteUris::new(
            overrides.base_uri.as_deref().unwrap_or(defaults.base_uri),
            overrides
                .auction_suffix
                .as_deref()
                .unwrap_or(defaults.auction_suffix),
            overrides
                .profile_suffix
                .as_deref()
                .unwrap_or(defaults.profile_suffix),
            overrides
                .search_suffix
                .as_deref()
                .unwrap_or(defaults.search_suffix),
        )
    }

    pub fn build(&self, uris: SiteUris, options: AdapterOptions) -> Box<dyn SiteAdapter> {
        match self {
            Self::Catawiki => Box::new(catawiki::CatawikiAdapter::new(uris, options)),
            Self::Ebay => Box::new(ebay::EbayAdapter::new(uris, options)),
            Self::LiveAuctioneers => {
                Box::new(liveauctioneers::LiveAuctioneersAdapter::new(uris, options))
            }
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A named parser for one known page layout
pub type ParseStrategy<I, T> = (&'static str, fn(&I) -> std::result::Result<T, String>);

/// Tries each strategy in order and returns the first success
///
/// # Returns
///
/// * `Ok(T)` - Result of the first strategy that succeeded
/// * `Err(ScrapeError::Parse)` - Every strategy failed; the message lists
///   each strategy's failure
pub fn parse_with_fallbacks<I: ?Sized, T>(
    uri: &str,
    input: &I,
    strategies: &[ParseStrategy<I, T>],
) -> Result<T> {
    let mut failures = Vec::with_capacity(strategies.len());

    for (name, strategy) in strategies {
        match strategy(input) {
            Ok(parsed) => return Ok(parsed),
            Err(reason) => {
                tracing::debug!("Layout '{}' did not match {}: {}", name, uri, reason);
                failures.push(format!("{}: {}", name, reason));
            }
        }
    }

    Err(ScrapeError::parse(
        uri,
        format!(
            "page matched no known layout, possibly an anti-scraping page ({})",
            failures.join("; ")
        ),
    ))
}
