//! Scripted site adapter and scraper builders shared by the tests

use async_trait::async_trait;
use auction_scraper::adapters::{SiteAdapter, SiteUris};
use auction_scraper::config::UserAgentConfig;
use auction_scraper::models::{AuctionRecord, ProfileRecord, SearchResultRef, SearchResults};
use auction_scraper::scraper::{build_http_client, Archive, Fetcher, RetryPolicy, Scraper};
use auction_scraper::storage::{SiteSchema, SqliteStore};
use auction_scraper::{Result, ScrapeError};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

pub const MOCK_BASE: &str = "https://mock.example";

/// Call counters shared between a test and its adapter
#[derive(Debug, Default)]
pub struct Calls {
    pub search: AtomicUsize,
    pub auction: AtomicUsize,
    pub profiles: Mutex<Vec<String>>,
}

impl Calls {
    pub fn searches(&self) -> usize {
        self.search.load(Ordering::SeqCst)
    }

    pub fn auctions(&self) -> usize {
        self.auction.load(Ordering::SeqCst)
    }

    pub fn profile_ids(&self) -> Vec<String> {
        self.profiles.lock().unwrap().clone()
    }
}

/// A site whose pages are described in memory
pub struct MockSite {
    uris: SiteUris,
    /// query -> pages of (auction id, title)
    pages: HashMap<String, Vec<Vec<(String, String)>>>,
    sellers: HashMap<String, String>,
    failing_auctions: HashSet<String>,
    failing_profiles: HashSet<String>,
    search_failures_left: AtomicUsize,
    pub calls: Arc<Calls>,
}

impl MockSite {
    pub fn new() -> Self {
        Self {
            uris: SiteUris::new(MOCK_BASE, "/lot/{}", "/seller/{}", "/search?q={}&page={}").unwrap(),
            pages: HashMap::new(),
            sellers: HashMap::new(),
            failing_auctions: HashSet::new(),
            failing_profiles: HashSet::new(),
            search_failures_left: AtomicUsize::new(0),
            calls: Arc::new(Calls::default()),
        }
    }

    /// Adds a search results page for a query; pages are numbered from 1
    /// in the order they are added
    pub fn page(mut self, query: &str, hits: &[(&str, &str)]) -> Self {
        let hits = hits
            .iter()
            .map(|(id, title)| (id.to_string(), title.to_string()))
            .collect();
        self.pages.entry(query.to_string()).or_default().push(hits);
        self
    }

    pub fn seller(mut self, auction_id: &str, seller_id: &str) -> Self {
        self.sellers.insert(auction_id.to_string(), seller_id.to_string());
        self
    }

    pub fn failing_auction(mut self, auction_id: &str) -> Self {
        self.failing_auctions.insert(auction_id.to_string());
        self
    }

    pub fn failing_profile(mut self, profile_id: &str) -> Self {
        self.failing_profiles.insert(profile_id.to_string());
        self
    }

    /// Makes the next `n` search page fetches fail with `NotFound`
    pub fn failing_searches(self, n: usize) -> Self {
        self.search_failures_left.store(n, Ordering::SeqCst);
        self
    }
}

fn last_segment(uri: &str) -> String {
    Url::parse(uri)
        .ok()
        .and_then(|url| url.path_segments()?.last().map(String::from))
        .unwrap_or_default()
}

#[async_trait]
impl SiteAdapter for MockSite {
    fn backend_name(&self) -> &'static str {
        "mock"
    }

    fn schema(&self) -> SiteSchema {
        SiteSchema::for_backend("mock", &[], &[])
    }

    fn uris(&self) -> &SiteUris {
        &self.uris
    }

    async fn fetch_auction(&self, _fetcher: &mut Fetcher, uri: &str) -> Result<(AuctionRecord, String)> {
        self.calls.auction.fetch_add(1, Ordering::SeqCst);
        let id = last_segment(uri);
        if self.failing_auctions.contains(&id) {
            return Err(ScrapeError::Parse {
                uri: uri.to_string(),
                message: "unexpected layout".to_string(),
            });
        }

        let mut auction = AuctionRecord::new(id.clone());
        auction.title = Some(format!("Lot {}", id));
        auction.uri = Some(uri.to_string());
        auction.seller_id = self.sellers.get(&id).cloned();
        Ok((auction, format!("<html>lot {}</html>", id)))
    }

    async fn fetch_profile(&self, _fetcher: &mut Fetcher, uri: &str) -> Result<(ProfileRecord, String)> {
        let id = last_segment(uri);
        self.calls.profiles.lock().unwrap().push(id.clone());
        if self.failing_profiles.contains(&id) {
            return Err(ScrapeError::NotFound {
                uri: uri.to_string(),
                reason: "HTTP 404 Not Found".to_string(),
            });
        }

        let mut profile = ProfileRecord::new(id.clone());
        profile.name = Some(format!("Seller {}", id));
        profile.uri = Some(uri.to_string());
        Ok((profile, format!("<html>seller {}</html>", id)))
    }

    async fn fetch_search_page(&self, _fetcher: &mut Fetcher, uri: &str) -> Result<(SearchResults, String)> {
        self.calls.search.fetch_add(1, Ordering::SeqCst);

        let failures_left = self.search_failures_left.load(Ordering::SeqCst);
        if failures_left > 0 {
            self.search_failures_left.store(failures_left - 1, Ordering::SeqCst);
            return Err(ScrapeError::NotFound {
                uri: uri.to_string(),
                reason: "connection failed".to_string(),
            });
        }

        let url = Url::parse(uri).unwrap();
        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
        let query = params.get("q").cloned().unwrap_or_default();
        let page: usize = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);

        let hits = self
            .pages
            .get(&query)
            .and_then(|pages| pages.get(page - 1))
            .cloned()
            .unwrap_or_default();

        let results = hits
            .into_iter()
            .map(|(id, title)| {
                let uri = format!("{}/lot/{}", MOCK_BASE, id);
                SearchResultRef::new(id, format!("{} ({})", title, query), uri)
            })
            .collect();
        Ok((results, format!("<html>{} page {}</html>", query, page)))
    }
}

pub fn test_fetcher() -> Fetcher {
    let client = build_http_client(&UserAgentConfig::default()).unwrap();
    Fetcher::new(client, Duration::ZERO)
}

/// Scraper over a scripted site with an in-memory store and fast retries
pub fn mock_scraper(site: MockSite) -> (Scraper<SqliteStore>, Arc<Calls>) {
    let calls = Arc::clone(&site.calls);
    let store = SqliteStore::open_in_memory(site.schema()).unwrap();
    let scraper = Scraper::new(Box::new(site), test_fetcher(), store, Archive::disabled("mock"))
        .with_search_retry(RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_millis(10),
        });
    (scraper, calls)
}
