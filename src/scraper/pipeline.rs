//! Single-entity scrapes and the bulk search pipeline

use crate::models::{AuctionRecord, ProfileRecord, SearchResults};
use crate::scraper::{cache_images, depaginate, Scraper};
use crate::storage::RecordStore;
use crate::{AggregateError, ItemFailure, ItemKind, Result, ScrapeError};
use std::collections::HashSet;
use std::time::Duration;

/// How often a search query is attempted before the bulk run aborts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Pause between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// Everything a successful bulk search run stored
#[derive(Debug, Clone, Default)]
pub struct SearchScrape {
    pub auctions: Vec<AuctionRecord>,
    pub profiles: Vec<ProfileRecord>,
}

impl<S: RecordStore> Scraper<S> {
    /// Scrapes one auction by id or URI without storing it
    ///
    /// With `save_images`, the auction's images are cached and
    /// `image_paths` lists them.
    pub async fn scrape_auction(
        &mut self,
        reference: &str,
        save_page: bool,
        save_images: bool,
    ) -> Result<AuctionRecord> {
        self.check_archive(save_page, save_images)?;

        let mut auction = self.fetch_auction(reference, save_page).await?;
        if save_images {
            auction.image_paths = cache_images(&mut self.fetcher, &self.archive, &auction).await?;
        }
        Ok(auction)
    }

    /// Scrapes one auction and merges it into the store
    ///
    /// Image paths already stored for the auction are always kept, whether
    /// or not images are cached again.
    pub async fn scrape_auction_to_db(
        &mut self,
        reference: &str,
        save_page: bool,
        save_images: bool,
    ) -> Result<AuctionRecord> {
        self.check_archive(save_page, save_images)?;

        let mut auction = self.fetch_auction(reference, save_page).await?;
        if let Some(stored) = self.store.get_auction(auction.id())? {
            auction.image_paths = stored.image_paths;
        }
        if save_images {
            auction.image_paths = cache_images(&mut self.fetcher, &self.archive, &auction).await?;
        }

        self.store.merge_auction(&mut auction)?;
        Ok(auction)
    }

    /// Scrapes one profile by id or URI without storing it
    pub async fn scrape_profile(&mut self, reference: &str, save_page: bool) -> Result<ProfileRecord> {
        self.check_archive(save_page, false)?;
        self.fetch_profile(reference, save_page).await
    }

    /// Scrapes one profile and merges it into the store
    pub async fn scrape_profile_to_db(
        &mut self,
        reference: &str,
        save_page: bool,
    ) -> Result<ProfileRecord> {
        self.check_archive(save_page, false)?;

        let mut profile = self.fetch_profile(reference, save_page).await?;
        self.store.merge_profile(&mut profile)?;
        Ok(profile)
    }

    /// De-paginates one search query
    ///
    /// See [`depaginate`](crate::scraper::depaginate) for the stopping and
    /// trimming rules.
    pub async fn scrape_search(
        &mut self,
        query: &str,
        n_results: Option<usize>,
        save_page: bool,
    ) -> Result<SearchResults> {
        self.check_archive(save_page, false)?;

        let archive = save_page.then_some(&self.archive);
        depaginate(self.adapter.as_ref(), &mut self.fetcher, archive, query, n_results).await
    }

    /// Runs every query, then scrapes and stores each hit and its seller
    ///
    /// # Process
    ///
    /// 1. Each query is de-paginated, retried per the search retry policy.
    ///    A query that keeps failing aborts the run.
    /// 2. Hits of all queries are merged; an auction id seen by an earlier
    ///    query keeps that query's entry.
    /// 3. Every hit's auction is scraped and stored, followed by its seller's
    ///    profile the first time that seller appears. Failures are collected
    ///    and the run continues.
    ///
    /// # Returns
    ///
    /// * `Ok(SearchScrape)` - Every auction and profile was stored
    /// * `Err(ScrapeError::Aggregate)` - Some items failed; the error carries
    ///   the failures and everything that was stored
    /// * `Err(_)` - A search phase or setup failure
    pub async fn scrape_search_to_db<Q: AsRef<str>>(
        &mut self,
        queries: &[Q],
        n_results: Option<usize>,
        save_page: bool,
        save_images: bool,
    ) -> Result<SearchScrape> {
        self.check_archive(save_page, save_images)?;

        let mut results = SearchResults::new();
        for query in queries {
            let query = query.as_ref();
            tracing::info!("Scraping query string {}", query);
            let hits = self.search_with_retry(query, n_results, save_page).await?;
            results.merge(hits);
        }
        tracing::info!("Collected {} auction(s) from {} query(ies)", results.len(), queries.len());

        let mut attempted_sellers = HashSet::new();
        let mut failures = Vec::new();
        let mut scraped = SearchScrape::default();

        for hit in results {
            tracing::info!("Scraping auction url {}", hit.uri);
            let auction = match self.scrape_auction_to_db(&hit.uri, save_page, save_images).await {
                Ok(auction) => auction,
                Err(error) => {
                    tracing::error!("Error processing auction {}: {}", hit.auction_id, error);
                    failures.push(ItemFailure {
                        kind: ItemKind::Auction,
                        id: hit.auction_id,
                        error,
                    });
                    continue;
                }
            };

            let seller_id = auction.seller_id.clone();
            scraped.auctions.push(auction);

            let Some(seller_id) = seller_id else {
                continue;
            };
            if !attempted_sellers.insert(seller_id.clone()) {
                continue;
            }

            tracing::info!("Scraping profile {}", seller_id);
            match self.scrape_profile_to_db(&seller_id, save_page).await {
                Ok(profile) => scraped.profiles.push(profile),
                Err(error) => {
                    tracing::error!("Error processing profile {}: {}", seller_id, error);
                    failures.push(ItemFailure {
                        kind: ItemKind::Profile,
                        id: seller_id,
                        error,
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(scraped)
        } else {
            Err(ScrapeError::Aggregate(Box::new(AggregateError {
                failures,
                auctions: scraped.auctions,
                profiles: scraped.profiles,
            })))
        }
    }

    async fn search_with_retry(
        &mut self,
        query: &str,
        n_results: Option<usize>,
        save_page: bool,
    ) -> Result<SearchResults> {
        let max_attempts = self.search_retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.scrape_search(query, n_results, save_page).await {
                Ok(hits) => return Ok(hits),
                Err(error) if attempt < max_attempts => {
                    tracing::warn!(
                        "Search attempt {}/{} for '{}' failed: {}",
                        attempt,
                        max_attempts,
                        query,
                        error
                    );
                    tokio::time::sleep(self.search_retry.delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn fetch_auction(&mut self, reference: &str, save_page: bool) -> Result<AuctionRecord> {
        let uri = self.adapter.auction_uri(reference)?;
        tracing::debug!("Fetching auction {}", uri);

        let (auction, raw) = self.adapter.fetch_auction(&mut self.fetcher, &uri).await?;
        if save_page {
            self.archive.save_auction_page(auction.id(), &raw)?;
        }
        Ok(auction)
    }

    async fn fetch_profile(&mut self, reference: &str, save_page: bool) -> Result<ProfileRecord> {
        let uri = self.adapter.profile_uri(reference)?;
        tracing::debug!("Fetching profile {}", uri);

        let (profile, raw) = self.adapter.fetch_profile(&mut self.fetcher, &uri).await?;
        if save_page {
            self.archive.save_profile_page(profile.id(), &raw)?;
        }
        Ok(profile)
    }

    fn check_archive(&self, save_page: bool, save_images: bool) -> Result<()> {
        if save_page {
            self.archive.require_pages()?;
        }
        if save_images {
            self.archive.require_images()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_retry_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay, Duration::from_secs(1));
    }
}
