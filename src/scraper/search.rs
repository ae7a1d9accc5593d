//! Search de-pagination
//!
//! Fetches search pages 1, 2, ... for a query until a page contributes no
//! new auction ids or enough results are collected.

use crate::adapters::SiteAdapter;
use crate::models::SearchResults;
use crate::scraper::{Archive, Fetcher};
use crate::Result;

/// Collects up to `n_results` search hits for a query
///
/// # Arguments
///
/// * `adapter` - The site adapter generating and parsing search pages
/// * `fetcher` - The rate-limited fetcher
/// * `archive` - Where raw search pages are written, if they should be kept
/// * `query` - The search query string
/// * `n_results` - Result cap, or `None` for every result
///
/// # Returns
///
/// Hits in first-seen order. When the last page overshoots the cap, the
/// most recently seen hits are dropped.
pub async fn depaginate(
    adapter: &dyn SiteAdapter,
    fetcher: &mut Fetcher,
    archive: Option<&Archive>,
    query: &str,
    n_results: Option<usize>,
) -> Result<SearchResults> {
    let mut results = SearchResults::new();
    let mut page = 1;

    while n_results.map_or(true, |cap| results.len() < cap) {
        let uri = adapter.search_uri(query, page)?;
        tracing::debug!("Scraping search page with uri {}", uri);

        let (hits, raw) = adapter.fetch_search_page(fetcher, &uri).await?;
        if let Some(archive) = archive {
            archive.save_search_page(query, page, &raw)?;
        }

        if results.merge(hits) == 0 {
            break;
        }
        page += 1;
    }

    if let Some(cap) = n_results {
        results.truncate(cap);
    }

    tracing::debug!("Query '{}' yielded {} result(s)", query, results.len());
    Ok(results)
}
