use crate::models::AuctionRecord;
use crate::scraper::{Archive, Fetcher};
use crate::Result;
use std::collections::BTreeSet;
use url::Url;

/// Downloads an auction's images into the archive
///
/// Files that already exist are not downloaded again. Images that cannot be
/// fetched are logged and skipped.
///
/// # Returns
///
/// The union of the auction's existing `image_paths` and the paths of every
/// image now on disk. Nothing is ever removed from the set.
pub async fn cache_images(
    fetcher: &mut Fetcher,
    archive: &Archive,
    auction: &AuctionRecord,
) -> Result<BTreeSet<String>> {
    let mut paths = auction.image_paths.clone();

    for raw in &auction.image_urls {
        let url = match Url::parse(raw) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Skipping image {} of auction {}: {}", raw, auction.id(), e);
                continue;
            }
        };

        let path = archive.image_path(auction.id(), &url)?;
        let path_string = path.to_string_lossy().into_owned();

        if path.is_file() {
            paths.insert(path_string);
            continue;
        }

        match fetcher.get_bytes(url.as_str()).await {
            Ok((status, body)) if status.is_success() => {
                tokio::fs::write(&path, &body).await?;
                tracing::debug!("Saved image {} to {}", url, path_string);
                paths.insert(path_string);
            }
            Ok((status, _)) => {
                tracing::warn!("Could not download image {}: HTTP {}", url, status);
            }
            Err(e) => {
                tracing::warn!("Could not download image {}: {}", url, e);
            }
        }
    }

    Ok(paths)
}
