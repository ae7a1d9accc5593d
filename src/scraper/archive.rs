//! Raw page and image archival
//!
//! Pages are written as `auction-{id}.html`, `profile-{id}.html` and
//! `search-{query}-{page}.html`; images as
//! `{backend}_{auction_id}_{url path with '/' replaced by '_'}`.

use crate::config::PathOverrides;
use crate::{Result, ScrapeError};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Where each kind of artifact is written
///
/// A `None` directory means that artifact kind cannot be archived.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchivePaths {
    pub auctions: Option<PathBuf>,
    pub profiles: Option<PathBuf>,
    pub searches: Option<PathBuf>,
    pub images: Option<PathBuf>,
}

impl ArchivePaths {
    /// Lays out `{data_location}/{backend}/{auctions,profiles,searches,images}`
    pub fn under(data_location: &Path, backend: &str) -> Self {
        let root = data_location.join(backend);
        Self {
            auctions: Some(root.join("auctions")),
            profiles: Some(root.join("profiles")),
            searches: Some(root.join("searches")),
            images: Some(root.join("images")),
        }
    }

    /// Resolves directories from an optional data location and explicit
    /// per-kind overrides, the overrides taking precedence
    pub fn resolve(data_location: Option<&Path>, backend: &str, overrides: &PathOverrides) -> Self {
        let defaults = data_location
            .map(|location| Self::under(location, backend))
            .unwrap_or_default();

        Self {
            auctions: overrides.auction_save_path.clone().or(defaults.auctions),
            profiles: overrides.profile_save_path.clone().or(defaults.profiles),
            searches: overrides.search_save_path.clone().or(defaults.searches),
            images: overrides.image_save_path.clone().or(defaults.images),
        }
    }
}

/// Writes raw pages and images to disk
#[derive(Debug, Clone)]
pub struct Archive {
    backend: String,
    paths: ArchivePaths,
}

impl Archive {
    /// Creates every configured directory and stores them as absolute paths
    pub fn new(backend: &str, paths: ArchivePaths) -> Result<Self> {
        let prepare = |dir: Option<PathBuf>| -> Result<Option<PathBuf>> {
            match dir {
                Some(dir) => {
                    fs::create_dir_all(&dir)?;
                    Ok(Some(fs::canonicalize(&dir)?))
                }
                None => Ok(None),
            }
        };

        let paths = ArchivePaths {
            auctions: prepare(paths.auctions)?,
            profiles: prepare(paths.profiles)?,
            searches: prepare(paths.searches)?,
            images: prepare(paths.images)?,
        };

        Ok(Self {
            backend: backend.to_string(),
            paths,
        })
    }

    /// An archive with no directories; every save fails
    pub fn disabled(backend: &str) -> Self {
        Self {
            backend: backend.to_string(),
            paths: ArchivePaths::default(),
        }
    }

    pub fn save_auction_page(&self, auction_id: &str, content: &str) -> Result<PathBuf> {
        let dir = require(&self.paths.auctions, "auction")?;
        write_page(dir.join(format!("auction-{}.html", file_safe(auction_id))), content)
    }

    pub fn save_profile_page(&self, profile_id: &str, content: &str) -> Result<PathBuf> {
        let dir = require(&self.paths.profiles, "profile")?;
        write_page(dir.join(format!("profile-{}.html", file_safe(profile_id))), content)
    }

    pub fn save_search_page(&self, query: &str, page: u32, content: &str) -> Result<PathBuf> {
        let dir = require(&self.paths.searches, "search")?;
        write_page(
            dir.join(format!("search-{}-{}.html", file_safe(query), page)),
            content,
        )
    }

    /// Computes where an auction image is cached
    pub fn image_path(&self, auction_id: &str, url: &Url) -> Result<PathBuf> {
        let dir = require(&self.paths.images, "image")?;
        let flattened = url.path().split('/').collect::<Vec<_>>().join("_");
        Ok(dir.join(format!(
            "{}_{}_{}",
            self.backend,
            file_safe(auction_id),
            flattened
        )))
    }

    /// Checks that images can be cached before any scraping starts
    pub fn require_images(&self) -> Result<&Path> {
        require(&self.paths.images, "image")
    }

    /// Checks that pages of every kind can be archived
    pub fn require_pages(&self) -> Result<()> {
        require(&self.paths.auctions, "auction")?;
        require(&self.paths.profiles, "profile")?;
        require(&self.paths.searches, "search")?;
        Ok(())
    }
}

fn require<'a>(dir: &'a Option<PathBuf>, kind: &str) -> Result<&'a Path> {
    dir.as_deref().ok_or_else(|| {
        ScrapeError::InvalidArgument(format!(
            "no {} save path configured; set a data location or an explicit {}-save-path",
            kind, kind
        ))
    })
}

fn write_page(path: PathBuf, content: &str) -> Result<PathBuf> {
    fs::write(&path, content)?;
    tracing::debug!("Saved page to {}", path.display());
    Ok(path)
}

fn file_safe(name: &str) -> String {
    name.replace(['/', '\\'], "_")
}
