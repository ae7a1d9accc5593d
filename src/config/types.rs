use crate::adapters::Backend;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for auction-scraper
///
/// Every section is optional so that a scraper can be configured from the
/// command line alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default, rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub site: SiteOverrides,
    #[serde(default)]
    pub paths: PathOverrides,
}

impl Config {
    /// Minimum delay between requests
    pub fn cooldown(&self) -> Duration {
        Duration::try_from_secs_f64(self.scraper.cooldown_secs).unwrap_or(Duration::ZERO)
    }
}

/// Scraper behavior configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScraperConfig {
    /// Which site to scrape
    pub backend: Option<Backend>,

    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: Option<PathBuf>,

    /// Root directory for archived pages and images
    #[serde(rename = "data-location")]
    pub data_location: Option<PathBuf>,

    /// Minimum time between requests (seconds)
    #[serde(rename = "cooldown-secs", default)]
    pub cooldown_secs: f64,

    /// Inline iframe contents into fetched pages
    #[serde(rename = "resolve-frames", default)]
    pub resolve_frames: bool,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserAgentConfig {
    /// Name of the scraper
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Version of the scraper
    #[serde(default = "default_agent_version")]
    pub version: String,

    /// URL with information about the scraper operator
    #[serde(rename = "contact-url")]
    pub contact_url: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            version: default_agent_version(),
            contact_url: None,
        }
    }
}

fn default_agent_name() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

fn default_agent_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Overrides of a site's base URI and suffix templates
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteOverrides {
    #[serde(rename = "base-uri")]
    pub base_uri: Option<String>,

    #[serde(rename = "auction-suffix")]
    pub auction_suffix: Option<String>,

    #[serde(rename = "profile-suffix")]
    pub profile_suffix: Option<String>,

    #[serde(rename = "search-suffix")]
    pub search_suffix: Option<String>,
}

/// Per-kind archive directories, overriding the data location layout
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathOverrides {
    #[serde(rename = "auction-save-path")]
    pub auction_save_path: Option<PathBuf>,

    #[serde(rename = "profile-save-path")]
    pub profile_save_path: Option<PathBuf>,

    #[serde(rename = "search-save-path")]
    pub search_save_path: Option<PathBuf>,

    #[serde(rename = "image-save-path")]
    pub image_save_path: Option<PathBuf>,
}
