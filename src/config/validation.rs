use crate::adapters::SiteUris;
use crate::config::types::{Config, ScraperConfig, SiteOverrides, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
///
/// Settings that may still come from the command line (backend, database
/// path) are only checked when present.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scraper_config(&config.scraper)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_site_overrides(&config.site)?;

    if let Some(backend) = config.scraper.backend {
        backend.site_uris(&config.site)?;
    }

    Ok(())
}

/// Validates scraper configuration
fn validate_scraper_config(config: &ScraperConfig) -> Result<(), ConfigError> {
    if !config.cooldown_secs.is_finite() || config.cooldown_secs < 0.0 {
        return Err(ConfigError::Validation(format!(
            "cooldown-secs must be a non-negative number, got {}",
            config.cooldown_secs
        )));
    }

    if let Some(path) = &config.database_path {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "database-path cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Name: non-empty, alphanumeric plus hyphens, underscores and dots
    if config.name.is_empty() {
        return Err(ConfigError::Validation(
            "user agent name cannot be empty".to_string(),
        ));
    }

    if !config
        .name
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(ConfigError::Validation(format!(
            "user agent name must contain only alphanumeric characters, '-', '_' and '.', got '{}'",
            config.name
        )));
    }

    if let Some(contact) = &config.contact_url {
        Url::parse(contact)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;
    }

    Ok(())
}

/// Validates the overrides that can be checked without knowing the site
fn validate_site_overrides(site: &SiteOverrides) -> Result<(), ConfigError> {
    let placeholder_rules = [
        ("auction-suffix", &site.auction_suffix, 1),
        ("profile-suffix", &site.profile_suffix, 1),
        ("search-suffix", &site.search_suffix, 2),
    ];
    for (name, suffix, expected) in placeholder_rules {
        if let Some(suffix) = suffix {
            let found = suffix.matches("{}").count();
            if found != expected {
                return Err(ConfigError::Validation(format!(
                    "{} '{}' must contain {} '{{}}' placeholder(s), found {}",
                    name, suffix, expected, found
                )));
            }
        }
    }

    if let Some(base) = &site.base_uri {
        // Minimal valid suffixes, so only the base can fail
        SiteUris::new(base, "/{}", "/{}", "/{}/{}")?;
    }

    Ok(())
}
