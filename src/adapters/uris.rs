//! URI templates for a site
//!
//! A template is the site's base URI followed by a suffix containing `{}`
//! placeholders, e.g. `https://www.catawiki.com` + `/l/{}`.

use crate::{ConfigError, ConfigResult, Result, ScrapeError};
use url::Url;

/// Default base URI and suffixes of a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteDefaults {
    pub base_uri: &'static str,
    pub auction_suffix: &'static str,
    pub profile_suffix: &'static str,
    pub search_suffix: &'static str,
}

/// Resolved URI templates of one site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteUris {
    base: String,
    auction_template: String,
    profile_template: String,
    search_template: String,
}

impl SiteUris {
    /// Builds the templates, checking the base URI and placeholder counts
    pub fn new(
        base_uri: &str,
        auction_suffix: &str,
        profile_suffix: &str,
        search_suffix: &str,
    ) -> ConfigResult<Self> {
        let parsed = Url::parse(base_uri)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", base_uri, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") || !parsed.has_host() {
            return Err(ConfigError::InvalidUrl(format!(
                "{}: base URI must be http(s) with a host",
                base_uri
            )));
        }

        check_placeholders("auction-suffix", auction_suffix, 1)?;
        check_placeholders("profile-suffix", profile_suffix, 1)?;
        check_placeholders("search-suffix", search_suffix, 2)?;

        let base = base_uri.trim_end_matches('/');
        Ok(Self {
            base: base.to_string(),
            auction_template: format!("{}{}", base, auction_suffix),
            profile_template: format!("{}{}", base, profile_suffix),
            search_template: format!("{}{}", base, search_suffix),
        })
    }

    /// Base URI without a trailing slash
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Resolves an auction id or URI to the auction page URI
    pub fn auction_uri(&self, reference: &str) -> Result<String> {
        resolve_reference(&self.auction_template, reference)
    }

    /// Resolves a profile id or URI to the profile page URI
    pub fn profile_uri(&self, reference: &str) -> Result<String> {
        resolve_reference(&self.profile_template, reference)
    }

    /// URI of one page of search results; pages count from 1
    pub fn search_uri(&self, query: &str, page: u32) -> Result<String> {
        if page < 1 {
            return Err(ScrapeError::InvalidArgument(format!(
                "search page numbers start at 1, got {}",
                page
            )));
        }
        Ok(fill_template(
            &self.search_template,
            &[&encode(query), &page.to_string()],
        ))
    }
}

/// Checks whether a reference is a full URI rather than a bare identifier
pub fn is_uri(reference: &str) -> bool {
    Url::parse(reference)
        .map(|url| url.has_host())
        .unwrap_or(false)
}

fn resolve_reference(template: &str, reference: &str) -> Result<String> {
    if is_uri(reference) {
        return Ok(reference.to_string());
    }
    if reference.is_empty() || reference.chars().any(char::is_whitespace) {
        return Err(ScrapeError::InvalidArgument(format!(
            "'{}' is neither a URI nor a valid identifier",
            reference
        )));
    }
    Ok(fill_template(template, &[&encode(reference)]))
}

fn fill_template(template: &str, values: &[&str]) -> String {
    let mut filled = String::with_capacity(template.len());
    let mut rest = template;
    for value in values {
        match rest.find("{}") {
            Some(pos) => {
                filled.push_str(&rest[..pos]);
                filled.push_str(value);
                rest = &rest[pos + 2..];
            }
            None => break,
        }
    }
    filled.push_str(rest);
    filled
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

fn check_placeholders(name: &str, suffix: &str, expected: usize) -> ConfigResult<()> {
    let found = suffix.matches("{}").count();
    if found != expected {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must contain {} '{{}}' placeholder(s), found {}",
            name, suffix, expected, found
        )));
    }
    Ok(())
}
