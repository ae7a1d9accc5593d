use crate::models::SiteFields;
use crate::text::{escape_join, escape_split};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// An auction (lot) scraped from a listing site
#[derive(Debug, Clone, PartialEq)]
pub struct AuctionRecord {
    id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub uri: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub n_bids: Option<u32>,
    /// ISO 4217 currency code
    pub currency: Option<String>,
    /// Prices are kept as the decimal string the site reported
    pub latest_price: Option<String>,
    pub starting_price: Option<String>,
    pub image_urls: Vec<String>,
    pub image_paths: BTreeSet<String>,
    pub seller_id: Option<String>,
    pub winner_id: Option<String>,
    pub date_created: Option<DateTime<Utc>>,
    pub date_modified: Option<DateTime<Utc>>,
    pub site: SiteFields,
}

impl AuctionRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            description: None,
            uri: None,
            start_time: None,
            end_time: None,
            n_bids: None,
            currency: None,
            latest_price: None,
            starting_price: None,
            image_urls: Vec::new(),
            image_paths: BTreeSet::new(),
            seller_id: None,
            winner_id: None,
            date_created: None,
            date_modified: None,
            site: SiteFields::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Space-joined image URLs, as stored in the `image_urls` column
    pub fn image_urls_wire(&self) -> String {
        self.image_urls.join(" ")
    }

    pub fn set_image_urls_wire(&mut self, wire: &str) {
        self.image_urls = wire.split(' ').filter(|s| !s.is_empty()).map(String::from).collect();
    }

    /// Colon-joined image paths with `:` and `\` escaped, as stored in the
    /// `image_paths` column
    pub fn image_paths_wire(&self) -> String {
        escape_join(self.image_paths.iter().map(String::as_str), ':')
    }

    pub fn set_image_paths_wire(&mut self, wire: &str) {
        self.image_paths = escape_split(wire, ':')
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect();
    }
}
