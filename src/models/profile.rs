use crate::models::SiteFields;
use chrono::{DateTime, Utc};

/// A seller (or buyer) profile scraped from a listing site
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRecord {
    id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub uri: Option<String>,
    pub date_created: Option<DateTime<Utc>>,
    pub date_modified: Option<DateTime<Utc>>,
    /// Reputation data and other site-specific columns
    pub site: SiteFields,
}

impl ProfileRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            description: None,
            uri: None,
            date_created: None,
            date_modified: None,
            site: SiteFields::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}
