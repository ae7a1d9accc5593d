//! Record types produced by site adapters
//!
//! - [`AuctionRecord`] and [`ProfileRecord`] are persisted by the record store
//! - [`SearchResultRef`] / [`SearchResults`] are transient search hits that
//!   drive auction fetches in the bulk pipeline

mod auction;
mod fields;
mod profile;
mod search;

pub use auction::AuctionRecord;
pub use fields::{FieldValue, SiteFields};
pub use profile::ProfileRecord;
pub use search::{SearchResultRef, SearchResults};
