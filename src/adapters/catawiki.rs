//! catawiki.com
//!
//! Lot and seller pages embed their data as JSON in `data-props`
//! attributes. Bidding state and bid counts come from the buyer API.

use crate::adapters::json::{bool_at, data_props, int_at, real_at, text_at, time_at};
use crate::adapters::{parse_with_fallbacks, AdapterOptions, ParseStrategy, SiteAdapter, SiteDefaults, SiteUris};
use crate::models::{AuctionRecord, ProfileRecord, SearchResultRef, SearchResults};
use crate::scraper::Fetcher;
use crate::storage::{ColumnSpec, ColumnType, SiteSchema};
use crate::text::normalize;
use crate::{Result, ScrapeError};
use async_trait::async_trait;
use scraper::Html;
use serde_json::{Map, Value};

pub const BACKEND_NAME: &str = "catawiki";

pub const DEFAULTS: SiteDefaults = SiteDefaults {
    base_uri: "https://www.catawiki.com",
    auction_suffix: "/l/{}",
    profile_suffix: "/u/{}",
    search_suffix: "/buyer/api/v1/search?q={}&page={}",
};

const CURRENCY: &str = "EUR";

const AUCTION_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new("subtitle", ColumnType::Text),
    ColumnSpec::new("lot_details", ColumnType::Text),
    ColumnSpec::new("expert_estimate_max", ColumnType::Integer),
    ColumnSpec::new("expert_estimate_min", ColumnType::Integer),
    ColumnSpec::new("reserve_price_met", ColumnType::Boolean),
    ColumnSpec::new("closed", ColumnType::Boolean),
    ColumnSpec::new("sold", ColumnType::Boolean),
];

const PROFILE_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new("member_since", ColumnType::Timestamp),
    ColumnSpec::new("feedback_score", ColumnType::Real),
    ColumnSpec::new("positive_reviews", ColumnType::Integer),
    ColumnSpec::new("neutral_reviews", ColumnType::Integer),
    ColumnSpec::new("negative_reviews", ColumnType::Integer),
    ColumnSpec::new("location", ColumnType::Text),
];

const LOT_PAGE_LAYOUTS: &[ParseStrategy<Html, AuctionRecord>] =
    &[("lot details props", parse_lot_details_props)];

const SELLER_PAGE_LAYOUTS: &[ParseStrategy<Html, ProfileRecord>] =
    &[("seller sidebar props", parse_seller_sidebar_props)];

pub struct CatawikiAdapter {
    uris: SiteUris,
    options: AdapterOptions,
}

impl CatawikiAdapter {
    pub fn new(uris: SiteUris, options: AdapterOptions) -> Self {
        Self { uris, options }
    }

    /// Adds bidding state and bid count from the buyer API
    async fn enrich_bidding(&self, fetcher: &mut Fetcher, auction: &mut AuctionRecord) -> Result<()> {
        let bidding_uri = format!(
            "{}/buyer/api/v2/lots/{}/bidding?currency_code={}",
            self.uris.base(),
            auction.id(),
            CURRENCY
        );
        let bidding: Value = fetcher.get_json(&bidding_uri).await?;

        auction.starting_price = text_at(&bidding, "/bidding/start_bid_amount");
        auction.latest_price = text_at(&bidding, "/bidding/current_bid_amount");
        auction.start_time = time_at(&bidding, "/bidding/bidding_start_time");
        auction.end_time = time_at(&bidding, "/bidding/bidding_end_time");
        auction
            .site
            .set("reserve_price_met", bool_at(&bidding, "/bidding/reserve_price_met"));
        auction.site.set("closed", bool_at(&bidding, "/bidding/closed"));
        auction.site.set("sold", bool_at(&bidding, "/bidding/sold"));

        let bids_uri = format!(
            "{}/buyer/api/v1/lots/{}/bids?currency={}",
            self.uris.base(),
            auction.id(),
            CURRENCY
        );
        let bids: Value = fetcher.get_json(&bids_uri).await?;
        auction.n_bids = int_at(&bids, "/meta/total").and_then(|n| u32::try_from(n).ok());

        Ok(())
    }
}

#[async_trait]
impl SiteAdapter for CatawikiAdapter {
    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn schema(&self) -> SiteSchema {
        SiteSchema::for_backend(BACKEND_NAME, AUCTION_COLUMNS, PROFILE_COLUMNS)
    }

    fn uris(&self) -> &SiteUris {
        &self.uris
    }

    async fn fetch_auction(&self, fetcher: &mut Fetcher, uri: &str) -> Result<(AuctionRecord, String)> {
        let page = fetcher.get_page(uri, self.options.resolve_frames).await?;
        let mut auction = {
            let document = Html::parse_document(&page);
            parse_with_fallbacks(uri, &document, LOT_PAGE_LAYOUTS)?
        };

        self.enrich_bidding(fetcher, &mut auction).await?;
        auction.uri = Some(uri.to_string());
        Ok((auction, page))
    }

    async fn fetch_profile(&self, fetcher: &mut Fetcher, uri: &str) -> Result<(ProfileRecord, String)> {
        let page = fetcher.get_page(uri, self.options.resolve_frames).await?;
        let mut profile = {
            let document = Html::parse_document(&page);
            parse_with_fallbacks(uri, &document, SELLER_PAGE_LAYOUTS)?
        };

        profile.uri = Some(uri.to_string());
        Ok((profile, page))
    }

    async fn fetch_search_page(&self, fetcher: &mut Fetcher, uri: &str) -> Result<(SearchResults, String)> {
        let body = fetcher.get_text(uri).await?;
        let data: Value = serde_json::from_str(&body)
            .map_err(|e| ScrapeError::parse(uri, format!("invalid search JSON: {}", e)))?;
        let results = parse_search_lots(&data, &self.uris).map_err(|message| ScrapeError::parse(uri, message))?;
        Ok((results, body))
    }
}

fn parse_lot_details_props(document: &Html) -> std::result::Result<AuctionRecord, String> {
    let data = data_props(document, "div.lot-details-page-wrapper[data-props]")?;
    let lot_id = text_at(&data, "/lotId").ok_or("data-props has no lotId")?;

    let mut auction = AuctionRecord::new(lot_id);
    auction.currency = Some(CURRENCY.to_string());
    auction.title = text_at(&data, "/lotTitle");
    auction.description = text_at(&data, "/description").map(|d| normalize(&d));
    auction.seller_id = text_at(&data, "/sellerInfo/id");

    if let Some(images) = data.pointer("/images").and_then(Value::as_array) {
        auction.image_urls = images
            .iter()
            .filter_map(|image| image.get("large")?.as_str().map(String::from))
            .collect();
    }

    auction.site.set("subtitle", text_at(&data, "/lotSubtitle"));
    auction.site.set("lot_details", lot_details(&data));
    auction
        .site
        .set("expert_estimate_max", int_at(&data, "/expertsEstimate/max"));
    auction
        .site
        .set("expert_estimate_min", int_at(&data, "/expertsEstimate/min"));

    Ok(auction)
}

/// Flattens the lot detail list into one JSON object of name to value
fn lot_details(data: &Value) -> Option<String> {
    let specs = data.pointer("/specifications")?.as_array()?;
    let details: Map<String, Value> = specs
        .iter()
        .filter_map(|spec| {
            let name = spec.get("name")?.as_str()?;
            Some((name.to_string(), spec.get("value")?.clone()))
        })
        .collect();
    Some(Value::Object(details).to_string())
}

fn parse_seller_sidebar_props(document: &Html) -> std::result::Result<ProfileRecord, String> {
    let data = data_props(
        document,
        r#"div[data-react-component="LotsFromSellerSidebar"][data-props]"#,
    )?;
    let seller_id = text_at(&data, "/seller/id").ok_or("data-props has no seller id")?;

    let mut profile = ProfileRecord::new(seller_id);
    profile.name = text_at(&data, "/seller/userName");

    profile.site.set("member_since", time_at(&data, "/seller/createdAt"));
    profile.site.set("feedback_score", real_at(&data, "/seller/score/score"));
    profile
        .site
        .set("positive_reviews", int_at(&data, "/seller/score/positiveCount"));
    profile
        .site
        .set("neutral_reviews", int_at(&data, "/seller/score/neutralCount"));
    profile
        .site
        .set("negative_reviews", int_at(&data, "/seller/score/negativeCount"));
    profile.site.set(
        "location",
        data.pointer("/seller/address")
            .filter(|address| !address.is_null())
            .map(Value::to_string),
    );

    Ok(profile)
}

fn parse_search_lots(data: &Value, uris: &SiteUris) -> std::result::Result<SearchResults, String> {
    let lots = data
        .get("lots")
        .and_then(Value::as_array)
        .ok_or("search response has no lots list")?;

    let mut results = SearchResults::new();
    for lot in lots {
        let Some(id) = text_at(lot, "/id") else {
            continue;
        };
        let title = text_at(lot, "/title").unwrap_or_default();
        let url = match text_at(lot, "/url") {
            Some(url) => url,
            None => uris.auction_uri(&id).map_err(|e| e.to_string())?,
        };
        results.insert(SearchResultRef::new(id, title, url));
    }
    Ok(results)
}
