//! liveauctioneers.com
//!
//! Item and search pages carry the site's client state as a
//! `window.__data=...;` script. Auctioneer pages are parsed from their
//! markup.

use crate::adapters::html::{digits, element_text, first_text};
use crate::adapters::json::{int_at, pointer_token, text_at, time_at};
use crate::adapters::{parse_with_fallbacks, AdapterOptions, ParseStrategy, SiteAdapter, SiteDefaults, SiteUris};
use crate::models::{AuctionRecord, ProfileRecord, SearchResultRef, SearchResults};
use crate::scraper::Fetcher;
use crate::storage::{ColumnSpec, ColumnType, SiteSchema};
use crate::text::normalize;
use crate::{Result, ScrapeError};
use async_trait::async_trait;
use scraper::{Html, Selector};
use serde_json::Value;
use url::Url;

pub const BACKEND_NAME: &str = "liveauctioneers";

pub const DEFAULTS: SiteDefaults = SiteDefaults {
    base_uri: "https://www.liveauctioneers.com",
    auction_suffix: "/item/{}",
    profile_suffix: "/auctioneer/{}",
    search_suffix: "/search/?keyword={}&page={}",
};

const CURRENCY: &str = "USD";
const DATA_PREFIX: &str = "window.__data=";

const AUCTION_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new("location", ColumnType::Text),
    ColumnSpec::new("lot_number", ColumnType::Integer),
    ColumnSpec::new("condition", ColumnType::Text),
    ColumnSpec::new("high_bid_estimate", ColumnType::Text),
    ColumnSpec::new("low_bid_estimate", ColumnType::Text),
];

const PROFILE_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new("n_followers", ColumnType::Integer),
    ColumnSpec::new("n_ratings", ColumnType::Integer),
    ColumnSpec::new("rating_out_of_5", ColumnType::Real),
    ColumnSpec::new("location", ColumnType::Text),
];

const DATA_SCRIPT_LAYOUTS: &[ParseStrategy<Html, Value>] = &[
    ("reactroot data script", data_from_reactroot_script),
    ("inline data script", data_from_any_script),
];

const AUCTIONEER_PAGE_LAYOUTS: &[ParseStrategy<Html, AuctioneerPage>] =
    &[("auctioneer page", parse_auctioneer_page)];

pub struct LiveAuctioneersAdapter {
    uris: SiteUris,
    options: AdapterOptions,
}

impl LiveAuctioneersAdapter {
    pub fn new(uris: SiteUris, options: AdapterOptions) -> Self {
        Self { uris, options }
    }
}

#[async_trait]
impl SiteAdapter for LiveAuctioneersAdapter {
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
        let page_url = Url::parse(uri)?;
        let lot_id = path_id(&page_url)
            .and_then(|segment| segment.split('_').next())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ScrapeError::InvalidArgument(format!("{} does not name an item", uri)))?
            .to_string();

        let page = fetcher.get_page(uri, self.options.resolve_frames).await?;
        let (data, image_urls) = {
            let document = Html::parse_document(&page);
            let data = parse_with_fallbacks(uri, &document, DATA_SCRIPT_LAYOUTS)?;
            (data, thumbnail_image_urls(&document, &page_url))
        };

        let mut auction =
            auction_from_data(&data, &lot_id).map_err(|message| ScrapeError::parse(uri, message))?;
        auction.image_urls = image_urls;
        auction.uri = Some(uri.to_string());
        Ok((auction, page))
    }

    async fn fetch_profile(&self, fetcher: &mut Fetcher, uri: &str) -> Result<(ProfileRecord, String)> {
        let profile_id = path_id(&Url::parse(uri)?)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                ScrapeError::InvalidArgument(format!("{} does not name an auctioneer", uri))
            })?
            .to_string();

        let page = fetcher.get_page(uri, self.options.resolve_frames).await?;
        let details = {
            let document = Html::parse_document(&page);
            parse_with_fallbacks(uri, &document, AUCTIONEER_PAGE_LAYOUTS)?
        };

        let mut profile = details.into_profile(profile_id);
        profile.uri = Some(uri.to_string());
        Ok((profile, page))
    }

    async fn fetch_search_page(&self, fetcher: &mut Fetcher, uri: &str) -> Result<(SearchResults, String)> {
        let page = fetcher.get_page(uri, false).await?;
        let data = {
            let document = Html::parse_document(&page);
            parse_with_fallbacks(uri, &document, DATA_SCRIPT_LAYOUTS)?
        };

        let item_ids = match data.pointer("/search/itemIds") {
            Some(Value::Array(ids)) => ids.clone(),
            Some(Value::Null) | None => Vec::new(),
            Some(_) => return Err(ScrapeError::parse(uri, "search itemIds is not a list")),
        };

        let mut results = SearchResults::new();
        for id in item_ids {
            let id = match id {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                _ => continue,
            };
            let title = text_at(&data, &format!("/item/byId/{}/title", pointer_token(&id)))
                .ok_or_else(|| ScrapeError::parse(uri, format!("search hit {} has no item", id)))?;
            let auction_uri = self.uris.auction_uri(&id)?;
            results.insert(SearchResultRef::new(id, title, auction_uri));
        }

        Ok((results, page))
    }
}

/// Second path segment, e.g. `123_vase` of `/item/123_vase`
fn path_id(url: &Url) -> Option<&str> {
    url.path_segments()?.nth(1)
}

fn data_from_reactroot_script(document: &Html) -> std::result::Result<Value, String> {
    let selector = Selector::parse("script[data-reactroot]").map_err(|e| format!("{:?}", e))?;
    let script = document
        .select(&selector)
        .next()
        .ok_or("no script with data-reactroot")?;
    window_data_json(&script.text().collect::<String>())
}

fn data_from_any_script(document: &Html) -> std::result::Result<Value, String> {
    let selector = Selector::parse("script").map_err(|e| format!("{:?}", e))?;
    document
        .select(&selector)
        .map(|script| script.text().collect::<String>())
        .find(|text| text.trim_start().starts_with(DATA_PREFIX))
        .ok_or_else(|| format!("no script starting with {}", DATA_PREFIX))
        .and_then(|text| window_data_json(&text))
}

/// Turns `window.__data={...};` into JSON
fn window_data_json(script: &str) -> std::result::Result<Value, String> {
    let body = script
        .trim()
        .strip_prefix(DATA_PREFIX)
        .and_then(|rest| rest.strip_suffix(';'))
        .ok_or_else(|| format!("script is not a {}...; assignment", DATA_PREFIX))?;
    serde_json::from_str(&undefined_to_null(body)).map_err(|e| format!("invalid state JSON: {}", e))
}

/// Replaces bare `undefined` tokens, leaving string contents alone
fn undefined_to_null(script: &str) -> String {
    const UNDEFINED: &str = "undefined";
    let mut out = String::with_capacity(script.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut rest = script;

    while let Some(c) = rest.chars().next() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        } else if rest.starts_with(UNDEFINED) {
            out.push_str("null");
            rest = &rest[UNDEFINED.len()..];
            continue;
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }

    out
}

fn auction_from_data(data: &Value, lot_id: &str) -> std::result::Result<AuctionRecord, String> {
    let key = pointer_token(lot_id);
    let item = data
        .pointer(&format!("/item/byId/{}", key))
        .ok_or_else(|| format!("no item {} in page state", lot_id))?;
    let null = Value::Null;
    let detail = data.pointer(&format!("/itemDetail/byId/{}", key)).unwrap_or(&null);
    let bidding = data.pointer(&format!("/biddingInfo/byId/{}", key)).unwrap_or(&null);
    let catalog = text_at(item, "/catalogId")
        .and_then(|id| data.pointer(&format!("/catalog/byId/{}", pointer_token(&id))))
        .unwrap_or(&null);
    let seller_id = text_at(item, "/sellerId");
    let seller = seller_id
        .as_deref()
        .and_then(|id| data.pointer(&format!("/seller/byId/{}", pointer_token(id))))
        .unwrap_or(&null);

    let mut auction = AuctionRecord::new(lot_id);
    auction.title = text_at(item, "/title");
    auction.description = text_at(detail, "/description").map(|d| normalize(&d));
    auction.start_time = time_at(item, "/publishDate");
    auction.end_time = time_at(catalog, "/saleStartTs");
    auction.n_bids = int_at(bidding, "/bidCount").and_then(|n| u32::try_from(n).ok());
    auction.currency = Some(CURRENCY.to_string());
    auction.latest_price = text_at(bidding, "/salePrice");
    auction.starting_price = text_at(item, "/startPrice");
    auction.seller_id = seller_id;

    let location = ["/address", "/address2", "/city", "/country"]
        .iter()
        .filter_map(|field| text_at(seller, field))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    auction.site.set("location", Some(location).filter(|l| !l.is_empty()));
    auction.site.set(
        "lot_number",
        text_at(item, "/lotNumber").and_then(|lot| digits(&lot)),
    );
    auction.site.set("condition", text_at(detail, "/conditionReport"));
    auction
        .site
        .set("high_bid_estimate", text_at(item, "/highBidEstimate"));
    auction.site.set("low_bid_estimate", text_at(item, "/lowBidEstimate"));

    Ok(auction)
}

/// Full-size image URLs from the item's thumbnail strip
fn thumbnail_image_urls(document: &Html, page_url: &Url) -> Vec<String> {
    let Ok(selector) = Selector::parse(r#"img[class*="Thumbnail__StyledThumbnailImage"]"#) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|img| img.value().attr("src"))
        .filter_map(|src| page_url.join(src).ok())
        .filter_map(|url| {
            let url = url.to_string();
            let (stem, _) = url.rsplit_once('.')?;
            Some(format!("{}.jpg", stem))
        })
        .collect()
}

/// Fields read off an auctioneer page
#[derive(Debug, Clone, PartialEq)]
struct AuctioneerPage {
    name: Option<String>,
    description: Option<String>,
    location: Option<String>,
    n_followers: i64,
    n_ratings: i64,
    rating_out_of_5: Option<f64>,
}

impl AuctioneerPage {
    fn into_profile(self, profile_id: String) -> ProfileRecord {
        let mut profile = ProfileRecord::new(profile_id);
        profile.name = self.name;
        profile.description = self.description;
        profile.site.set("n_followers", self.n_followers);
        profile.site.set("n_ratings", self.n_ratings);
        profile.site.set("rating_out_of_5", self.rating_out_of_5);
        profile.site.set("location", self.location);
        profile
    }
}

fn parse_auctioneer_page(document: &Html) -> std::result::Result<AuctioneerPage, String> {
    let followers = first_text(document, r#"div[class*="followers"]"#)
        .ok_or("no followers counter")?;
    let n_followers = followers
        .split_whitespace()
        .next()
        .and_then(digits)
        .ok_or_else(|| format!("unreadable follower count '{}'", followers))?;

    let (rating_out_of_5, n_ratings) = rating_summary(document)?;

    Ok(AuctioneerPage {
        name: first_text(document, r#"span[class*="titleName"]"#),
        description: first_text(document, r#"div[class*="seller-about-text"]"#).map(|d| normalize(&d)),
        location: first_text(document, r#"div[class*="Address__StyledAddress"]"#),
        n_followers,
        n_ratings,
        rating_out_of_5,
    })
}

/// Mean star rating and total rating count
///
/// The ratings counter lists counts as `(n)` per star level, highest first;
/// the last five are the 5..1 star counts.
fn rating_summary(document: &Html) -> std::result::Result<(Option<f64>, i64), String> {
    let counter_selector = Selector::parse(r#"div[class*="ratingsCounter"]"#).map_err(|e| format!("{:?}", e))?;
    let count_selector = Selector::parse(r#"span[class*="blue"]"#).map_err(|e| format!("{:?}", e))?;

    let counter = document
        .select(&counter_selector)
        .next()
        .ok_or("no ratings counter")?;
    let counts: Vec<i64> = counter
        .select(&count_selector)
        .filter_map(|span| {
            let text = element_text(span);
            let inner = text.split_once('(')?.1.split_once(')')?.0.to_string();
            digits(&inner)
        })
        .collect();

    if counts.len() < 5 {
        return Err(format!("expected 5 rating counts, found {}", counts.len()));
    }

    let mut weighted = 0;
    let mut total = 0;
    for (stars, count) in (1..=5).zip(counts.iter().rev()) {
        weighted += stars * count;
        total += count;
    }

    let mean = (total > 0).then(|| (weighted as f64 / total as f64 * 10.0).round() / 10.0);
    Ok((mean, total))
}
