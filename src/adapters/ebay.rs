//! ebay.com
//!
//! Current item pages carry their data as `$rwidgets(...)` calls in the
//! inline scripts of `div#JSDF`. Older item pages are read from their
//! markup. Either way the seller's description is served in a separate
//! frame, so item pages are always fetched with frames inlined.

use crate::adapters::html::{digits, element_text, first_attr, first_text};
use crate::adapters::{parse_with_fallbacks, AdapterOptions, ParseStrategy, SiteAdapter, SiteDefaults, SiteUris};
use crate::models::{AuctionRecord, ProfileRecord, SearchResultRef, SearchResults};
use crate::scraper::Fetcher;
use crate::storage::{ColumnSpec, ColumnType, SiteSchema};
use crate::text::normalize;
use crate::{Result, ScrapeError};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use scraper::{Html, Selector};
use std::collections::HashMap;
use url::Url;

pub const BACKEND_NAME: &str = "ebay";

pub const DEFAULTS: SiteDefaults = SiteDefaults {
    base_uri: "https://www.ebay.com",
    auction_suffix: "/itm/{}",
    profile_suffix: "/usr/{}",
    search_suffix: "/sch/i.html?_nkw={}&_pgn={}",
};

const WIDGET_CALL: &str = "$rwidgets(";

/// Widget keys that repeat once per image and are collected as lists
const IMAGE_KEYS: [&str; 2] = ["maxImageUrl", "displayImgUrl"];

const AUCTION_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new("buy_now_price", ColumnType::Text),
    ColumnSpec::new("location", ColumnType::Text),
    ColumnSpec::new("locale", ColumnType::Text),
    ColumnSpec::new("quantity", ColumnType::Integer),
    ColumnSpec::new("video_url", ColumnType::Text),
    ColumnSpec::new("vat_included", ColumnType::Boolean),
    ColumnSpec::new("domain", ColumnType::Text),
];

const PROFILE_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new("n_followers", ColumnType::Integer),
    ColumnSpec::new("n_reviews", ColumnType::Integer),
    ColumnSpec::new("member_since", ColumnType::Timestamp),
    ColumnSpec::new("location", ColumnType::Text),
    ColumnSpec::new("percent_positive_feedback", ColumnType::Real),
];

const ITEM_PAGE_LAYOUTS: &[ParseStrategy<Html, AuctionRecord>] = &[
    ("widget data", parse_widget_item),
    ("classic item markup", parse_classic_item),
];

const MEMBER_PAGE_LAYOUTS: &[ParseStrategy<Html, MemberPage>] =
    &[("member badge", parse_member_page)];

const SEARCH_PAGE_LAYOUTS: &[ParseStrategy<Html, Vec<SearchHit>>] =
    &[("s-item results", parse_search_items)];

pub struct EbayAdapter {
    uris: SiteUris,
    options: AdapterOptions,
}

impl EbayAdapter {
    pub fn new(uris: SiteUris, options: AdapterOptions) -> Self {
        Self { uris, options }
    }
}

#[async_trait]
impl SiteAdapter for EbayAdapter {
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
        let page = fetcher.get_page(uri, true).await?;
        let mut auction = {
            let document = Html::parse_document(&page);
            parse_with_fallbacks(uri, &document, ITEM_PAGE_LAYOUTS)?
        };

        auction.uri = Some(uri.to_string());
        Ok((auction, page))
    }

    async fn fetch_profile(&self, fetcher: &mut Fetcher, uri: &str) -> Result<(ProfileRecord, String)> {
        let member = Url::parse(uri)?
            .path_segments()
            .and_then(|mut segments| segments.nth(1).map(str::to_string))
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ScrapeError::InvalidArgument(format!("{} does not name a member", uri)))?;

        let page = fetcher.get_page(uri, self.options.resolve_frames).await?;
        let details = {
            let document = Html::parse_document(&page);
            parse_with_fallbacks(uri, &document, MEMBER_PAGE_LAYOUTS)?
        };

        let mut profile = details.into_profile(member);
        profile.uri = Some(uri.to_string());
        Ok((profile, page))
    }

    async fn fetch_search_page(&self, fetcher: &mut Fetcher, uri: &str) -> Result<(SearchResults, String)> {
        let page_url = Url::parse(uri)?;
        let page = fetcher.get_page(uri, false).await?;
        let hits = {
            let document = Html::parse_document(&page);
            parse_with_fallbacks(uri, &document, SEARCH_PAGE_LAYOUTS)?
        };

        let mut results = SearchResults::new();
        for hit in hits {
            let item_uri = match page_url.join(&hit.href) {
                Ok(url) => url.to_string(),
                Err(_) => self.uris.auction_uri(&hit.item_id)?,
            };
            results.insert(SearchResultRef::new(hit.item_id, hit.title, item_uri));
        }

        Ok((results, page))
    }
}

/// Values assigned in a page's `$rwidgets(...)` calls
///
/// Nested objects are flattened: every `"key": scalar` pair counts, later
/// calls overriding earlier ones. A literal `null` never overrides a value.
/// Image keys repeat once per image and accumulate into lists instead.
#[derive(Debug, Default)]
struct WidgetValues {
    scalars: HashMap<String, String>,
    lists: HashMap<String, Vec<String>>,
}

impl WidgetValues {
    fn get(&self, key: &str) -> Option<&str> {
        self.scalars.get(key).map(String::as_str)
    }

    fn list(&self, key: &str) -> &[String] {
        self.lists.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    fn absorb_call(&mut self, call: &str) {
        let mut scalars = HashMap::new();
        for (key, value) in scalar_pairs(call) {
            if IMAGE_KEYS.contains(&key.as_str()) {
                self.lists.entry(key).or_default().push(value);
            } else {
                scalars.insert(key, value);
            }
        }

        for (key, value) in scalars {
            if value != "null" {
                self.scalars.insert(key, value);
            }
        }
    }
}

fn widget_values(document: &Html) -> std::result::Result<WidgetValues, String> {
    let selector = Selector::parse("div#JSDF script").map_err(|e| format!("{:?}", e))?;
    let scripts: Vec<String> = document
        .select(&selector)
        .filter(|script| script.value().attr("src").is_none())
        .map(|script| script.text().collect::<String>())
        .filter(|text| text.contains(WIDGET_CALL))
        .collect();

    if scripts.is_empty() {
        return Err("no $rwidgets script in div#JSDF".to_string());
    }

    let mut values = WidgetValues::default();
    for script in &scripts {
        for call in script.split(WIDGET_CALL).skip(1) {
            values.absorb_call(call);
        }
    }
    Ok(values)
}

/// Every `"key": value` pair whose value is a string, number or literal
///
/// String values are unescaped; other scalars keep their source text.
fn scalar_pairs(source: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut rest = source;

    while let Some(start) = rest.find('"') {
        let Some((key, after_key)) = string_literal(&rest[start..]) else {
            break;
        };
        let Some(value_src) = after_key.trim_start().strip_prefix(':') else {
            rest = after_key;
            continue;
        };

        let value_src = value_src.trim_start();
        if value_src.starts_with('"') {
            let Some((value, after_value)) = string_literal(value_src) else {
                break;
            };
            pairs.push((key, value));
            rest = after_value;
        } else if value_src.starts_with(['{', '[']) {
            rest = &value_src[1..];
        } else {
            let end = value_src
                .find(|c: char| matches!(c, ',' | '}' | ']' | ')' | ';') || c.is_whitespace())
                .unwrap_or(value_src.len());
            if end > 0 {
                pairs.push((key, value_src[..end].to_string()));
            }
            rest = &value_src[end..];
        }
    }

    pairs
}

/// Splits a leading double-quoted literal off `s`
///
/// Returns the unescaped contents and the text after the closing quote.
fn string_literal(s: &str) -> Option<(String, &str)> {
    let body = s.strip_prefix('"')?;
    let mut escaped = false;
    for (i, c) in body.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '"' {
            let literal = &s[..i + 2];
            let value = serde_json::from_str::<String>(literal).unwrap_or_else(|_| body[..i].to_string());
            return Some((value, &body[i + 1..]));
        }
    }
    None
}

/// Full-size image URLs, falling back per image to the display size
fn widget_image_urls(values: &WidgetValues) -> Vec<String> {
    let max = values.list(IMAGE_KEYS[0]);
    let display = values.list(IMAGE_KEYS[1]);

    let urls: Vec<&String> = if !max.is_empty() && !display.is_empty() {
        max.iter()
            .zip(display)
            .map(|(max, display)| if max != "null" { max } else { display })
            .collect()
    } else if !max.is_empty() {
        max.iter().collect()
    } else {
        display.iter().collect()
    };

    urls.into_iter()
        .filter(|url| url.as_str() != "null")
        .cloned()
        .collect()
}

fn millis_timestamp(millis: &str) -> Option<DateTime<Utc>> {
    let millis = millis.trim().parse().ok()?;
    Utc.timestamp_millis_opt(millis).single()
}

/// A price as the decimal string of its numeric value
fn price(raw: &str) -> Option<String> {
    raw.trim().parse::<f64>().ok().map(|p| p.to_string())
}

/// Text of the page held by the first frame matching `selector`
///
/// Inlined frame content is kept as raw markup inside the iframe element,
/// so it is parsed once more to get at its text.
fn frame_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    let frame = document.select(&selector).next()?;
    let markup = frame.text().collect::<String>();

    let content = Html::parse_fragment(&markup);
    let text = content.root_element().text().collect::<Vec<_>>().join("\n");
    let text = normalize(&text);
    (!text.is_empty()).then_some(text)
}

fn parse_widget_item(document: &Html) -> std::result::Result<AuctionRecord, String> {
    let values = widget_values(document)?;
    let item_id = values.get("itemId").ok_or("widget data has no itemId")?;
    let title = values
        .get("it")
        .or_else(|| values.get("kw"))
        .ok_or("widget data has no title (it or kw)")?;

    let mut auction = AuctionRecord::new(item_id);
    auction.title = Some(normalize(title));
    auction.description = frame_text(document, "div#desc_div iframe");
    auction.seller_id = values.get("entityName").map(str::to_string);
    auction.start_time = values.get("startTime").and_then(millis_timestamp);
    auction.end_time = values.get("endTime").and_then(millis_timestamp);
    auction.n_bids = values.get("bids").and_then(|bids| bids.parse().ok());
    auction.currency = values.get("ccode").map(str::to_string);
    auction.latest_price = values.get("bidPriceDouble").and_then(price);
    auction.image_urls = widget_image_urls(&values);

    auction
        .site
        .set("buy_now_price", values.get("binPriceDouble").and_then(price));
    auction.site.set("locale", values.get("locale"));
    auction.site.set(
        "quantity",
        values.get("totalQty").and_then(|qty| qty.parse::<i64>().ok()),
    );
    auction.site.set("video_url", values.get("videoUrl"));
    auction.site.set(
        "vat_included",
        values.get("vatIncluded").and_then(|vat| match vat {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }),
    );
    auction.site.set("domain", values.get("currentDomain"));

    Ok(auction)
}

fn parse_classic_item(document: &Html) -> std::result::Result<AuctionRecord, String> {
    let item_id = first_text(document, "div#descItemNumber")
        .and_then(|number| digits(&number))
        .ok_or("no item number")?;
    let title = first_text(document, "h1#itemTitle").ok_or("no item title")?;
    let title = title.strip_prefix("Details about").unwrap_or(&title);

    let mut auction = AuctionRecord::new(item_id.to_string());
    auction.title = Some(normalize(title));
    auction.description = frame_text(document, "div#desc_div iframe");
    auction.seller_id = first_text(document, "span.mbg-nw");
    auction.n_bids = first_text(document, "#vi-VR-bid-lnk")
        .and_then(|bids| digits(&bids))
        .and_then(|n| u32::try_from(n).ok());
    auction.currency = first_attr(document, r#"[itemprop="priceCurrency"]"#, "content");
    auction.latest_price =
        first_attr(document, r#"[itemprop="price"]"#, "content").and_then(|p| price(&p));
    auction.image_urls = first_attr(document, "img#icImg", "src").into_iter().collect();

    auction.site.set(
        "location",
        first_text(document, r#"[itemprop="availableAtOrFrom"]"#),
    );

    Ok(auction)
}

/// Fields read off a member page
#[derive(Debug, Clone, PartialEq)]
struct MemberPage {
    name: Option<String>,
    description: Option<String>,
    location: Option<String>,
    n_followers: Option<i64>,
    n_reviews: Option<i64>,
    percent_positive_feedback: Option<f64>,
    member_since: Option<DateTime<Utc>>,
}

impl MemberPage {
    fn into_profile(self, member: String) -> ProfileRecord {
        let mut profile = ProfileRecord::new(member);
        profile.name = self.name;
        profile.description = self.description;
        profile.site.set("n_followers", self.n_followers);
        profile.site.set("n_reviews", self.n_reviews);
        profile.site.set("member_since", self.member_since);
        profile.site.set("location", self.location);
        profile
            .site
            .set("percent_positive_feedback", self.percent_positive_feedback);
        profile
    }
}

fn parse_member_page(document: &Html) -> std::result::Result<MemberPage, String> {
    let name = first_text(document, ".mbg-id").ok_or("no member badge")?;

    let percent_positive_feedback = first_text(document, ".perctg").and_then(|text| {
        let number: String = text
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        number.parse().ok()
    });

    let member_since = first_text(document, "#member_info").and_then(|info| {
        let (_, since) = info.split_once("since:")?;
        let date = since.split_whitespace().take(3).collect::<Vec<_>>().join(" ");
        let day = NaiveDate::parse_from_str(&date, "%b %d, %Y").ok()?;
        Some(day.and_hms_opt(0, 0, 0)?.and_utc())
    });

    Ok(MemberPage {
        name: Some(name),
        description: first_text(document, "#user_bio").map(|bio| normalize(&bio)),
        location: first_text(document, ".mem_loc"),
        n_followers: first_text(document, r#"[class*="followers"]"#)
            .and_then(|text| text.split_whitespace().next().and_then(digits)),
        n_reviews: first_text(document, ".mbg-l a").and_then(|text| digits(&text)),
        percent_positive_feedback,
        member_since,
    })
}

#[derive(Debug, Clone, PartialEq)]
struct SearchHit {
    item_id: String,
    title: String,
    href: String,
}

fn parse_search_items(document: &Html) -> std::result::Result<Vec<SearchHit>, String> {
    let list_selector = Selector::parse("ul.srp-results").map_err(|e| format!("{:?}", e))?;
    let item_selector = Selector::parse("li.s-item").map_err(|e| format!("{:?}", e))?;
    let link_selector = Selector::parse("a.s-item__link").map_err(|e| format!("{:?}", e))?;
    let title_selector = Selector::parse(".s-item__title").map_err(|e| format!("{:?}", e))?;

    let items: Vec<_> = document.select(&item_selector).collect();
    if items.is_empty() && document.select(&list_selector).next().is_none() {
        return Err("no result list".to_string());
    }

    let mut hits = Vec::new();
    for item in items {
        let Some(href) = item
            .select(&link_selector)
            .next()
            .and_then(|link| link.value().attr("href"))
        else {
            continue;
        };
        let Some(item_id) = item_id_from_href(href) else {
            continue;
        };
        let title = item
            .select(&title_selector)
            .next()
            .map(element_text)
            .unwrap_or_default();
        hits.push(SearchHit {
            item_id,
            title,
            href: href.to_string(),
        });
    }
    Ok(hits)
}

/// Item number of an item link, e.g. `/itm/Brass-lamp/1234?hash=x` -> `1234`
fn item_id_from_href(href: &str) -> Option<String> {
    let path = href.split(['?', '#']).next()?;
    let mut segments = path.split('/').skip_while(|segment| *segment != "itm").skip(1);
    segments
        .filter(|segment| !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()))
        .last()
        .map(str::to_string)
}
