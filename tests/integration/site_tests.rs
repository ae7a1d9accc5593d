//! End-to-end runs of real site adapters against mock servers

use auction_scraper::config::Config;
use auction_scraper::scraper::open_scraper;
use auction_scraper::storage::RecordStore;
use auction_scraper::Backend;
use serde_json::json;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn catawiki_config(server: &MockServer, dir: &Path) -> Config {
    let mut config = Config::default();
    config.scraper.backend = Some(Backend::Catawiki);
    config.scraper.database_path = Some(dir.join("auctions.db"));
    config.scraper.data_location = Some(dir.join("data"));
    config.site.base_uri = Some(server.uri());
    config
}

fn lot_page(props: serde_json::Value) -> String {
    format!(
        r#"<html><body><div class="lot-details-page-wrapper" data-props="{}"></div></body></html>"#,
        props.to_string().replace('"', "&quot;")
    )
}

async fn mount_catawiki_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/buyer/api/v1/search"))
        .and(query_param("q", "pocket watch"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"lots": [
            {"id": 101, "title": "Pocket watch", "url": format!("{}/l/101", server.uri())}
        ]})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/buyer/api/v1/search"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"lots": []})))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/l/101"))
        .respond_with(ResponseTemplate::new(200).set_body_string(lot_page(json!({
            "lotId": 101,
            "lotTitle": "Pocket watch",
            "description": "Silver   case",
            "sellerInfo": {"id": 7},
            "images": [{"large": format!("{}/img/101/front.jpg", server.uri())}]
        }))))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/buyer/api/v2/lots/101/bidding"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"bidding": {
            "start_bid_amount": 5, "current_bid_amount": 80, "closed": true, "sold": true
        }})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/buyer/api/v1/lots/101/bids"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"meta": {"total": 9}})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/101/front.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\xff\xd8jpeg".to_vec()))
        .mount(server)
        .await;

    let seller = json!({"seller": {"id": 7, "userName": "watchmaker", "score": {"score": 98.0}}});
    Mock::given(method("GET"))
        .and(path("/u/7"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<html><body><div data-react-component="LotsFromSellerSidebar" data-props="{}"></div></body></html>"#,
            seller.to_string().replace('"', "&quot;")
        )))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_catawiki_search_to_db_with_archival() {
    let server = MockServer::start().await;
    mount_catawiki_site(&server).await;
    let temp = TempDir::new().unwrap();

    let mut scraper = open_scraper(&catawiki_config(&server, temp.path())).unwrap();
    let scraped = scraper
        .scrape_search_to_db(&["pocket watch"], None, true, true)
        .await
        .unwrap();

    assert_eq!(scraped.auctions.len(), 1);
    assert_eq!(scraped.profiles.len(), 1);

    let stored = scraper.store().get_auction("101").unwrap().unwrap();
    assert_eq!(stored.title.as_deref(), Some("Pocket watch"));
    assert_eq!(stored.description.as_deref(), Some("Silver case"));
    assert_eq!(stored.latest_price.as_deref(), Some("80"));
    assert_eq!(stored.n_bids, Some(9));
    assert_eq!(stored.site.get("sold").as_bool(), Some(true));

    assert_eq!(stored.image_paths.len(), 1);
    let image = stored.image_paths.iter().next().unwrap();
    assert!(image.ends_with("catawiki_101__img_101_front.jpg"));
    assert_eq!(std::fs::read(image).unwrap(), b"\xff\xd8jpeg");

    let data = temp.path().join("data").join("catawiki");
    assert!(data.join("auctions").join("auction-101.html").is_file());
    assert!(data.join("profiles").join("profile-7.html").is_file());
    assert!(data.join("searches").join("search-pocket watch-1.html").is_file());

    let seller = scraper.store().get_profile("7").unwrap().unwrap();
    assert_eq!(seller.name.as_deref(), Some("watchmaker"));
}

#[tokio::test]
async fn test_catawiki_rescrape_keeps_one_record_and_images() {
    let server = MockServer::start().await;
    mount_catawiki_site(&server).await;
    let temp = TempDir::new().unwrap();
    let config = catawiki_config(&server, temp.path());

    let mut scraper = open_scraper(&config).unwrap();
    let first = scraper.scrape_auction_to_db("101", false, true).await.unwrap();
    drop(scraper);

    // A fresh scraper over the same database and data location
    let mut scraper = open_scraper(&config).unwrap();
    let second = scraper.scrape_auction_to_db("101", false, true).await.unwrap();

    assert_eq!(scraper.store().count_auctions().unwrap(), 1);
    assert_eq!(second.date_created, first.date_created);
    assert!(second.image_paths.is_superset(&first.image_paths));
}

#[tokio::test]
async fn test_rescrape_without_images_keeps_stored_paths() {
    let server = MockServer::start().await;
    mount_catawiki_site(&server).await;
    let temp = TempDir::new().unwrap();
    let config = catawiki_config(&server, temp.path());

    let mut scraper = open_scraper(&config).unwrap();
    let first = scraper.scrape_auction_to_db("101", false, true).await.unwrap();
    assert_eq!(first.image_paths.len(), 1);

    let second = scraper.scrape_auction_to_db("101", false, false).await.unwrap();
    assert_eq!(second.image_paths, first.image_paths);

    let stored = scraper.store().get_auction("101").unwrap().unwrap();
    assert!(stored.image_paths.is_superset(&first.image_paths));
}

#[test]
fn test_missing_backend_fails_setup() {
    let temp = TempDir::new().unwrap();
    let mut config = Config::default();
    config.scraper.database_path = Some(temp.path().join("a.db"));

    assert!(open_scraper(&config).is_err());
}

#[tokio::test]
async fn test_liveauctioneers_cooldown_between_pages() {
    let server = MockServer::start().await;
    let page = |ids: &str| {
        format!(
            r#"<html><body><script data-reactroot="">window.__data={{"search":{{"itemIds":[{}]}},"item":{{"byId":{{"1":{{"title":"Lamp"}}}}}}}};</script></body></html>"#,
            ids
        )
    };
    Mock::given(method("GET"))
        .and(path("/search/"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page("1")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page("")))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let mut config = Config::default();
    config.scraper.backend = Some(Backend::LiveAuctioneers);
    config.scraper.database_path = Some(temp.path().join("la.db"));
    config.scraper.cooldown_secs = 2.0;
    config.site.base_uri = Some(server.uri());

    let mut scraper = open_scraper(&config).unwrap();
    let start = Instant::now();
    let results = scraper.scrape_search("lamp", None, false).await.unwrap();

    assert_eq!(results.ids().collect::<Vec<_>>(), vec!["1"]);
    assert!(start.elapsed() >= Duration::from_secs(2));
}

#[tokio::test]
async fn test_ebay_search_to_db_reads_framed_description() {
    let server = MockServer::start().await;
    let results_page = r#"<html><body><ul class="srp-results">
        <li class="s-item"><a class="s-item__link" href="/itm/Brass-lamp/1234"><h3 class="s-item__title">Brass lamp</h3></a></li>
        </ul></body></html>"#;
    let item_page = r#"<html><body>
        <div id="desc_div"><iframe src="/desc/1234"></iframe></div>
        <div id="JSDF"><script>$rwidgets(["ItemVI",{"itemId":"1234","it":"Brass lamp","entityName":"lampshop","bids":"2","ccode":"USD","bidPriceDouble":"20.0"}]);</script></div>
        </body></html>"#;

    Mock::given(method("GET"))
        .and(path("/sch/i.html"))
        .and(query_param("_pgn", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sch/i.html"))
        .and(query_param("_pgn", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<html><body><ul class="srp-results"></ul></body></html>"#),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/itm/Brass-lamp/1234"))
        .respond_with(ResponseTemplate::new(200).set_body_string(item_page))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/desc/1234"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body><p>Early   electric lamp</p></body></html>"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/usr/lampshop"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><a class="mbg-id">lampshop</a><div class="perctg">98.5% positive feedback</div></body></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let mut config = Config::default();
    config.scraper.backend = Some(Backend::Ebay);
    config.scraper.database_path = Some(temp.path().join("ebay.db"));
    config.site.base_uri = Some(server.uri());

    let mut scraper = open_scraper(&config).unwrap();
    let scraped = scraper
        .scrape_search_to_db(&["brass lamp"], None, false, false)
        .await
        .unwrap();

    assert_eq!(scraped.auctions.len(), 1);
    assert_eq!(scraped.profiles.len(), 1);

    let stored = scraper.store().get_auction("1234").unwrap().unwrap();
    assert_eq!(stored.description.as_deref(), Some("Early electric lamp"));
    assert_eq!(stored.latest_price.as_deref(), Some("20"));
    assert_eq!(stored.seller_id.as_deref(), Some("lampshop"));

    let seller = scraper.store().get_profile("lampshop").unwrap().unwrap();
    assert_eq!(
        seller.site.get("percent_positive_feedback"),
        &auction_scraper::models::FieldValue::Real(98.5)
    );
}
