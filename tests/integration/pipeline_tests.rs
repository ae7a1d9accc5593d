//! Bulk pipeline and de-pagination behaviour against a scripted site

use crate::common::{mock_scraper, MockSite};
use auction_scraper::storage::RecordStore;
use auction_scraper::{ItemKind, ScrapeError};

#[tokio::test]
async fn test_search_scrape_stores_auctions_and_sellers_once() {
    let site = MockSite::new()
        .page("clocks", &[("1", "Mantel clock"), ("2", "Wall clock")])
        .seller("1", "s1")
        .seller("2", "s1");
    let (mut scraper, calls) = mock_scraper(site);

    let scraped = scraper
        .scrape_search_to_db(&["clocks"], None, false, false)
        .await
        .unwrap();

    assert_eq!(scraped.auctions.len(), 2);
    assert_eq!(scraped.profiles.len(), 1);
    assert_eq!(calls.profile_ids(), vec!["s1"]);
    assert_eq!(scraper.store().count_auctions().unwrap(), 2);
    assert_eq!(scraper.store().count_profiles().unwrap(), 1);

    let stored = scraper.store().get_auction("2").unwrap().unwrap();
    assert_eq!(stored.seller_id.as_deref(), Some("s1"));
    assert!(stored.date_created.is_some());
}

#[tokio::test]
async fn test_auctions_without_seller_skip_profiles() {
    let site = MockSite::new()
        .page("vases", &[("1", "Vase"), ("2", "Urn"), ("3", "Jug")])
        .seller("1", "a")
        .seller("3", "b");
    let (mut scraper, calls) = mock_scraper(site);

    let scraped = scraper
        .scrape_search_to_db(&["vases"], None, false, false)
        .await
        .unwrap();

    assert_eq!(scraped.auctions.len(), 3);
    assert_eq!(calls.profile_ids(), vec!["a", "b"]);
}

#[tokio::test]
async fn test_search_retried_until_success() {
    let site = MockSite::new()
        .page("rings", &[("1", "Gold ring"), ("2", "Silver ring")])
        .failing_searches(2);
    let (mut scraper, calls) = mock_scraper(site);

    let scraped = scraper
        .scrape_search_to_db(&["rings"], Some(2), false, false)
        .await
        .unwrap();

    assert_eq!(calls.searches(), 3);
    assert_eq!(scraped.auctions.len(), 2);
}

#[tokio::test]
async fn test_search_gives_up_after_three_attempts() {
    let site = MockSite::new()
        .page("rings", &[("1", "Gold ring")])
        .failing_searches(3);
    let (mut scraper, calls) = mock_scraper(site);

    let err = scraper
        .scrape_search_to_db(&["rings"], None, false, false)
        .await
        .unwrap_err();

    assert!(matches!(err, ScrapeError::NotFound { .. }));
    assert_eq!(calls.searches(), 3);
    assert_eq!(calls.auctions(), 0);
}

#[tokio::test]
async fn test_failed_auction_is_aggregated() {
    let site = MockSite::new()
        .page(
            "coins",
            &[("1", "a"), ("2", "b"), ("3", "c"), ("4", "d"), ("5", "e")],
        )
        .failing_auction("3");
    let (mut scraper, calls) = mock_scraper(site);

    let err = scraper
        .scrape_search_to_db(&["coins"], None, false, false)
        .await
        .unwrap_err();

    let aggregate = match err {
        ScrapeError::Aggregate(aggregate) => aggregate,
        other => panic!("expected an aggregate error, got {:?}", other),
    };
    assert_eq!(aggregate.failures.len(), 1);
    assert_eq!(aggregate.failures[0].kind, ItemKind::Auction);
    assert_eq!(aggregate.failures[0].id, "3");
    assert!(matches!(aggregate.failures[0].error, ScrapeError::Parse { .. }));

    let ids: Vec<&str> = aggregate.auctions.iter().map(|a| a.id()).collect();
    assert_eq!(ids, vec!["1", "2", "4", "5"]);
    assert_eq!(calls.auctions(), 5);

    // Successes stay committed
    assert_eq!(scraper.store().count_auctions().unwrap(), 4);
    assert!(scraper.store().get_auction("3").unwrap().is_none());
}

#[tokio::test]
async fn test_failed_seller_attempted_once() {
    let site = MockSite::new()
        .page("lamps", &[("1", "Desk lamp"), ("2", "Floor lamp")])
        .seller("1", "gone")
        .seller("2", "gone")
        .failing_profile("gone");
    let (mut scraper, calls) = mock_scraper(site);

    let err = scraper
        .scrape_search_to_db(&["lamps"], None, false, false)
        .await
        .unwrap_err();

    let aggregate = match err {
        ScrapeError::Aggregate(aggregate) => aggregate,
        other => panic!("expected an aggregate error, got {:?}", other),
    };
    assert_eq!(aggregate.failures.len(), 1);
    assert_eq!(aggregate.failures[0].kind, ItemKind::Profile);
    assert_eq!(aggregate.auctions.len(), 2);
    assert_eq!(calls.profile_ids(), vec!["gone"]);
    assert_eq!(scraper.store().count_auctions().unwrap(), 2);
}

#[tokio::test]
async fn test_cross_query_duplicates_scraped_once() {
    let site = MockSite::new()
        .page("a", &[("123", "Teapot"), ("1", "Cup")])
        .page("b", &[("123", "Teapot"), ("2", "Saucer")]);
    let (mut scraper, calls) = mock_scraper(site);

    let scraped = scraper
        .scrape_search_to_db(&["a", "b"], None, false, false)
        .await
        .unwrap();

    let ids: Vec<&str> = scraped.auctions.iter().map(|a| a.id()).collect();
    assert_eq!(ids, vec!["123", "1", "2"]);
    assert_eq!(calls.auctions(), 3);
}

#[tokio::test]
async fn test_cross_query_merge_keeps_first_query_entry() {
    let site = MockSite::new()
        .page("a", &[("123", "Teapot")])
        .page("b", &[("123", "Teapot")]);
    let (mut scraper, _) = mock_scraper(site);

    let mut merged = scraper.scrape_search("a", None, false).await.unwrap();
    let second = scraper.scrape_search("b", None, false).await.unwrap();
    merged.merge(second);

    assert_eq!(merged.len(), 1);
    assert_eq!(merged.get("123").unwrap().name, "Teapot (a)");
}

#[tokio::test]
async fn test_depagination_stops_on_page_without_new_ids() {
    let site = MockSite::new()
        .page("maps", &[("1", "x"), ("2", "x"), ("3", "x")])
        .page("maps", &[("3", "x"), ("4", "x")])
        .page("maps", &[("4", "x")])
        .page("maps", &[("5", "never reached")]);
    let (mut scraper, calls) = mock_scraper(site);

    let results = scraper.scrape_search("maps", None, false).await.unwrap();

    assert_eq!(results.ids().collect::<Vec<_>>(), vec!["1", "2", "3", "4"]);
    assert_eq!(calls.searches(), 3);
}

#[tokio::test]
async fn test_depagination_cap_keeps_first_seen() {
    let site = MockSite::new()
        .page("maps", &[("1", "x"), ("2", "x"), ("3", "x")])
        .page("maps", &[("4", "x")]);
    let (mut scraper, calls) = mock_scraper(site);

    let results = scraper.scrape_search("maps", Some(2), false).await.unwrap();

    assert_eq!(results.ids().collect::<Vec<_>>(), vec!["1", "2"]);
    assert_eq!(calls.searches(), 1);
}

#[tokio::test]
async fn test_zero_results_fetches_nothing() {
    let site = MockSite::new().page("maps", &[("1", "x")]);
    let (mut scraper, calls) = mock_scraper(site);

    let results = scraper.scrape_search("maps", Some(0), false).await.unwrap();

    assert!(results.is_empty());
    assert_eq!(calls.searches(), 0);
}

#[tokio::test]
async fn test_empty_search_stores_nothing() {
    let (mut scraper, calls) = mock_scraper(MockSite::new());

    let scraped = scraper
        .scrape_search_to_db(&["nothing"], None, false, false)
        .await
        .unwrap();

    assert!(scraped.auctions.is_empty());
    assert_eq!(calls.searches(), 1);
}

#[tokio::test]
async fn test_save_without_directories_is_rejected() {
    let site = MockSite::new().page("maps", &[("1", "x")]);
    let (mut scraper, calls) = mock_scraper(site);

    let err = scraper
        .scrape_search_to_db(&["maps"], None, true, false)
        .await
        .unwrap_err();
    assert!(matches!(err, ScrapeError::InvalidArgument(_)));

    let err = scraper.scrape_auction("1", false, true).await.unwrap_err();
    assert!(matches!(err, ScrapeError::InvalidArgument(_)));

    assert_eq!(calls.searches(), 0);
    assert_eq!(calls.auctions(), 0);
}

#[tokio::test]
async fn test_single_auction_scrape() {
    let site = MockSite::new().seller("7", "s9").failing_auction("8");
    let (mut scraper, _) = mock_scraper(site);

    let auction = scraper.scrape_auction_to_db("7", false, false).await.unwrap();
    assert_eq!(auction.uri.as_deref(), Some("https://mock.example/lot/7"));
    assert_eq!(scraper.store().count_auctions().unwrap(), 1);
    // The seller is not fetched by single-auction scrapes
    assert_eq!(scraper.store().count_profiles().unwrap(), 0);

    let err = scraper
        .scrape_auction_to_db("https://mock.example/lot/8", false, false)
        .await
        .unwrap_err();
    assert!(matches!(err, ScrapeError::Parse { .. }));

    let err = scraper.scrape_auction("not an id", false, false).await.unwrap_err();
    assert!(matches!(err, ScrapeError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_rescrape_replaces_record() {
    let site = MockSite::new();
    let (mut scraper, _) = mock_scraper(site);

    let first = scraper.scrape_profile_to_db("s1", false).await.unwrap();
    let second = scraper.scrape_profile_to_db("s1", false).await.unwrap();

    assert_eq!(scraper.store().count_profiles().unwrap(), 1);
    assert_eq!(second.date_created, first.date_created);
    assert!(second.date_modified >= second.date_created);
}
