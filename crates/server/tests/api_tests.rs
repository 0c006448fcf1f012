//! HTTP API tests against a seeded store.

mod common;

use axum::http::StatusCode;

use common::{fixtures, TestFixture, SOURCE_ID};

fn titled(id: u64, title: &str, size: u64) -> torrentdb_core::FetchedItem {
    let mut item = fixtures::item(id);
    item.record.title = title.to_string();
    item.record.size_bytes = size;
    item
}

#[tokio::test]
async fn test_health() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/v1/health").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_get_torrent_by_info_hash() {
    let fixture = TestFixture::new();
    fixture.seed(fixtures::items(1..=3));
    let hash = fixtures::info_hash(2).to_hex();

    let response = fixture.get(&format!("/api/v1/torrents/{}", hash)).await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["source_id"], SOURCE_ID);
    assert_eq!(response.body["source_item_id"], 2);
    assert_eq!(response.body["title"], "Torrent 2");
    assert_eq!(response.body["info_hash"], hash.as_str());
    assert_eq!(
        response.body["magnet"],
        format!("magnet:?xt=urn:btih:{}", hash).as_str()
    );
    assert_eq!(response.body["size_bytes"], 3072);
    assert_eq!(response.body["size"], "3.0 KiB");
}

#[tokio::test]
async fn test_get_torrent_uppercase_hash() {
    let fixture = TestFixture::new();
    fixture.seed(fixtures::items(1..=1));
    let hash = fixtures::info_hash(1).to_hex().to_uppercase();

    let response = fixture.get(&format!("/api/v1/torrents/{}", hash)).await;

    assert_status!(response, StatusCode::OK);
}

#[tokio::test]
async fn test_get_unknown_torrent() {
    let fixture = TestFixture::new();
    let hash = fixtures::info_hash(99).to_hex();

    let response = fixture.get(&format!("/api/v1/torrents/{}", hash)).await;

    assert_status!(response, StatusCode::NOT_FOUND);
    assert!(response.body["error"].is_string());
}

#[tokio::test]
async fn test_get_torrent_invalid_hash() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/v1/torrents/not-a-hash").await;

    assert_status!(response, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_default_order() {
    let fixture = TestFixture::new();
    fixture.seed(fixtures::items(1..=5));

    let response = fixture.get("/api/v1/search?query=torrent").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["total"], 5);
    let ids: Vec<u64> = response.body["torrents"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["source_item_id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![5, 4, 3, 2, 1]);
}

#[tokio::test]
async fn test_search_order_and_limit() {
    let fixture = TestFixture::new();
    fixture.seed(vec![
        titled(1, "Linux Mint", 300),
        titled(2, "Linux Debian", 100),
        titled(3, "Linux Arch", 200),
    ]);

    let response = fixture
        .get("/api/v1/search?query=linux&order_by=size&order_direction=desc&limit=2")
        .await;

    assert_status!(response, StatusCode::OK);
    let titles: Vec<&str> = response.body["torrents"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Linux Mint", "Linux Arch"]);

    let response = fixture.get("/api/v1/search?query=linux&order_by=name").await;
    assert_eq!(response.body["torrents"][0]["title"], "Linux Arch");
}

#[tokio::test]
async fn test_search_empty_query() {
    let fixture = TestFixture::new();
    fixture.seed(fixtures::items(1..=3));

    let response = fixture.get("/api/v1/search").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["total"], 0);
}

#[tokio::test]
async fn test_search_invalid_order_field() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/v1/search?query=x&order_by=seeders").await;

    assert_status!(response, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats() {
    let fixture = TestFixture::new();
    fixture.seed(fixtures::items(1..=4));

    let response = fixture.get("/api/v1/stats").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["total_torrents"], 4);
    assert_eq!(response.body["sources"][0]["name"], "rutor");
    assert_eq!(response.body["sources"][0]["torrents"], 4);
    assert_eq!(response.body["sources"][0]["latest_item_id"], 4);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new();
    fixture.seed(fixtures::items(1..=2));

    // Generate at least one request sample
    fixture.get("/api/v1/health").await;
    let response = fixture.get("/metrics").await;

    assert_status!(response, StatusCode::OK);
    assert!(response.text.contains("torrentdb_http_requests_total"));
    assert!(response.text.contains("torrentdb_stored_torrents"));
}
