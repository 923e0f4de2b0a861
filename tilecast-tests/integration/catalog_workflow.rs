//! Catalog refresh, probing, resync and fallback over HTTP.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::{Value, json};
use tilecast_core::catalog::{FeedEndpoint, HttpCatalogFeed, export_catalog};
use tilecast_core::config::{FeedConfig, ProbeConfig};
use tilecast_core::{AvailabilityProbe, CatalogError, CatalogService, TransportType};

use crate::feed_server::FeedServer;

fn streams_document() -> Value {
    json!([
        {
            "name": "News",
            "group": "TV",
            "logo": "",
            "streams": [{ "id": "hd", "link": "live/news.m3u8", "available": false }]
        },
        {
            "name": "Gone",
            "group": "TV",
            "streams": [{ "id": "sd", "link": "live/gone.m3u8", "available": false }]
        },
        {
            "name": "Sports",
            "group": "",
            "streams": [
                { "id": "main", "link": "live/sports.mpd", "available": true },
                { "id": "backup", "link": "live/sports-backup.m3u8", "available": 0 }
            ]
        },
        {
            "name": "Clip",
            "group": "Movies",
            "streams": [{ "id": "file", "link": "live/clip.mp4", "available": true }]
        },
        "not an object"
    ])
}

fn service_for(server: &FeedServer, fallback: Option<std::path::PathBuf>) -> CatalogService {
    let feed_config = FeedConfig {
        base_url: server.base_url(),
        request_timeout: Duration::from_secs(5),
        fallback_catalog: fallback,
        ..FeedConfig::default()
    };
    let probe_config = ProbeConfig {
        timeout: Duration::from_secs(2),
        max_concurrent: 4,
    };
    let feed = HttpCatalogFeed::new(&feed_config).unwrap();
    CatalogService::new(
        Arc::new(feed),
        AvailabilityProbe::http(&probe_config),
        &feed_config,
    )
}

#[tokio::test]
async fn test_refresh_normalizes_probes_and_filters() {
    let server = FeedServer::builder(streams_document())
        .live("news.m3u8")
        .start()
        .await;
    let mut service = service_for(&server, None);

    let sources = service.refresh(FeedEndpoint::Streams).await.unwrap();

    let names: Vec<&str> = sources.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["News", "Sports"]);

    let news = &sources[0];
    assert_eq!(news.streams[0].link, server.url("live/news.m3u8"));
    assert_eq!(news.streams[0].transport, TransportType::Hls);
    assert!(news.streams[0].available);

    let sports = &sources[1];
    assert_eq!(sports.streams[0].transport, TransportType::Dash);
    assert!(sports.streams[0].available);
    assert!(!sports.streams[1].available);

    // news, gone and the sports backup; the asserted sports link is trusted.
    assert_eq!(server.probe_hits(), 3);
    assert_eq!(service.status(), "Loaded 2 streams");
    assert!(service.fetched_at().is_some());
}

#[tokio::test]
async fn test_groups_follow_feed_order() {
    let server = FeedServer::builder(streams_document())
        .live("news.m3u8")
        .start()
        .await;
    let mut service = service_for(&server, None);
    service.refresh(FeedEndpoint::Streams).await.unwrap();

    let labels: Vec<String> = service.groups().iter().map(|g| g.label()).collect();

    assert_eq!(labels, ["TV (1)", "Other (1)"]);
    assert_eq!(service.find("Sports").unwrap().display_group(), "Other");
    assert!(service.find("Gone").is_none());
}

#[tokio::test]
async fn test_resync_replaces_catalog() {
    let resynced = json!([{
        "name": "Weather",
        "group": "TV",
        "streams": [{ "id": "hd", "link": "live/weather.m3u8", "available": true }]
    }]);
    let server = FeedServer::builder(streams_document())
        .resync(resynced)
        .live("news.m3u8")
        .start()
        .await;
    let mut service = service_for(&server, None);

    service.refresh(FeedEndpoint::Streams).await.unwrap();
    let sources = service.refresh(FeedEndpoint::Resync).await.unwrap();

    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].name, "Weather");
    assert_eq!(server.feed_hits(), 2);
}

#[tokio::test]
async fn test_non_array_resync_keeps_previous_catalog() {
    let server = FeedServer::builder(streams_document())
        .resync(json!({ "status": "busy" }))
        .live("news.m3u8")
        .start()
        .await;
    let mut service = service_for(&server, None);
    service.refresh(FeedEndpoint::Streams).await.unwrap();

    let result = service.refresh(FeedEndpoint::Resync).await;

    assert!(matches!(result, Err(CatalogError::Validation { .. })));
    assert_eq!(service.sources().len(), 2);
    assert!(service.status().starts_with("Failed to load streams"));
}

#[tokio::test]
async fn test_empty_feed_shows_no_streams() {
    let server = FeedServer::builder(json!([])).start().await;
    let mut service = service_for(&server, None);

    let sources = service.refresh(FeedEndpoint::Streams).await.unwrap();

    assert!(sources.is_empty());
    assert_eq!(service.status(), "No supported streams found from API.");
    assert_eq!(server.probe_hits(), 0);
}

#[tokio::test]
async fn test_http_error_then_fallback_catalog() {
    let good = FeedServer::builder(streams_document())
        .live("news.m3u8")
        .start()
        .await;
    let dir = tempfile::tempdir().unwrap();
    let fallback = dir.path().join("catalog.json");

    let mut exporter = service_for(&good, None);
    exporter.refresh(FeedEndpoint::Streams).await.unwrap();
    export_catalog(exporter.sources(), &fallback).await.unwrap();

    let failing = FeedServer::builder(streams_document())
        .feed_status(StatusCode::INTERNAL_SERVER_ERROR)
        .start()
        .await;
    let mut service = service_for(&failing, Some(fallback));

    let result = service.refresh(FeedEndpoint::Streams).await;
    assert!(matches!(
        result,
        Err(CatalogError::Http { status: 500, .. })
    ));

    let loaded = service.load_fallback().await.unwrap();
    assert_eq!(loaded, 2);
    assert_eq!(service.sources(), exporter.sources());
    assert_eq!(service.status(), "Loaded 2 streams from local catalog");
}

#[tokio::test]
async fn test_unreachable_feed_is_network_error() {
    let server = FeedServer::builder(json!([])).start().await;
    let mut service = service_for(&server, None);
    drop(server);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let result = service.refresh(FeedEndpoint::Streams).await;

    assert!(matches!(result, Err(CatalogError::Network { .. })));
    assert!(service.sources().is_empty());
}
