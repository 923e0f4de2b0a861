//! Feed to first frame: probing, selection, retry and response time.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tilecast_core::catalog::{FeedEndpoint, HttpCatalogFeed, variant_labels};
use tilecast_core::config::{FeedConfig, PlaybackConfig, ProbeConfig};
use tilecast_core::playback::test_mocks::{CallJournal, MockEngineFactory};
use tilecast_core::playback::{
    EngineError, EngineErrorKind, EngineEvent, EngineKind, EngineSelector, RetryState,
};
use tilecast_core::{AvailabilityProbe, CatalogService, MediaSource, spawn_player};
use tokio::time::{Instant, sleep_until};

use crate::feed_server::FeedServer;

/// Fetches a one-source catalog whose first variant is dead and whose second
/// is asserted available by the feed.
async fn fetch_catalog() -> (FeedServer, MediaSource) {
    let server = FeedServer::builder(json!([{
        "name": "Channel 5",
        "group": "TV",
        "logo": "http://img.local/ch5.png",
        "streams": [
            { "id": "dead", "link": "live/dead.m3u8", "available": false },
            { "id": "live", "link": "live/ch5.m3u8", "available": true }
        ]
    }]))
    .start()
    .await;

    let feed_config = FeedConfig {
        base_url: server.base_url(),
        ..FeedConfig::default()
    };
    let probe_config = ProbeConfig {
        timeout: Duration::from_secs(2),
        max_concurrent: 2,
    };
    let mut service = CatalogService::new(
        Arc::new(HttpCatalogFeed::new(&feed_config).unwrap()),
        AvailabilityProbe::http(&probe_config),
        &feed_config,
    );

    let sources = service.refresh(FeedEndpoint::Streams).await.unwrap();
    assert_eq!(sources.len(), 1);
    let source = sources[0].clone();

    (server, source)
}

fn not_found() -> EngineEvent {
    EngineEvent::Error(EngineError::new(
        EngineErrorKind::NotFound,
        "Response code: 404",
    ))
}

#[tokio::test]
async fn test_probe_select_retry_and_response_time() {
    let (server, source) = fetch_catalog().await;

    // Only the dead variant needed a network check.
    assert_eq!(server.probe_hits(), 1);
    assert_eq!(variant_labels(&source), ["dead 0 (unavailable)", "live 1"]);
    let live_link = server.url("live/ch5.m3u8");
    assert_eq!(source.streams[1].link, live_link);

    tokio::time::pause();
    let journal = CallJournal::new();
    let hls = MockEngineFactory::new(EngineKind::Hls, journal.clone());
    let dash = MockEngineFactory::new(EngineKind::Dash, journal.clone());
    let selector = EngineSelector::new()
        .with_factory(hls.clone())
        .with_factory(dash.clone());
    let player = spawn_player(PlaybackConfig::default(), selector);
    let mut diagnostics = player.diagnostics();

    let t0 = Instant::now();
    player.select(source, 1).await.unwrap();

    assert_eq!(hls.created_count(), 1);
    assert_eq!(dash.created_count(), 0);
    assert_eq!(
        journal.entries(),
        [
            "create hls#1".to_string(),
            format!("hls#1 set_source {live_link}"),
            "hls#1 prepare".to_string(),
            "hls#1 play".to_string(),
        ]
    );

    // The diagnostics tick starts with the session.
    diagnostics.changed().await.unwrap();
    assert_eq!(*diagnostics.borrow(), "  0.00 Mbps |   0.00 s | A");

    let engine = hls.last_engine().unwrap();
    sleep_until(t0 + Duration::from_millis(100)).await;
    engine.emit(not_found());
    engine.emit(not_found());
    sleep_until(t0 + Duration::from_millis(200)).await;

    let snapshot = player.snapshot().await.unwrap();
    assert_eq!(
        snapshot.retry,
        RetryState::Scheduled {
            next_attempt_at: (t0 + Duration::from_millis(3100)).into_std(),
            attempt_count: 0,
        }
    );
    assert_eq!(snapshot.status, "Stream interrupted, retrying Channel 5...");

    sleep_until(t0 + Duration::from_millis(2000)).await;
    engine.set_bitrate(3_500_000.0);
    engine.set_buffer(Duration::from_secs(1), Duration::from_secs(7));
    engine.emit(EngineEvent::IsPlayingChanged(true));
    sleep_until(t0 + Duration::from_millis(4500)).await;

    let snapshot = player.snapshot().await.unwrap();
    assert_eq!(snapshot.retry, RetryState::Idle);
    assert_eq!(snapshot.response_time, Some(Duration::from_secs(2)));
    assert_eq!(snapshot.status, "Playing Channel 5.");
    assert_eq!(
        snapshot.diagnostics,
        "  3.50 Mbps |   6.00 s | A | Response: 2.00 s"
    );
    assert_eq!(journal.count(&format!("hls#1 set_source {live_link}")), 1);

    player.shutdown().await.unwrap();
    assert_eq!(journal.count("hls#1 release"), 1);
}

#[tokio::test]
async fn test_unanswered_404_reissues_after_interval() {
    let (_server, source) = fetch_catalog().await;

    tokio::time::pause();
    let journal = CallJournal::new();
    let hls = MockEngineFactory::new(EngineKind::Hls, journal.clone());
    let player = spawn_player(
        PlaybackConfig::default(),
        EngineSelector::new().with_factory(hls.clone()),
    );
    let load = format!("hls#1 set_source {}", source.streams[1].link);

    let t0 = Instant::now();
    player.select(source, 1).await.unwrap();
    hls.last_engine().unwrap().emit(not_found());

    sleep_until(t0 + Duration::from_millis(2990)).await;
    assert_eq!(journal.count(&load), 1);

    sleep_until(t0 + Duration::from_millis(3010)).await;
    assert_eq!(journal.count(&load), 2);
    assert_eq!(
        player.snapshot().await.unwrap().status,
        "Retrying Channel 5 (attempt 1)..."
    );

    player.shutdown().await.unwrap();
}
