//! Player actor behavior over journaled mock engines.

use std::sync::Arc;
use std::time::Duration;

use tilecast_core::config::PlaybackConfig;
use tilecast_core::playback::test_mocks::{CallJournal, MockEngineFactory};
use tilecast_core::playback::{
    EngineError, EngineEvent, EngineKind, EngineSelector, PlaybackError, PlaybackState,
    RetryState, SpeedMode,
};
use tilecast_core::{MediaSource, PlayerHandle, StreamVariant, spawn_player};

struct Player {
    handle: PlayerHandle,
    hls: Arc<MockEngineFactory>,
    dash: Arc<MockEngineFactory>,
    journal: CallJournal,
}

fn player() -> Player {
    let journal = CallJournal::new();
    let hls = MockEngineFactory::new(EngineKind::Hls, journal.clone());
    let dash = MockEngineFactory::new(EngineKind::Dash, journal.clone());
    let selector = EngineSelector::new()
        .with_factory(hls.clone())
        .with_factory(dash.clone());
    let handle = spawn_player(PlaybackConfig::default(), selector);
    Player {
        handle,
        hls,
        dash,
        journal,
    }
}

fn channel() -> MediaSource {
    MediaSource {
        name: "Sports".to_string(),
        group: "TV".to_string(),
        logo_url: None,
        streams: vec![
            StreamVariant::new("main", "http://tv.local/sports.mpd", true),
            StreamVariant::new("backup", "http://tv.local/sports.m3u8", true),
            StreamVariant::new("clip", "http://tv.local/sports.mp4", true),
        ],
    }
}

#[tokio::test(start_paused = true)]
async fn test_switching_variants_releases_before_creating() {
    let player = player();

    player.handle.select(channel(), 0).await.unwrap();
    player.handle.select(channel(), 1).await.unwrap();

    let entries = player.journal.entries();
    let release = entries.iter().position(|e| e == "dash#1 release").unwrap();
    let create = entries.iter().position(|e| e == "create hls#1").unwrap();
    assert!(release < create, "{entries:?}");

    let snapshot = player.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.engine, Some(EngineKind::Hls));
    assert_eq!(snapshot.source_name.as_deref(), Some("Sports"));
    assert_eq!(player.dash.created_count(), 1);

    player.handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_variant_reports_status() {
    let player = player();
    player.handle.select(channel(), 0).await.unwrap();

    let result = player.handle.select(channel(), 2).await;

    assert!(matches!(
        result,
        Err(PlaybackError::UnsupportedTransport { .. })
    ));
    let snapshot = player.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.session, None);
    assert!(snapshot.status.starts_with("Unsupported stream type"));
    assert_eq!(player.journal.count("dash#1 release"), 1);

    player.handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_stale_engine_errors_are_ignored() {
    let player = player();
    player.handle.select(channel(), 0).await.unwrap();
    let old_engine = player.dash.last_engine().unwrap();
    player.handle.select(channel(), 1).await.unwrap();

    old_engine.emit(EngineEvent::Error(EngineError::from_message(
        "Response code: 404",
    )));
    tokio::time::sleep(Duration::from_millis(100)).await;

    let snapshot = player.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.retry, RetryState::Idle);
    assert_eq!(snapshot.engine, Some(EngineKind::Hls));

    player.handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_retries_keep_reissuing_until_playing() {
    let player = player();
    player.handle.select(channel(), 1).await.unwrap();
    let engine = player.hls.last_engine().unwrap();
    let load = "hls#1 set_source http://tv.local/sports.m3u8";

    engine.emit(EngineEvent::Error(EngineError::from_message("Connection refused")));
    tokio::time::sleep(Duration::from_millis(6100)).await;
    assert_eq!(player.journal.count(load), 3);

    engine.emit(EngineEvent::StateChanged(PlaybackState::Ready));
    engine.emit(EngineEvent::IsPlayingChanged(true));
    tokio::time::sleep(Duration::from_millis(10_000)).await;

    assert_eq!(player.journal.count(load), 3);
    let snapshot = player.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.retry, RetryState::Idle);
    assert_eq!(snapshot.status, "Playing Sports.");

    player.handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_manual_speed_survives_reload() {
    let player = player();
    player.handle.select(channel(), 1).await.unwrap();

    player
        .handle
        .set_speed_mode(SpeedMode::Manual(0.6))
        .await
        .unwrap();
    player.handle.reload().await.unwrap();
    tokio::time::sleep(Duration::from_millis(1100)).await;

    let snapshot = player.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.speed_mode, SpeedMode::Manual(0.6));
    assert!(snapshot.diagnostics.ends_with("| D"), "{}", snapshot.diagnostics);
    assert_eq!(player.hls.created_count(), 1);
    assert_eq!(
        player
            .journal
            .count("hls#1 set_source http://tv.local/sports.m3u8"),
        2
    );

    player.handle.shutdown().await.unwrap();
}
