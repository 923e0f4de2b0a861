//! Controller behavior against simulated engines and networks.

use std::time::Duration;

use tilecast_core::config::{PlaybackConfig, RetryPolicy};
use tilecast_core::playback::RetryState;
use tilecast_core::{MediaSource, StreamVariant};
use tilecast_sim::{NetworkProfile, PlaybackScenario};

fn channel(link: &str) -> MediaSource {
    MediaSource {
        name: "News".to_string(),
        group: "TV".to_string(),
        logo_url: None,
        streams: vec![StreamVariant::new("hd", link, true)],
    }
}

#[test]
fn test_outage_stalls_then_recovers() {
    let network = NetworkProfile::builder()
        .bandwidth_bps(4_000_000.0)
        .outage(Duration::from_secs(5)..Duration::from_secs(20))
        .build()
        .unwrap();

    let report = PlaybackScenario::new(network)
        .duration(Duration::from_secs(30))
        .run(&channel("http://sim/news.m3u8"), 0)
        .unwrap();

    assert!(report.stalls >= 1);
    assert_eq!(report.source_loads, 1);
    assert!(
        report
            .ticks
            .iter()
            .filter(|tick| tick.elapsed > Duration::from_secs(15))
            .any(|tick| tick.speed == 0.8)
    );
    assert_eq!(report.final_status, "Playing News.");
}

#[test]
fn test_attempt_cap_stops_reloading() {
    let config = PlaybackConfig {
        retry: RetryPolicy {
            interval: Duration::from_millis(3000),
            max_attempts: Some(2),
        },
        ..PlaybackConfig::default()
    };

    let report = PlaybackScenario::new(NetworkProfile::constant(4_000_000.0))
        .playback_config(config)
        .duration(Duration::from_secs(20))
        .fail_first(10)
        .run(&channel("http://sim/news.m3u8"), 0)
        .unwrap();

    // Initial load plus two reissues.
    assert_eq!(report.source_loads, 3);
    assert_eq!(
        report.final_status,
        "Playback of News failed after 2 attempts, giving up."
    );
    assert_eq!(report.ticks.last().unwrap().retry, RetryState::Idle);
}

#[test]
fn test_dash_and_progressive_links_play() {
    for link in ["http://sim/news.mpd", "http://sim/radio.mp3"] {
        let report = PlaybackScenario::new(NetworkProfile::constant(4_000_000.0))
            .duration(Duration::from_secs(5))
            .run(&channel(link), 0)
            .unwrap();

        assert_eq!(report.engines_created, 1, "{link}");
        assert_eq!(report.final_status, "Playing News.", "{link}");
    }
}
