//! Centralized configuration for Tilecast.
//!
//! All tunable parameters are defined here and loaded once at startup. The
//! resulting value is passed explicitly into services and the playback
//! controller instead of being re-read on every interaction.

use std::path::PathBuf;
use std::time::Duration;

/// Central configuration for all Tilecast components.
#[derive(Debug, Clone, Default)]
pub struct TilecastConfig {
    pub feed: FeedConfig,
    pub probe: ProbeConfig,
    pub playback: PlaybackConfig,
}

/// Catalog feed configuration.
///
/// Controls where the catalog is fetched from and the bundled fallback used
/// before any network fetch has succeeded.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Base URL of the backend serving `/api/streams` and `/api/resync`
    pub base_url: String,
    /// HTTP request timeout for catalog fetches
    pub request_timeout: Duration,
    /// User agent for HTTP requests
    pub user_agent: &'static str,
    /// Bundled catalog used until a network fetch succeeds
    pub fallback_catalog: Option<PathBuf>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "http://192.168.0.108:80".to_string(),
            request_timeout: Duration::from_secs(15),
            user_agent: "tilecast/0.1.0",
            fallback_catalog: None,
        }
    }
}

/// Stream availability probe configuration.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Timeout for a single HEAD probe; expiry counts as unavailable
    pub timeout: Duration,
    /// Maximum probes in flight at once
    pub max_concurrent: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_concurrent: 16,
        }
    }
}

/// Playback controller configuration.
///
/// Holds the rate-control thresholds, the diagnostics tick interval and the
/// retry policy applied after fatal playback errors.
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Diagnostics and rate-control tick interval
    pub tick_interval: Duration,
    /// Buffered seconds below which auto mode slows playback down
    pub low_buffer_threshold_secs: f64,
    /// Speed applied in auto mode while the buffer is low
    pub low_buffer_speed: f32,
    /// Speed applied in auto mode while the buffer is healthy
    pub normal_speed: f32,
    /// Minimum speed difference that triggers a change
    pub speed_dead_band: f32,
    /// Lowest speed selectable in manual mode
    pub manual_min_speed: f32,
    /// Highest speed selectable in manual mode
    pub manual_max_speed: f32,
    /// Number of bandwidth samples kept per session
    pub bandwidth_history: usize,
    /// Retry behaviour after fatal playback errors
    pub retry: RetryPolicy,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            low_buffer_threshold_secs: 5.0,
            low_buffer_speed: 0.8,
            normal_speed: 1.0,
            speed_dead_band: 0.01,
            manual_min_speed: 0.5,
            manual_max_speed: 1.0,
            bandwidth_history: 30,
            retry: RetryPolicy::default(),
        }
    }
}

/// Retry policy for fatal playback errors.
///
/// The default retries forever at a fixed interval, which suits unattended
/// kiosk playback. A permanently dead stream therefore retries until the
/// session ends unless `max_attempts` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delay between a failure and the next attempt
    pub interval: Duration,
    /// Attempts after which the coordinator gives up (None = unbounded)
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(3000),
            max_attempts: None,
        }
    }
}

impl TilecastConfig {
    /// Creates configuration with environment variable overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(base_url) = std::env::var("TILECAST_BASE_URL") {
            config.feed.base_url = base_url;
        }

        if let Ok(timeout) = std::env::var("TILECAST_FEED_TIMEOUT")
            && let Ok(seconds) = timeout.parse::<u64>()
        {
            config.feed.request_timeout = Duration::from_secs(seconds);
        }

        if let Ok(path) = std::env::var("TILECAST_FALLBACK_CATALOG") {
            config.feed.fallback_catalog = Some(PathBuf::from(path));
        }

        if let Ok(timeout) = std::env::var("TILECAST_PROBE_TIMEOUT")
            && let Ok(seconds) = timeout.parse::<u64>()
        {
            config.probe.timeout = Duration::from_secs(seconds);
        }

        if let Ok(interval) = std::env::var("TILECAST_RETRY_INTERVAL_MS")
            && let Some(interval) = parse_retry_interval(&interval)
        {
            config.playback.retry.interval = interval;
        }

        if let Ok(attempts) = std::env::var("TILECAST_RETRY_MAX_ATTEMPTS") {
            config.playback.retry.max_attempts = attempts.parse::<u32>().ok();
        }

        config
    }

    /// Creates a configuration optimized for testing.
    pub fn for_testing() -> Self {
        Self {
            feed: FeedConfig {
                base_url: "http://127.0.0.1:0".to_string(),
                request_timeout: Duration::from_secs(2),
                ..Default::default()
            },
            probe: ProbeConfig {
                timeout: Duration::from_millis(500),
                max_concurrent: 4,
            },
            ..Default::default()
        }
    }
}

/// Parses a retry interval in milliseconds. Zero is rejected.
fn parse_retry_interval(value: &str) -> Option<Duration> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|millis| *millis > 0)
        .map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = TilecastConfig::default();

        assert_eq!(config.playback.tick_interval, Duration::from_secs(1));
        assert_eq!(config.playback.low_buffer_threshold_secs, 5.0);
        assert_eq!(config.playback.low_buffer_speed, 0.8);
        assert_eq!(config.playback.normal_speed, 1.0);
        assert_eq!(config.playback.retry.interval, Duration::from_millis(3000));
        assert_eq!(config.playback.retry.max_attempts, None);
        assert!(config.feed.fallback_catalog.is_none());
    }

    #[test]
    fn test_testing_preset_shortens_timeouts() {
        let config = TilecastConfig::for_testing();

        assert!(config.probe.timeout < ProbeConfig::default().timeout);
        assert!(config.feed.request_timeout < FeedConfig::default().request_timeout);
        assert_eq!(config.playback.retry, RetryPolicy::default());
    }

    #[test]
    fn test_retry_interval_parsing() {
        assert_eq!(parse_retry_interval("1500"), Some(Duration::from_millis(1500)));
        assert_eq!(parse_retry_interval(" 250 "), Some(Duration::from_millis(250)));
        assert_eq!(parse_retry_interval("0"), None);
        assert_eq!(parse_retry_interval("-5"), None);
        assert_eq!(parse_retry_interval("soon"), None);
    }

    #[test]
    fn test_env_override() {
        unsafe {
            std::env::set_var("TILECAST_BASE_URL", "http://tv.local:8080");
            std::env::set_var("TILECAST_FEED_TIMEOUT", "60");
            std::env::set_var("TILECAST_RETRY_INTERVAL_MS", "1500");
            std::env::set_var("TILECAST_RETRY_MAX_ATTEMPTS", "7");
            std::env::set_var("TILECAST_FALLBACK_CATALOG", "/tmp/config.json");
        }

        let config = TilecastConfig::from_env();

        assert_eq!(config.feed.base_url, "http://tv.local:8080");
        assert_eq!(config.feed.request_timeout, Duration::from_secs(60));
        assert_eq!(config.playback.retry.interval, Duration::from_millis(1500));
        assert_eq!(config.playback.retry.max_attempts, Some(7));
        assert_eq!(
            config.feed.fallback_catalog,
            Some(PathBuf::from("/tmp/config.json"))
        );

        // Cleanup
        unsafe {
            std::env::remove_var("TILECAST_BASE_URL");
            std::env::remove_var("TILECAST_FEED_TIMEOUT");
            std::env::remove_var("TILECAST_RETRY_INTERVAL_MS");
            std::env::remove_var("TILECAST_RETRY_MAX_ATTEMPTS");
            std::env::remove_var("TILECAST_FALLBACK_CATALOG");
        }
    }
}
