//! State of one "user selected a stream" action.

use std::time::Instant;

use super::bandwidth::BandwidthEstimator;
use super::engine::{EngineAdapter, EngineKind, SessionId};
use super::response::ResponseTimeTracker;
use super::retry::{RetryCoordinator, RetryState};
use crate::config::PlaybackConfig;

/// Playback session owning exactly one engine.
///
/// Superseded, never reused: a new selection builds a new session after the
/// previous engine is released.
pub struct PlaybackSession {
    pub(crate) id: SessionId,
    pub(crate) source_name: String,
    pub(crate) link: String,
    pub(crate) kind: EngineKind,
    pub(crate) started_at: Instant,
    pub(crate) engine: Box<dyn EngineAdapter>,
    pub(crate) current_speed: f32,
    pub(crate) last_buffered_secs: f64,
    pub(crate) retry: RetryCoordinator,
    pub(crate) response: ResponseTimeTracker,
    pub(crate) bandwidth: BandwidthEstimator,
    pub(crate) next_tick_at: Option<Instant>,
}

impl PlaybackSession {
    pub(crate) fn new(
        id: SessionId,
        source_name: &str,
        link: &str,
        kind: EngineKind,
        engine: Box<dyn EngineAdapter>,
        config: &PlaybackConfig,
        now: Instant,
    ) -> Self {
        let current_speed = engine.playback_speed();
        Self {
            id,
            source_name: source_name.to_string(),
            link: link.to_string(),
            kind,
            started_at: now,
            engine,
            current_speed,
            last_buffered_secs: 0.0,
            retry: RetryCoordinator::new(config.retry.clone()),
            response: ResponseTimeTracker::new(),
            bandwidth: BandwidthEstimator::new(config.bandwidth_history),
            next_tick_at: Some(now),
        }
    }

    /// Hands the source to the engine and starts it.
    pub(crate) fn load(&mut self, now: Instant) {
        self.response.start_request(now);
        self.engine.set_source(&self.link);
        self.engine.prepare();
        self.engine.play();
    }

    /// Stops timers and releases the engine, in that order.
    pub(crate) fn teardown(&mut self) {
        self.next_tick_at = None;
        self.retry.cancel();
        self.engine.release();
    }

    /// Earliest pending timer of the session.
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        match (self.next_tick_at, self.retry.deadline()) {
            (Some(tick), Some(retry)) => Some(tick.min(retry)),
            (tick, retry) => tick.or(retry),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    pub fn engine_kind(&self) -> EngineKind {
        self.kind
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn current_speed(&self) -> f32 {
        self.current_speed
    }

    pub fn last_buffered_secs(&self) -> f64 {
        self.last_buffered_secs
    }

    pub fn retry_state(&self) -> RetryState {
        self.retry.state()
    }

    pub fn response(&self) -> &ResponseTimeTracker {
        &self.response
    }

    pub fn bandwidth(&self) -> &BandwidthEstimator {
        &self.bandwidth
    }

    pub fn next_tick_at(&self) -> Option<Instant> {
        self.next_tick_at
    }

    pub fn is_playing(&self) -> bool {
        self.engine.is_playing()
    }
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("id", &self.id)
            .field("source_name", &self.source_name)
            .field("link", &self.link)
            .field("kind", &self.kind)
            .field("current_speed", &self.current_speed)
            .field("retry", &self.retry.state())
            .finish_non_exhaustive()
    }
}
