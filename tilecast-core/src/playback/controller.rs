//! Adaptive playback controller.
//!
//! Owns at most one [`PlaybackSession`] and drives it from three inputs:
//! user selections, engine events and the passage of time. The controller
//! performs no I/O and never sleeps; every operation takes the current time
//! and [`PlaybackController::next_deadline`] tells the caller when to call
//! [`PlaybackController::poll`] next.

use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use super::PlaybackError;
use super::engine::{
    EngineEvent, EngineEventSender, EngineKind, PlaybackState, SessionEvent, SessionId,
};
use super::rate::{AdaptiveRateController, SpeedMode};
use super::retry::{RetryAction, RetryState};
use super::selector::EngineSelector;
use super::session::PlaybackSession;
use crate::catalog::{MediaSource, StreamVariant};
use crate::config::PlaybackConfig;

/// Point-in-time view of the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub session: Option<SessionId>,
    pub source_name: Option<String>,
    pub engine: Option<EngineKind>,
    pub retry: RetryState,
    pub speed: Option<f32>,
    pub speed_mode: SpeedMode,
    pub response_time: Option<Duration>,
    pub diagnostics: String,
    pub status: String,
}

/// Playback controller for a single player view.
pub struct PlaybackController {
    config: PlaybackConfig,
    selector: EngineSelector,
    events: mpsc::UnboundedSender<SessionEvent>,
    rate: AdaptiveRateController,
    session: Option<PlaybackSession>,
    last_session_id: SessionId,
    diagnostics: String,
    status: String,
}

impl PlaybackController {
    /// Creates an idle controller.
    ///
    /// Engines created by this controller report their callbacks on `events`;
    /// the owner feeds them back through [`Self::handle_event`].
    pub fn new(
        config: PlaybackConfig,
        selector: EngineSelector,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        let rate = AdaptiveRateController::new(&config);
        Self {
            config,
            selector,
            events,
            rate,
            session: None,
            last_session_id: 0,
            diagnostics: String::new(),
            status: String::new(),
        }
    }

    /// Starts playback of one variant of a source.
    ///
    /// Any previous session is torn down first, even when the new variant
    /// turns out to be unplayable.
    ///
    /// # Errors
    /// - `PlaybackError::VariantNotFound` - Source has no variant at `variant_index`
    /// - `PlaybackError::UnsupportedTransport` - No engine can play the variant
    pub fn select(
        &mut self,
        source: &MediaSource,
        variant_index: usize,
        now: Instant,
    ) -> Result<SessionId, PlaybackError> {
        let variant =
            source
                .streams
                .get(variant_index)
                .ok_or_else(|| PlaybackError::VariantNotFound {
                    source_name: source.name.clone(),
                    index: variant_index,
                })?;

        self.play_variant(&source.name, variant, now)
    }

    /// Starts playback of a variant directly.
    ///
    /// # Errors
    /// - `PlaybackError::UnsupportedTransport` - No engine can play the variant
    pub fn play_variant(
        &mut self,
        source_name: &str,
        variant: &StreamVariant,
        now: Instant,
    ) -> Result<SessionId, PlaybackError> {
        self.teardown();

        let factory = match self.selector.select(variant.transport, &variant.link) {
            Ok(factory) => factory,
            Err(e) => {
                self.status = format!(
                    "Unsupported stream type: \"{}\" for {source_name}.",
                    variant.transport
                );
                tracing::warn!("Cannot play {}: {}", source_name, e);
                return Err(e);
            }
        };

        self.last_session_id += 1;
        let id = self.last_session_id;
        let kind = factory.kind();
        let engine = factory.create(EngineEventSender::new(id, self.events.clone()));

        let mut session = PlaybackSession::new(
            id,
            source_name,
            &variant.link,
            kind,
            engine,
            &self.config,
            now,
        );
        session.load(now);
        self.session = Some(session);

        self.status = format!("Preparing to load {source_name} ({kind} stream)...");
        tracing::info!(
            "Session {} started: {} via {} engine ({})",
            id,
            source_name,
            kind,
            variant.link
        );

        Ok(id)
    }

    /// Reissues the current source on the current engine immediately.
    ///
    /// # Errors
    /// - `PlaybackError::NoActiveSession` - Nothing is playing
    pub fn reload(&mut self, now: Instant) -> Result<(), PlaybackError> {
        let session = self.session.as_mut().ok_or(PlaybackError::NoActiveSession)?;

        session.retry.cancel();
        session.load(now);
        self.status = format!("Reloading {}...", session.source_name);
        tracing::info!("Session {} reloaded by request", session.id);
        Ok(())
    }

    /// Applies an engine callback.
    ///
    /// Events stamped with another session's id come from an engine that
    /// was already torn down and are dropped.
    pub fn handle_event(&mut self, event: SessionEvent, now: Instant) {
        let Some(session) = self
            .session
            .as_mut()
            .filter(|session| session.id == event.session)
        else {
            tracing::debug!("Dropping event from stale session {}", event.session);
            return;
        };

        match event.event {
            EngineEvent::Error(error) if error.is_fatal() => {
                if session.retry.on_fatal_error(now) {
                    tracing::info!(
                        "Playback error detected, scheduling retry in {:?}: {}",
                        self.config.retry.interval,
                        error.message
                    );
                    self.status = format!("Stream interrupted, retrying {}...", session.source_name);
                } else if session.retry.is_pending() {
                    tracing::debug!("Retry already pending, ignoring: {}", error.message);
                } else if session.retry.is_exhausted() {
                    tracing::debug!(
                        "Retries exhausted after {} attempts, ignoring: {}",
                        session.retry.attempts(),
                        error.message
                    );
                }
            }
            EngineEvent::Error(error) => {
                tracing::warn!("Non-fatal playback error on session {}: {}", session.id, error);
                self.status = format!("Playback error: {}", error.message);
            }
            EngineEvent::StateChanged(state) => {
                if matches!(state, PlaybackState::Ready | PlaybackState::Buffering) {
                    if session.retry.is_pending() {
                        tracing::debug!("Session {}: engine is loading again, retry suspended", session.id);
                    }
                    session.retry.suspend();
                }
                match state {
                    PlaybackState::Ready => {
                        self.diagnostics = sample(session, &self.rate, now);
                    }
                    PlaybackState::Ended => {
                        self.status = format!("Playback of {} ended.", session.source_name);
                    }
                    PlaybackState::Idle | PlaybackState::Buffering => {}
                }
            }
            EngineEvent::IsPlayingChanged(true) => {
                cancel_retry(session, "playback resumed");
                session.response.record_response(now);
                self.status = format!("Playing {}.", session.source_name);
                self.diagnostics = sample(session, &self.rate, now);
            }
            EngineEvent::IsPlayingChanged(false) => {}
        }
    }

    /// Runs every timer that is due at `now`.
    ///
    /// Returns the next deadline, if any.
    pub fn poll(&mut self, now: Instant) -> Option<Instant> {
        let session = self.session.as_mut()?;

        if let Some(tick_at) = session.next_tick_at.filter(|at| *at <= now) {
            self.diagnostics = sample(session, &self.rate, now);

            let interval = self.config.tick_interval;
            let next = tick_at + interval;
            session.next_tick_at = Some(if next <= now { now + interval } else { next });
        }

        let is_playing = session.engine.is_playing();
        match session.retry.fire(now, is_playing) {
            Some(RetryAction::Abandoned) => {
                tracing::debug!("Session {} already playing, retry dropped", session.id);
            }
            Some(RetryAction::Reissue { attempt }) => {
                tracing::info!(
                    "Retrying {} (attempt {}): {}",
                    session.source_name,
                    attempt,
                    session.link
                );
                session.load(now);

                if session.retry.rearm(now) {
                    self.status = format!("Retrying {} (attempt {attempt})...", session.source_name);
                } else {
                    tracing::warn!(
                        "Giving up on {} after {} attempts",
                        session.source_name,
                        attempt
                    );
                    self.status = format!(
                        "Playback of {} failed after {attempt} attempts, giving up.",
                        session.source_name
                    );
                }
            }
            None => {}
        }

        session.next_deadline()
    }

    /// Earliest time [`Self::poll`] has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.session.as_ref().and_then(PlaybackSession::next_deadline)
    }

    /// Changes the speed mode and refreshes the label right away.
    pub fn set_speed_mode(&mut self, mode: SpeedMode, now: Instant) {
        self.rate.set_mode(mode);
        tracing::debug!("Speed mode set to {:?}", self.rate.mode());

        if let Some(session) = self.session.as_mut() {
            self.diagnostics = sample(session, &self.rate, now);
        }
    }

    pub fn speed_mode(&self) -> SpeedMode {
        self.rate.mode()
    }

    /// Ends the current session, if any.
    pub fn close(&mut self) {
        if self.session.is_some() {
            self.teardown();
            self.status = "Playback stopped.".to_string();
        }
    }

    fn teardown(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.teardown();
            tracing::info!(
                "Session {} closed: released {} engine for {}",
                session.id,
                session.kind,
                session.source_name
            );
        }
        self.diagnostics.clear();
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    /// Current diagnostics label; empty without a session.
    pub fn diagnostics(&self) -> &str {
        &self.diagnostics
    }

    /// Current status line.
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        let session = self.session.as_ref();
        PlayerSnapshot {
            session: session.map(|s| s.id),
            source_name: session.map(|s| s.source_name.clone()),
            engine: session.map(|s| s.kind),
            retry: session.map_or(RetryState::Idle, |s| s.retry.state()),
            speed: session.map(|s| s.current_speed),
            speed_mode: self.rate.mode(),
            response_time: session.and_then(|s| s.response.last_response()),
            diagnostics: self.diagnostics.clone(),
            status: self.status.clone(),
        }
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("selector", &self.selector)
            .field("session", &self.session)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

fn cancel_retry(session: &mut PlaybackSession, reason: &str) {
    if session.retry.is_pending() {
        tracing::debug!("Session {}: {}, cancelling retry", session.id, reason);
    }
    session.retry.cancel();
}

/// One rate-control tick: sample the engine, adjust speed, build the label.
fn sample(session: &mut PlaybackSession, rate: &AdaptiveRateController, now: Instant) -> String {
    let bitrate = session.engine.bitrate_estimate();
    session.bandwidth.record(bitrate, now);

    let buffered = session
        .engine
        .buffered_position()
        .saturating_sub(session.engine.current_position())
        .as_secs_f64();
    session.last_buffered_secs = buffered;

    let current = session.engine.playback_speed();
    if let Some(speed) = rate.evaluate(buffered, current) {
        tracing::debug!(
            "Session {}: {:.2}s buffered, speed {:.2} -> {:.2}",
            session.id,
            buffered,
            current,
            speed
        );
        session.engine.set_speed(speed);
    }
    session.current_speed = session.engine.playback_speed();

    let mut label = rate.label(bitrate, buffered);
    let response = session.response.label();
    if !response.is_empty() {
        label.push_str(" | ");
        label.push_str(&response);
    }
    label
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::catalog::TransportType;
    use crate::config::RetryPolicy;
    use crate::playback::engine::{EngineError, EngineErrorKind};
    use crate::playback::test_mocks::{CallJournal, MockEngineFactory};

    const RETRY: Duration = Duration::from_millis(3000);

    struct Harness {
        controller: PlaybackController,
        events: mpsc::UnboundedReceiver<SessionEvent>,
        journal: CallJournal,
        hls: Arc<MockEngineFactory>,
        dash: Arc<MockEngineFactory>,
        start: Instant,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_config(PlaybackConfig::default())
        }

        fn with_config(config: PlaybackConfig) -> Self {
            let journal = CallJournal::new();
            let hls = MockEngineFactory::new(EngineKind::Hls, journal.clone());
            let dash = MockEngineFactory::new(EngineKind::Dash, journal.clone());
            let selector = EngineSelector::new()
                .with_factory(hls.clone())
                .with_factory(dash.clone())
                .with_factory(MockEngineFactory::new(EngineKind::Progressive, journal.clone()));
            let (tx, rx) = mpsc::unbounded_channel();

            Self {
                controller: PlaybackController::new(config, selector, tx),
                events: rx,
                journal,
                hls,
                dash,
                start: Instant::now(),
            }
        }

        fn at(&self, millis: u64) -> Instant {
            self.start + Duration::from_millis(millis)
        }

        /// Delivers queued engine events to the controller.
        fn pump(&mut self, now: Instant) {
            while let Ok(event) = self.events.try_recv() {
                self.controller.handle_event(event, now);
            }
        }
    }

    fn source(name: &str, links: &[&str]) -> MediaSource {
        MediaSource {
            name: name.to_string(),
            group: String::new(),
            logo_url: None,
            streams: links
                .iter()
                .enumerate()
                .map(|(i, link)| StreamVariant::new(i.to_string(), *link, true))
                .collect(),
        }
    }

    fn not_found() -> EngineEvent {
        EngineEvent::Error(EngineError::from_message("Response code: 404"))
    }

    #[test]
    fn test_selection_loads_engine_in_order() {
        let mut h = Harness::new();
        let start = h.start;

        let id = h
            .controller
            .select(&source("News", &["http://a/news.m3u8"]), 0, start)
            .unwrap();

        assert_eq!(id, 1);
        assert_eq!(
            h.journal.entries(),
            vec![
                "create hls#1",
                "hls#1 set_source http://a/news.m3u8",
                "hls#1 prepare",
                "hls#1 play",
            ]
        );
        assert_eq!(h.controller.status(), "Preparing to load News (hls stream)...");
        assert_eq!(h.controller.next_deadline(), Some(start));
    }

    #[test]
    fn test_new_selection_releases_previous_engine_first() {
        let mut h = Harness::new();
        let start = h.start;

        h.controller
            .select(&source("A", &["http://a/a.m3u8"]), 0, start)
            .unwrap();
        h.controller
            .select(&source("B", &["http://a/b.mpd"]), 0, h.at(500))
            .unwrap();

        assert_eq!(h.journal.count("hls#1 release"), 1);
        let released = h.journal.position("hls#1 release").unwrap();
        let created = h.journal.position("create dash#1").unwrap();
        assert!(released < created, "{:?}", h.journal.entries());

        h.controller.close();
        assert_eq!(h.journal.count("hls#1 release"), 1);
        assert_eq!(h.journal.count("dash#1 release"), 1);
    }

    #[test]
    fn test_error_burst_arms_single_retry() {
        let mut h = Harness::new();
        let start = h.start;
        h.controller
            .select(&source("A", &["http://a/a.m3u8"]), 0, start)
            .unwrap();
        let engine = h.hls.last_engine().unwrap();

        engine.emit(not_found());
        engine.emit(EngineEvent::Error(EngineError::new(
            EngineErrorKind::ConnectionRefused,
            "unable to connect",
        )));
        h.pump(h.at(100));

        assert_eq!(
            h.controller.session().unwrap().retry_state(),
            RetryState::Scheduled {
                next_attempt_at: h.at(100) + RETRY,
                attempt_count: 0,
            }
        );
    }

    #[test]
    fn test_retry_reissues_same_source() {
        let mut h = Harness::new();
        let start = h.start;
        h.controller
            .select(&source("A", &["http://a/a.m3u8"]), 0, start)
            .unwrap();
        h.hls.last_engine().unwrap().emit(not_found());
        h.pump(start);

        h.controller.poll(start + RETRY - Duration::from_millis(1));
        assert_eq!(h.journal.count("hls#1 set_source http://a/a.m3u8"), 1);

        h.controller.poll(start + RETRY);
        assert_eq!(h.journal.count("hls#1 set_source http://a/a.m3u8"), 2);
        assert_eq!(h.journal.count("hls#1 play"), 2);
        assert_eq!(h.hls.created_count(), 1);
        assert_eq!(
            h.controller.session().unwrap().retry_state(),
            RetryState::Scheduled {
                next_attempt_at: start + RETRY * 2,
                attempt_count: 1,
            }
        );
        assert_eq!(h.controller.status(), "Retrying A (attempt 1)...");
    }

    #[test]
    fn test_playing_event_cancels_pending_retry() {
        let mut h = Harness::new();
        let start = h.start;
        h.controller
            .select(&source("A", &["http://a/a.m3u8"]), 0, start)
            .unwrap();
        let engine = h.hls.last_engine().unwrap();

        engine.emit(not_found());
        h.pump(start);
        engine.emit(EngineEvent::IsPlayingChanged(true));
        h.pump(h.at(1200));

        assert_eq!(h.controller.session().unwrap().retry_state(), RetryState::Idle);

        h.controller.poll(h.at(10_000));
        assert_eq!(h.journal.count("hls#1 set_source http://a/a.m3u8"), 1);
        assert_eq!(h.controller.status(), "Playing A.");
    }

    #[test]
    fn test_buffering_event_drops_in_flight_retry() {
        let mut h = Harness::new();
        let start = h.start;
        h.controller
            .select(&source("A", &["http://a/a.m3u8"]), 0, start)
            .unwrap();
        let engine = h.hls.last_engine().unwrap();

        engine.emit(not_found());
        h.pump(start);
        h.controller.poll(start + RETRY);
        engine.emit(EngineEvent::StateChanged(PlaybackState::Buffering));
        h.pump(start + RETRY);

        assert_eq!(h.controller.session().unwrap().retry_state(), RetryState::Idle);
    }

    #[test]
    fn test_attempt_cap_reached_when_engine_buffers_before_each_failure() {
        let config = PlaybackConfig {
            retry: RetryPolicy {
                interval: RETRY,
                max_attempts: Some(2),
            },
            ..PlaybackConfig::default()
        };
        let mut h = Harness::with_config(config);
        let start = h.start;
        h.controller
            .select(&source("A", &["http://a/a.m3u8"]), 0, start)
            .unwrap();
        let engine = h.hls.last_engine().unwrap();

        let mut now = start;
        for _ in 0..6 {
            engine.emit(EngineEvent::StateChanged(PlaybackState::Buffering));
            engine.emit(not_found());
            h.pump(now);
            now += RETRY;
            h.controller.poll(now);
        }

        // Initial load plus two reissues.
        assert_eq!(h.journal.count("hls#1 set_source http://a/a.m3u8"), 3);
        assert_eq!(h.controller.session().unwrap().retry_state(), RetryState::Idle);
        assert_eq!(
            h.controller.status(),
            "Playback of A failed after 2 attempts, giving up."
        );
    }

    #[test]
    fn test_playing_starts_a_fresh_failure_streak() {
        let config = PlaybackConfig {
            retry: RetryPolicy {
                interval: RETRY,
                max_attempts: Some(2),
            },
            ..PlaybackConfig::default()
        };
        let mut h = Harness::with_config(config);
        let start = h.start;
        h.controller
            .select(&source("A", &["http://a/a.m3u8"]), 0, start)
            .unwrap();
        let engine = h.hls.last_engine().unwrap();

        engine.emit(not_found());
        h.pump(start);
        h.controller.poll(h.at(3000));
        engine.emit(EngineEvent::IsPlayingChanged(true));
        h.pump(h.at(3500));

        engine.emit(EngineEvent::IsPlayingChanged(false));
        engine.emit(not_found());
        h.pump(h.at(10_000));

        assert_eq!(
            h.controller.session().unwrap().retry_state(),
            RetryState::Scheduled {
                next_attempt_at: h.at(13_000),
                attempt_count: 0,
            }
        );
    }

    #[test]
    fn test_response_time_measures_latest_attempt() {
        let mut h = Harness::new();
        let start = h.start;
        h.controller
            .select(&source("A", &["http://a/a.m3u8"]), 0, start)
            .unwrap();
        let engine = h.hls.last_engine().unwrap();

        engine.emit(not_found());
        h.pump(start);
        h.controller.poll(h.at(3000));
        assert_eq!(h.journal.count("hls#1 set_source http://a/a.m3u8"), 2);

        engine.emit(EngineEvent::IsPlayingChanged(true));
        h.pump(h.at(4200));

        let response = h.controller.session().unwrap().response().last_response();
        assert_eq!(response, Some(Duration::from_millis(1200)));
        assert!(
            h.controller.diagnostics().ends_with("| Response: 1.20 s"),
            "{}",
            h.controller.diagnostics()
        );
    }

    #[test]
    fn test_retry_abandoned_when_engine_already_playing() {
        let mut h = Harness::new();
        let start = h.start;
        h.controller
            .select(&source("A", &["http://a/a.m3u8"]), 0, start)
            .unwrap();
        let engine = h.hls.last_engine().unwrap();

        engine.emit(not_found());
        h.pump(start);
        engine.set_playing(true);
        h.controller.poll(start + RETRY);

        assert_eq!(h.controller.session().unwrap().retry_state(), RetryState::Idle);
        assert_eq!(h.journal.count("hls#1 set_source http://a/a.m3u8"), 1);
    }

    #[test]
    fn test_retry_gives_up_at_attempt_cap() {
        let config = PlaybackConfig {
            retry: RetryPolicy {
                interval: RETRY,
                max_attempts: Some(1),
            },
            ..PlaybackConfig::default()
        };
        let mut h = Harness::with_config(config);
        let start = h.start;
        h.controller
            .select(&source("A", &["http://a/a.m3u8"]), 0, start)
            .unwrap();
        h.hls.last_engine().unwrap().emit(not_found());
        h.pump(start);

        h.controller.poll(start + RETRY);

        assert_eq!(h.controller.session().unwrap().retry_state(), RetryState::Idle);
        assert!(h.controller.status().ends_with("giving up."));

        // The reissued load fails again; that must not restart the cycle.
        h.hls.last_engine().unwrap().emit(not_found());
        h.pump(start + RETRY);
        assert_eq!(h.controller.session().unwrap().retry_state(), RetryState::Idle);
        assert_eq!(
            h.controller.status(),
            "Playback of A failed after 1 attempts, giving up."
        );
    }

    #[test]
    fn test_non_fatal_error_does_not_retry() {
        let mut h = Harness::new();
        let start = h.start;
        h.controller
            .select(&source("A", &["http://a/a.m3u8"]), 0, start)
            .unwrap();

        h.hls
            .last_engine()
            .unwrap()
            .emit(EngineEvent::Error(EngineError::from_message("Decoder init failed")));
        h.pump(start);

        assert_eq!(h.controller.session().unwrap().retry_state(), RetryState::Idle);
        assert_eq!(h.controller.status(), "Playback error: Decoder init failed");
    }

    #[test]
    fn test_events_from_released_engine_are_ignored() {
        let mut h = Harness::new();
        let start = h.start;
        h.controller
            .select(&source("A", &["http://a/a.m3u8"]), 0, start)
            .unwrap();
        let old_engine = h.hls.last_engine().unwrap();
        h.controller
            .select(&source("B", &["http://a/b.m3u8"]), 0, start)
            .unwrap();

        old_engine.emit(not_found());
        h.pump(start);

        let session = h.controller.session().unwrap();
        assert_eq!(session.id(), 2);
        assert_eq!(session.retry_state(), RetryState::Idle);
    }

    #[test]
    fn test_speed_changes_once_per_threshold_crossing() {
        let mut h = Harness::new();
        let start = h.start;
        h.controller
            .select(&source("A", &["http://a/a.m3u8"]), 0, start)
            .unwrap();
        let engine = h.hls.last_engine().unwrap();

        let buffered = [6.0, 4.9, 4.95, 5.1, 5.0, 4.8, 4.99];
        for (second, secs) in buffered.iter().enumerate() {
            engine.set_buffer(
                Duration::from_secs(10),
                Duration::from_secs(10) + Duration::from_secs_f64(*secs),
            );
            h.controller.poll(start + Duration::from_secs(second as u64));
        }

        assert_eq!(engine.state().speed_changes, vec![0.8, 1.0, 0.8]);
        assert_eq!(h.controller.session().unwrap().current_speed(), 0.8);
    }

    #[test]
    fn test_diagnostics_label_includes_response_time() {
        let mut h = Harness::new();
        let start = h.start;
        h.controller
            .select(&source("A", &["http://a/a.m3u8"]), 0, start)
            .unwrap();
        let engine = h.hls.last_engine().unwrap();
        engine.set_bitrate(2_500_000.0);
        engine.set_buffer(Duration::from_secs(10), Duration::from_millis(17_250));

        h.controller.poll(start);
        assert_eq!(h.controller.diagnostics(), "  2.50 Mbps |   7.25 s | A");

        engine.emit(EngineEvent::IsPlayingChanged(true));
        h.pump(h.at(1500));
        assert_eq!(
            h.controller.diagnostics(),
            "  2.50 Mbps |   7.25 s | A | Response: 1.50 s"
        );
    }

    #[test]
    fn test_manual_mode_applies_clamped_speed() {
        let mut h = Harness::new();
        let start = h.start;
        h.controller
            .select(&source("A", &["http://a/a.m3u8"]), 0, start)
            .unwrap();

        h.controller.set_speed_mode(SpeedMode::Manual(0.2), start);

        let engine = h.hls.last_engine().unwrap();
        assert_eq!(engine.state().speed, 0.5);
        assert!(h.controller.diagnostics().ends_with("| D"));
    }

    #[test]
    fn test_unsupported_variant_still_tears_down() {
        let mut h = Harness::new();
        let start = h.start;
        h.controller
            .select(&source("A", &["http://a/a.m3u8"]), 0, start)
            .unwrap();

        let clip = MediaSource {
            streams: vec![StreamVariant::new("x", "http://a/clip.mp4", true)],
            ..source("Clip", &[])
        };
        let result = h.controller.select(&clip, 0, start);

        assert!(matches!(
            result,
            Err(PlaybackError::UnsupportedTransport {
                transport: TransportType::Unknown,
                ..
            })
        ));
        assert_eq!(h.journal.count("hls#1 release"), 1);
        assert!(h.controller.session().is_none());
        assert_eq!(
            h.controller.status(),
            "Unsupported stream type: \"unknown\" for Clip."
        );
    }

    #[test]
    fn test_missing_variant_keeps_current_session() {
        let mut h = Harness::new();
        let start = h.start;
        let news = source("News", &["http://a/news.m3u8"]);
        h.controller.select(&news, 0, start).unwrap();

        let result = h.controller.select(&news, 3, start);

        assert!(matches!(
            result,
            Err(PlaybackError::VariantNotFound { index: 3, .. })
        ));
        assert_eq!(h.journal.count("hls#1 release"), 0);
    }

    #[test]
    fn test_close_stops_timers() {
        let mut h = Harness::new();
        let start = h.start;
        h.controller
            .select(&source("A", &["http://a/a.mpd"]), 0, start)
            .unwrap();
        h.dash.last_engine().unwrap().emit(not_found());
        h.pump(start);

        h.controller.close();

        assert_eq!(h.controller.next_deadline(), None);
        assert_eq!(h.controller.poll(h.at(60_000)), None);
        assert_eq!(h.controller.diagnostics(), "");
        assert_eq!(h.controller.status(), "Playback stopped.");
        assert!(matches!(
            h.controller.reload(start),
            Err(PlaybackError::NoActiveSession)
        ));
    }

    #[test]
    fn test_tick_reschedules_at_interval() {
        let mut h = Harness::new();
        let start = h.start;
        h.controller
            .select(&source("A", &["http://a/a.m3u8"]), 0, start)
            .unwrap();

        assert_eq!(h.controller.poll(start), Some(h.at(1000)));
        // A late poll does not try to catch up on missed ticks.
        assert_eq!(h.controller.poll(h.at(5300)), Some(h.at(6300)));
    }
}
