//! Mock engines for testing the playback controller.
//!
//! Every engine call is written to a shared [`CallJournal`] so tests can
//! assert on ordering across engines, e.g. that the previous engine was
//! released before the next one was created.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use super::engine::{
    EngineAdapter, EngineEvent, EngineEventSender, EngineFactory, EngineKind, SessionId,
};

/// Ordered log of engine calls shared between mock engines.
#[derive(Debug, Clone, Default)]
pub struct CallJournal {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.calls.lock().push(entry.into());
    }

    /// Snapshot of all recorded calls.
    pub fn entries(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Number of entries equal to `entry`.
    pub fn count(&self, entry: &str) -> usize {
        self.calls.lock().iter().filter(|e| *e == entry).count()
    }

    /// Index of the first entry equal to `entry`.
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.calls.lock().iter().position(|e| e == entry)
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

/// Observable state of a mock engine.
#[derive(Debug, Clone, PartialEq)]
pub struct MockEngineState {
    pub source: Option<String>,
    pub prepared: bool,
    pub playing: bool,
    pub released: bool,
    pub position: Duration,
    pub buffered: Duration,
    pub bitrate_bps: f64,
    pub speed: f32,
    pub speed_changes: Vec<f32>,
}

impl Default for MockEngineState {
    fn default() -> Self {
        Self {
            source: None,
            prepared: false,
            playing: false,
            released: false,
            position: Duration::ZERO,
            buffered: Duration::ZERO,
            bitrate_bps: 0.0,
            speed: 1.0,
            speed_changes: Vec::new(),
        }
    }
}

/// Test-side handle to a mock engine owned by the controller.
#[derive(Debug, Clone)]
pub struct MockEngineControl {
    label: String,
    state: Arc<Mutex<MockEngineState>>,
    events: EngineEventSender,
}

impl MockEngineControl {
    /// Journal label of the engine, e.g. `hls#1`.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn session(&self) -> SessionId {
        self.events.session()
    }

    pub fn state(&self) -> MockEngineState {
        self.state.lock().clone()
    }

    /// Sets what the engine reports from `is_playing`, without emitting an event.
    pub fn set_playing(&self, playing: bool) {
        self.state.lock().playing = playing;
    }

    pub fn set_buffer(&self, position: Duration, buffered: Duration) {
        let mut state = self.state.lock();
        state.position = position;
        state.buffered = buffered;
    }

    pub fn set_bitrate(&self, bits_per_second: f64) {
        self.state.lock().bitrate_bps = bits_per_second;
    }

    /// Emits an engine callback through the session's event sender.
    pub fn emit(&self, event: EngineEvent) -> bool {
        if let EngineEvent::IsPlayingChanged(playing) = event {
            self.set_playing(playing);
        }
        self.events.send(event)
    }
}

/// Engine recording its calls into a journal.
#[derive(Debug)]
pub struct MockEngine {
    label: String,
    state: Arc<Mutex<MockEngineState>>,
    journal: CallJournal,
}

impl MockEngine {
    fn log(&self, call: impl std::fmt::Display) {
        self.journal.record(format!("{} {call}", self.label));
    }
}

impl EngineAdapter for MockEngine {
    fn set_source(&mut self, url: &str) {
        self.log(format_args!("set_source {url}"));
        let mut state = self.state.lock();
        state.source = Some(url.to_string());
        state.prepared = false;
    }

    fn prepare(&mut self) {
        self.log("prepare");
        self.state.lock().prepared = true;
    }

    fn play(&mut self) {
        self.log("play");
    }

    fn release(&mut self) {
        self.log("release");
        let mut state = self.state.lock();
        state.released = true;
        state.playing = false;
    }

    fn current_position(&self) -> Duration {
        self.state.lock().position
    }

    fn buffered_position(&self) -> Duration {
        self.state.lock().buffered
    }

    fn bitrate_estimate(&self) -> f64 {
        self.state.lock().bitrate_bps
    }

    fn playback_speed(&self) -> f32 {
        self.state.lock().speed
    }

    fn set_speed(&mut self, factor: f32) {
        self.log(format_args!("set_speed {factor:.2}"));
        let mut state = self.state.lock();
        state.speed = factor;
        state.speed_changes.push(factor);
    }

    fn is_playing(&self) -> bool {
        self.state.lock().playing
    }
}

/// Factory producing journaled mock engines of one kind.
#[derive(Debug)]
pub struct MockEngineFactory {
    kind: EngineKind,
    journal: CallJournal,
    created: AtomicU32,
    engines: Mutex<Vec<MockEngineControl>>,
}

impl MockEngineFactory {
    pub fn new(kind: EngineKind, journal: CallJournal) -> Arc<Self> {
        Arc::new(Self {
            kind,
            journal,
            created: AtomicU32::new(0),
            engines: Mutex::new(Vec::new()),
        })
    }

    /// Number of engines created so far.
    pub fn created_count(&self) -> usize {
        self.engines.lock().len()
    }

    /// Control handle of the `index`-th created engine.
    pub fn engine(&self, index: usize) -> Option<MockEngineControl> {
        self.engines.lock().get(index).cloned()
    }

    pub fn last_engine(&self) -> Option<MockEngineControl> {
        self.engines.lock().last().cloned()
    }
}

impl EngineFactory for MockEngineFactory {
    fn kind(&self) -> EngineKind {
        self.kind
    }

    fn create(&self, events: EngineEventSender) -> Box<dyn EngineAdapter> {
        let number = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        let label = format!("{}#{number}", self.kind);
        self.journal.record(format!("create {label}"));

        let state = Arc::new(Mutex::new(MockEngineState::default()));
        self.engines.lock().push(MockEngineControl {
            label: label.clone(),
            state: state.clone(),
            events,
        });

        Box::new(MockEngine {
            label,
            state,
            journal: self.journal.clone(),
        })
    }
}
