//! Simulated playback engines.
//!
//! All engines created by one [`SimulatedWorld`] share its clock and network
//! profile. Advancing the world downloads media into every live engine's
//! buffer, plays it back at the engine's speed and emits the same callbacks
//! a real engine would: buffering, ready, playing, stalls and 404s.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tilecast_core::playback::{
    EngineAdapter, EngineError, EngineErrorKind, EngineEvent, EngineEventSender, EngineFactory,
    EngineKind, EngineSelector, PlaybackState,
};

use crate::SimulationError;
use crate::clock::DeterministicClock;
use crate::network::NetworkProfile;

/// Weight of the newest sample in the engine's throughput estimate.
const ESTIMATE_SMOOTHING: f64 = 0.3;

/// Media and failure parameters shared by all simulated engines.
#[derive(Debug, Clone)]
pub struct WorldConfig {
    /// Encoded media bitrate; download speed divided by this gives buffer growth
    pub media_bitrate_bps: f64,
    /// Buffer needed before a buffering engine starts playing
    pub startup_buffer: Duration,
    /// Number of `play` calls answered with a 404 before any succeeds
    pub fail_first: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            media_bitrate_bps: 2_000_000.0,
            startup_buffer: Duration::from_secs(2),
            fail_first: 0,
        }
    }
}

#[derive(Debug)]
struct EngineModel {
    events: EngineEventSender,
    source: Option<String>,
    prepared: bool,
    state: PlaybackState,
    playing: bool,
    failed: bool,
    released: bool,
    position: Duration,
    buffered: Duration,
    speed: f32,
    estimate_bps: f64,
    loads: u32,
}

impl EngineModel {
    fn new(events: EngineEventSender) -> Self {
        Self {
            events,
            source: None,
            prepared: false,
            state: PlaybackState::Idle,
            playing: false,
            failed: false,
            released: false,
            position: Duration::ZERO,
            buffered: Duration::ZERO,
            speed: 1.0,
            estimate_bps: 0.0,
            loads: 0,
        }
    }

    fn is_loading(&self) -> bool {
        !self.released && !self.failed && self.state != PlaybackState::Idle
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            self.state = state;
            self.events.send(EngineEvent::StateChanged(state));
        }
    }

    fn set_playing(&mut self, playing: bool) {
        if self.playing != playing {
            self.playing = playing;
            self.events.send(EngineEvent::IsPlayingChanged(playing));
        }
    }
}

#[derive(Debug)]
struct WorldState {
    clock: DeterministicClock,
    network: NetworkProfile,
    config: WorldConfig,
    failures_remaining: u32,
    engines: Vec<EngineModel>,
    stalls: u32,
}

impl WorldState {
    /// Moves every loading engine forward by `step` at throughput `bps`.
    fn step_engines(&mut self, step: Duration, bps: f64) {
        let media_bitrate = self.config.media_bitrate_bps.max(1.0);
        let startup = self.config.startup_buffer;
        let mut stalls = 0;

        for engine in self.engines.iter_mut().filter(|e| e.is_loading()) {
            engine.estimate_bps = if engine.estimate_bps == 0.0 {
                bps
            } else {
                ESTIMATE_SMOOTHING * bps + (1.0 - ESTIMATE_SMOOTHING) * engine.estimate_bps
            };
            engine.buffered += step.mul_f64(bps / media_bitrate);

            if engine.playing {
                engine.position = (engine.position + step.mul_f32(engine.speed)).min(engine.buffered);
                if engine.position >= engine.buffered {
                    stalls += 1;
                    engine.set_playing(false);
                    engine.set_state(PlaybackState::Buffering);
                }
            } else if engine.buffered.saturating_sub(engine.position) >= startup {
                engine.set_state(PlaybackState::Ready);
                engine.set_playing(true);
            }
        }

        self.stalls += stalls;
    }
}

/// Shared clock, network and engine registry of one simulation.
#[derive(Debug, Clone)]
pub struct SimulatedWorld {
    state: Arc<Mutex<WorldState>>,
}

impl SimulatedWorld {
    pub fn new(config: WorldConfig, network: NetworkProfile) -> Self {
        let failures_remaining = config.fail_first;
        Self {
            state: Arc::new(Mutex::new(WorldState {
                clock: DeterministicClock::new(),
                network,
                config,
                failures_remaining,
                engines: Vec::new(),
                stalls: 0,
            })),
        }
    }

    pub fn now(&self) -> Instant {
        self.state.lock().clock.now()
    }

    pub fn elapsed(&self) -> Duration {
        self.state.lock().clock.elapsed()
    }

    /// Advances simulation time, streaming media into every live engine.
    ///
    /// # Errors
    /// - `SimulationError::InvalidTimeAdvance` - Step exceeds the clock's limit
    pub fn advance(&self, step: Duration) -> Result<Instant, SimulationError> {
        let mut state = self.state.lock();
        let elapsed = state.clock.elapsed();
        let now = state.clock.advance(step)?;
        let bps = state.network.sample_bps(elapsed);
        state.step_engines(step, bps);
        Ok(now)
    }

    /// Factory for one engine family backed by this world.
    pub fn factory(&self, kind: EngineKind) -> Arc<SimulatedEngineFactory> {
        Arc::new(SimulatedEngineFactory {
            kind,
            world: self.clone(),
        })
    }

    /// Selector with simulated engines for every transport.
    pub fn selector(&self) -> EngineSelector {
        EngineSelector::new()
            .with_factory(self.factory(EngineKind::Hls))
            .with_factory(self.factory(EngineKind::Dash))
            .with_factory(self.factory(EngineKind::Progressive))
    }

    /// Engines created so far, released or not.
    pub fn engines_created(&self) -> usize {
        self.state.lock().engines.len()
    }

    /// Engines not yet released.
    pub fn live_engines(&self) -> usize {
        self.state
            .lock()
            .engines
            .iter()
            .filter(|engine| !engine.released)
            .count()
    }

    /// Total `play` calls that loaded a source, across all engines.
    pub fn source_loads(&self) -> u32 {
        self.state.lock().engines.iter().map(|e| e.loads).sum()
    }

    /// Playback stalls caused by buffer exhaustion.
    pub fn stalls(&self) -> u32 {
        self.state.lock().stalls
    }

    fn register(&self, events: EngineEventSender) -> usize {
        let mut state = self.state.lock();
        state.engines.push(EngineModel::new(events));
        state.engines.len() - 1
    }

    fn with_engine<R>(&self, index: usize, f: impl FnOnce(&mut EngineModel) -> R) -> R {
        let mut state = self.state.lock();
        f(&mut state.engines[index])
    }
}

/// Engine adapter over a model inside a [`SimulatedWorld`].
#[derive(Debug)]
pub struct SimulatedEngine {
    kind: EngineKind,
    world: SimulatedWorld,
    index: usize,
}

impl SimulatedEngine {
    pub fn kind(&self) -> EngineKind {
        self.kind
    }
}

impl EngineAdapter for SimulatedEngine {
    fn set_source(&mut self, url: &str) {
        self.world.with_engine(self.index, |engine| {
            if engine.released {
                return;
            }
            engine.set_playing(false);
            engine.source = Some(url.to_string());
            engine.prepared = false;
            engine.failed = false;
            engine.state = PlaybackState::Idle;
            engine.position = Duration::ZERO;
            engine.buffered = Duration::ZERO;
        });
    }

    fn prepare(&mut self) {
        self.world.with_engine(self.index, |engine| {
            if !engine.released && engine.source.is_some() {
                engine.prepared = true;
            }
        });
    }

    fn play(&mut self) {
        let mut state = self.world.state.lock();
        let fail = state.failures_remaining > 0;
        let engine = &mut state.engines[self.index];
        if engine.released || !engine.prepared || engine.state != PlaybackState::Idle {
            return;
        }

        engine.loads += 1;
        if fail {
            engine.failed = true;
            let source = engine.source.clone().unwrap_or_default();
            engine.events.send(EngineEvent::Error(EngineError::new(
                EngineErrorKind::NotFound,
                format!("Response code: 404 for {source}"),
            )));
            state.failures_remaining -= 1;
            tracing::debug!("Simulated 404 for {}", source);
        } else {
            engine.set_state(PlaybackState::Buffering);
        }
    }

    fn release(&mut self) {
        self.world.with_engine(self.index, |engine| {
            engine.released = true;
            engine.playing = false;
        });
    }

    fn current_position(&self) -> Duration {
        self.world.with_engine(self.index, |engine| engine.position)
    }

    fn buffered_position(&self) -> Duration {
        self.world.with_engine(self.index, |engine| engine.buffered)
    }

    fn bitrate_estimate(&self) -> f64 {
        self.world.with_engine(self.index, |engine| engine.estimate_bps)
    }

    fn playback_speed(&self) -> f32 {
        self.world.with_engine(self.index, |engine| engine.speed)
    }

    fn set_speed(&mut self, factor: f32) {
        self.world
            .with_engine(self.index, |engine| engine.speed = factor);
    }

    fn is_playing(&self) -> bool {
        self.world.with_engine(self.index, |engine| engine.playing)
    }
}

/// Factory creating simulated engines inside a world.
#[derive(Debug)]
pub struct SimulatedEngineFactory {
    kind: EngineKind,
    world: SimulatedWorld,
}

impl EngineFactory for SimulatedEngineFactory {
    fn kind(&self) -> EngineKind {
        self.kind
    }

    fn create(&self, events: EngineEventSender) -> Box<dyn EngineAdapter> {
        let index = self.world.register(events);
        Box::new(SimulatedEngine {
            kind: self.kind,
            world: self.world.clone(),
            index,
        })
    }
}
