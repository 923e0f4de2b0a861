//! Scripted playback runs against a simulated world.

use std::time::Duration;

use tilecast_core::MediaSource;
use tilecast_core::config::PlaybackConfig;
use tilecast_core::playback::{PlaybackController, RetryState};
use tokio::sync::mpsc;

use crate::SimulationError;
use crate::engine::{SimulatedWorld, WorldConfig};
use crate::network::NetworkProfile;

/// Controller state captured on one diagnostics tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickRecord {
    pub elapsed: Duration,
    pub diagnostics: String,
    pub speed: f32,
    pub retry: RetryState,
}

/// Outcome of a scenario run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioReport {
    pub ticks: Vec<TickRecord>,
    pub engines_created: usize,
    pub source_loads: u32,
    pub stalls: u32,
    pub response_time: Option<Duration>,
    pub final_status: String,
}

/// Runs a real controller against simulated engines in fixed time steps.
#[derive(Debug, Clone)]
pub struct PlaybackScenario {
    playback: PlaybackConfig,
    world: WorldConfig,
    network: NetworkProfile,
    duration: Duration,
    step: Duration,
}

impl PlaybackScenario {
    pub fn new(network: NetworkProfile) -> Self {
        Self {
            playback: PlaybackConfig::default(),
            world: WorldConfig::default(),
            network,
            duration: Duration::from_secs(30),
            step: Duration::from_millis(100),
        }
    }

    pub fn playback_config(mut self, config: PlaybackConfig) -> Self {
        self.playback = config;
        self
    }

    pub fn world_config(mut self, config: WorldConfig) -> Self {
        self.world = config;
        self
    }

    /// Simulated time to run for.
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Simulation step; engine events are delivered once per step.
    pub fn step(mut self, step: Duration) -> Self {
        self.step = step.max(Duration::from_millis(1));
        self
    }

    /// Answers the first `attempts` loads with a 404.
    pub fn fail_first(mut self, attempts: u32) -> Self {
        self.world.fail_first = attempts;
        self
    }

    /// Selects `variant_index` of `source` and runs until the duration elapses.
    ///
    /// # Errors
    /// - `SimulationError::Playback` - Variant missing or not playable
    /// - `SimulationError::InvalidTimeAdvance` - Step exceeds the clock's limit
    pub fn run(
        self,
        source: &MediaSource,
        variant_index: usize,
    ) -> Result<ScenarioReport, SimulationError> {
        let world = SimulatedWorld::new(self.world, self.network);
        let (events, mut event_receiver) = mpsc::unbounded_channel();
        let mut controller = PlaybackController::new(self.playback, world.selector(), events);

        controller.select(source, variant_index, world.now())?;
        tracing::info!(
            "Simulating {} for {:?} in {:?} steps",
            source.name,
            self.duration,
            self.step
        );

        let mut ticks = Vec::new();
        while world.elapsed() < self.duration {
            let now = world.advance(self.step)?;
            while let Ok(event) = event_receiver.try_recv() {
                controller.handle_event(event, now);
            }

            let tick_before = controller.session().and_then(|s| s.next_tick_at());
            controller.poll(now);

            if let Some(session) = controller.session()
                && session.next_tick_at() != tick_before
            {
                ticks.push(TickRecord {
                    elapsed: world.elapsed(),
                    diagnostics: controller.diagnostics().to_string(),
                    speed: session.current_speed(),
                    retry: session.retry_state(),
                });
            }
        }

        let response_time = controller
            .session()
            .and_then(|session| session.response().last_response());
        let final_status = controller.status().to_string();
        controller.close();

        Ok(ScenarioReport {
            ticks,
            engines_created: world.engines_created(),
            source_loads: world.source_loads(),
            stalls: world.stalls(),
            response_time,
            final_status,
        })
    }
}
