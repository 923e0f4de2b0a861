//! Tilecast Simulation - Deterministic playback engines for testing.
//!
//! Runs the real [`tilecast_core::PlaybackController`] against simulated
//! engines whose buffers fill from a seeded network profile. Time only moves
//! when the simulation advances it, so a scenario with the same seed always
//! produces the same diagnostics, retries and stalls.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use tilecast_core::{MediaSource, StreamVariant};
//! use tilecast_sim::{NetworkProfile, PlaybackScenario};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let network = NetworkProfile::builder()
//!     .bandwidth_bps(4_000_000.0)
//!     .jitter(0.3)
//!     .seed(42)
//!     .build()?;
//!
//! let source = MediaSource {
//!     name: "News".to_string(),
//!     group: String::new(),
//!     logo_url: None,
//!     streams: vec![StreamVariant::new("hd", "http://tv.local/news.m3u8", true)],
//! };
//!
//! let report = PlaybackScenario::new(network)
//!     .duration(Duration::from_secs(30))
//!     .fail_first(2)
//!     .run(&source, 0)?;
//!
//! for tick in &report.ticks {
//!     println!("{:>5.1}s {}", tick.elapsed.as_secs_f64(), tick.diagnostics);
//! }
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod engine;
pub mod network;
pub mod scenario;

pub use clock::{DeterministicClock, DeterministicRng};
pub use engine::{SimulatedEngine, SimulatedEngineFactory, SimulatedWorld, WorldConfig};
pub use network::{NetworkProfile, NetworkProfileBuilder};
pub use scenario::{PlaybackScenario, ScenarioReport, TickRecord};

use tilecast_core::PlaybackError;

/// Errors raised while setting up or running a simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("Invalid time advance: {reason}")]
    InvalidTimeAdvance { reason: String },

    #[error("Invalid network profile: {reason}")]
    InvalidProfile { reason: String },

    #[error("Playback failed: {0}")]
    Playback(#[from] PlaybackError),
}
