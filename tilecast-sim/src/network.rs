//! Seeded network throughput profiles.

use std::ops::Range;
use std::time::Duration;

use crate::SimulationError;
use crate::clock::DeterministicRng;

/// Throughput seen by simulated engines over simulation time.
///
/// Each sample is the base bandwidth scaled by a uniform jitter factor in
/// `[1 - jitter, 1 + jitter]`. Inside an outage window throughput is zero.
#[derive(Debug, Clone)]
pub struct NetworkProfile {
    bandwidth_bps: f64,
    jitter: f64,
    outages: Vec<Range<Duration>>,
    rng: DeterministicRng,
}

impl NetworkProfile {
    pub fn builder() -> NetworkProfileBuilder {
        NetworkProfileBuilder::default()
    }

    /// Steady throughput without jitter or outages.
    pub fn constant(bandwidth_bps: f64) -> Self {
        Self {
            bandwidth_bps: bandwidth_bps.max(0.0),
            jitter: 0.0,
            outages: Vec::new(),
            rng: DeterministicRng::from_seed(0),
        }
    }

    pub fn bandwidth_bps(&self) -> f64 {
        self.bandwidth_bps
    }

    /// Throughput at `elapsed` simulation time, in bits per second.
    pub fn sample_bps(&mut self, elapsed: Duration) -> f64 {
        if self.outages.iter().any(|window| window.contains(&elapsed)) {
            return 0.0;
        }
        if self.jitter == 0.0 {
            return self.bandwidth_bps;
        }
        let factor = self
            .rng
            .random_range_f64(1.0 - self.jitter, 1.0 + self.jitter);
        self.bandwidth_bps * factor
    }
}

/// Builder for [`NetworkProfile`].
#[derive(Debug, Clone)]
pub struct NetworkProfileBuilder {
    bandwidth_bps: f64,
    jitter: f64,
    outages: Vec<Range<Duration>>,
    seed: u64,
}

impl Default for NetworkProfileBuilder {
    fn default() -> Self {
        Self {
            bandwidth_bps: 5_000_000.0,
            jitter: 0.0,
            outages: Vec::new(),
            seed: 0,
        }
    }
}

impl NetworkProfileBuilder {
    pub fn bandwidth_bps(mut self, bandwidth_bps: f64) -> Self {
        self.bandwidth_bps = bandwidth_bps;
        self
    }

    /// Relative jitter in `[0, 1]`.
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    /// Adds a window of zero throughput.
    pub fn outage(mut self, window: Range<Duration>) -> Self {
        self.outages.push(window);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// # Errors
    /// - `SimulationError::InvalidProfile` - Bandwidth is not a positive
    ///   number or jitter is outside `[0, 1]`
    pub fn build(self) -> Result<NetworkProfile, SimulationError> {
        if !self.bandwidth_bps.is_finite() || self.bandwidth_bps <= 0.0 {
            return Err(SimulationError::InvalidProfile {
                reason: format!("bandwidth must be positive, got {}", self.bandwidth_bps),
            });
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(SimulationError::InvalidProfile {
                reason: format!("jitter must be within [0, 1], got {}", self.jitter),
            });
        }

        Ok(NetworkProfile {
            bandwidth_bps: self.bandwidth_bps,
            jitter: self.jitter,
            outages: self.outages,
            rng: DeterministicRng::from_seed(self.seed),
        })
    }
}
