//! Time control and random number generation for deterministic simulations.

use std::time::{Duration, Instant};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::SimulationError;

/// Maximum time that can be advanced in a single step (24 hours).
const MAX_TIME_ADVANCE: Duration = Duration::from_secs(86400);

/// Advance-only simulation clock, independent of wall-clock time.
#[derive(Debug, Clone)]
pub struct DeterministicClock {
    current_time: Instant,
    start_time: Instant,
}

impl Default for DeterministicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl DeterministicClock {
    /// Creates a clock at simulation time zero.
    pub fn new() -> Self {
        let start = Instant::now();
        Self {
            current_time: start,
            start_time: start,
        }
    }

    pub fn now(&self) -> Instant {
        self.current_time
    }

    /// Simulation time since start.
    pub fn elapsed(&self) -> Duration {
        self.current_time.duration_since(self.start_time)
    }

    /// Advances simulation time.
    ///
    /// # Errors
    /// - `SimulationError::InvalidTimeAdvance` - Step exceeds 24 hours
    pub fn advance(&mut self, duration: Duration) -> Result<Instant, SimulationError> {
        if duration > MAX_TIME_ADVANCE {
            return Err(SimulationError::InvalidTimeAdvance {
                reason: format!("{duration:?} exceeds the 24 hour step limit"),
            });
        }
        self.current_time += duration;
        Ok(self.current_time)
    }
}

/// Seeded ChaCha8 generator so every run with the same seed matches.
#[derive(Debug, Clone)]
pub struct DeterministicRng {
    rng: ChaCha8Rng,
}

impl DeterministicRng {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Random number in `[0, 1)`.
    pub fn random_f64(&mut self) -> f64 {
        (self.rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Random number in `[min, max)`; `min` when the range is empty.
    pub fn random_range_f64(&mut self, min: f64, max: f64) -> f64 {
        if min >= max {
            return min;
        }
        min + self.random_f64() * (max - min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_advances_forward_only() {
        let mut clock = DeterministicClock::new();
        let start = clock.now();

        let now = clock.advance(Duration::from_millis(250)).unwrap();
        assert_eq!(now, start + Duration::from_millis(250));
        assert_eq!(clock.elapsed(), Duration::from_millis(250));

        assert!(clock.advance(Duration::from_secs(86401)).is_err());
        assert_eq!(clock.elapsed(), Duration::from_millis(250));
    }

    #[test]
    fn test_rng_is_reproducible() {
        let mut a = DeterministicRng::from_seed(7);
        let mut b = DeterministicRng::from_seed(7);

        for _ in 0..32 {
            assert_eq!(a.random_f64(), b.random_f64());
        }

        let mut c = DeterministicRng::from_seed(8);
        assert_ne!(a.random_f64(), c.random_f64());
    }

    #[test]
    fn test_rng_range_bounds() {
        let mut rng = DeterministicRng::from_seed(1);
        for _ in 0..1000 {
            let value = rng.random_range_f64(0.5, 1.5);
            assert!((0.5..1.5).contains(&value));
        }
        assert_eq!(rng.random_range_f64(2.0, 1.0), 2.0);
    }
}
