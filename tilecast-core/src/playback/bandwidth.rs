//! Bounded history of engine throughput samples.

use std::collections::VecDeque;
use std::time::Instant;

/// One throughput observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandwidthSample {
    pub bits_per_second: f64,
    pub timestamp: Instant,
}

impl BandwidthSample {
    pub fn megabits_per_second(&self) -> f64 {
        self.bits_per_second / 1_000_000.0
    }
}

/// Keeps the most recent throughput samples reported by the engine.
///
/// The engine already smooths its own estimate; this history only feeds
/// diagnostics and the windowed average.
#[derive(Debug, Clone)]
pub struct BandwidthEstimator {
    samples: VecDeque<BandwidthSample>,
    capacity: usize,
}

impl BandwidthEstimator {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Records a sample, evicting the oldest once full.
    ///
    /// Negative or non-finite estimates are stored as zero.
    pub fn record(&mut self, bits_per_second: f64, timestamp: Instant) {
        let bits_per_second = if bits_per_second.is_finite() {
            bits_per_second.max(0.0)
        } else {
            0.0
        };

        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(BandwidthSample {
            bits_per_second,
            timestamp,
        });
    }

    pub fn latest(&self) -> Option<BandwidthSample> {
        self.samples.back().copied()
    }

    /// Mean throughput over the retained window, in bits per second.
    pub fn average_bps(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let total: f64 = self.samples.iter().map(|s| s.bits_per_second).sum();
        Some(total / self.samples.len() as f64)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_window_is_bounded() {
        let start = Instant::now();
        let mut estimator = BandwidthEstimator::new(3);

        for i in 0..5 {
            estimator.record(i as f64 * 1_000_000.0, start + Duration::from_secs(i));
        }

        assert_eq!(estimator.len(), 3);
        assert_eq!(estimator.latest().unwrap().megabits_per_second(), 4.0);
        assert_eq!(estimator.average_bps(), Some(3_000_000.0));
    }

    #[test]
    fn test_invalid_estimates_clamp_to_zero() {
        let mut estimator = BandwidthEstimator::new(4);
        estimator.record(f64::NAN, Instant::now());
        estimator.record(-5.0, Instant::now());

        assert_eq!(estimator.average_bps(), Some(0.0));
    }

    #[test]
    fn test_empty_has_no_average() {
        let estimator = BandwidthEstimator::new(0);
        assert!(estimator.is_empty());
        assert_eq!(estimator.average_bps(), None);
    }
}
