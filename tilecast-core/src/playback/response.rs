//! Time from source request to first playback.

use std::time::{Duration, Instant};

/// Measures how long a source takes to start playing.
#[derive(Debug, Clone, Default)]
pub struct ResponseTimeTracker {
    requested_at: Option<Instant>,
    last_response: Option<Duration>,
}

impl ResponseTimeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the moment a source was handed to the engine.
    pub fn start_request(&mut self, now: Instant) {
        self.requested_at = Some(now);
    }

    /// Records first playback. No-op without a preceding request.
    pub fn record_response(&mut self, now: Instant) {
        if let Some(requested_at) = self.requested_at.take() {
            self.last_response = Some(now.saturating_duration_since(requested_at));
        }
    }

    pub fn last_response(&self) -> Option<Duration> {
        self.last_response
    }

    /// `Response: 1.23 s`, or empty before the first response.
    pub fn label(&self) -> String {
        match self.last_response {
            Some(elapsed) => format!("Response: {:.2} s", elapsed.as_secs_f64()),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measures_request_to_playback() {
        let start = Instant::now();
        let mut tracker = ResponseTimeTracker::new();
        assert_eq!(tracker.label(), "");

        tracker.start_request(start);
        tracker.record_response(start + Duration::from_millis(1234));

        assert_eq!(tracker.last_response(), Some(Duration::from_millis(1234)));
        assert_eq!(tracker.label(), "Response: 1.23 s");
    }

    #[test]
    fn test_response_without_request_is_ignored() {
        let start = Instant::now();
        let mut tracker = ResponseTimeTracker::new();

        tracker.record_response(start);
        assert_eq!(tracker.last_response(), None);

        tracker.start_request(start);
        tracker.record_response(start + Duration::from_secs(2));
        // A second playing event keeps the first measurement.
        tracker.record_response(start + Duration::from_secs(9));
        assert_eq!(tracker.last_response(), Some(Duration::from_secs(2)));
    }
}
