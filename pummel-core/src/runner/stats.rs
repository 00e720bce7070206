use std::time::Duration;

use super::executor::Outcome;

/// Counters one worker accumulates; also the shape of the merged run totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequesterStats {
    /// Bytes of successful responses, header estimate included.
    pub total_response_bytes: u64,
    /// Sum of successful request durations.
    pub total_duration: Duration,
    /// `Duration::MAX` until the first success.
    pub min_request_time: Duration,
    pub max_request_time: Duration,
    pub num_requests: u64,
    pub num_errors: u64,
}

impl Default for RequesterStats {
    fn default() -> Self {
        Self {
            total_response_bytes: 0,
            total_duration: Duration::ZERO,
            min_request_time: Duration::MAX,
            max_request_time: Duration::ZERO,
            num_requests: 0,
            num_errors: 0,
        }
    }
}

impl RequesterStats {
    pub fn record(&mut self, outcome: &Outcome) {
        match *outcome {
            Outcome::Success { size, duration } => self.record_success(size, duration),
            Outcome::Failure(_) => self.record_error(),
        }
    }

    pub fn record_success(&mut self, size: u64, duration: Duration) {
        self.num_requests += 1;
        self.total_response_bytes = self.total_response_bytes.saturating_add(size);
        self.total_duration = self.total_duration.saturating_add(duration);
        self.min_request_time = self.min_request_time.min(duration);
        self.max_request_time = self.max_request_time.max(duration);
    }

    pub fn record_error(&mut self) {
        self.num_errors += 1;
    }

    pub fn merge(&mut self, other: &Self) {
        self.total_response_bytes = self
            .total_response_bytes
            .saturating_add(other.total_response_bytes);
        self.total_duration = self.total_duration.saturating_add(other.total_duration);
        self.min_request_time = self.min_request_time.min(other.min_request_time);
        self.max_request_time = self.max_request_time.max(other.max_request_time);
        self.num_requests += other.num_requests;
        self.num_errors += other.num_errors;
    }

    /// Successes plus failures.
    pub fn iterations(&self) -> u64 {
        self.num_requests + self.num_errors
    }

    /// Fastest successful request, if there was one.
    pub fn fastest(&self) -> Option<Duration> {
        (self.num_requests > 0).then_some(self.min_request_time)
    }
}
