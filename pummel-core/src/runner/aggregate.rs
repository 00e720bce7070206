use std::time::Duration;

use super::session::{SessionError, SessionReport};
use super::stats::RequesterStats;

/// A worker that stopped because of an error rather than its deadline.
#[derive(Debug)]
pub struct WorkerFailure {
    pub worker: u64,
    pub error: SessionError,
}

/// Folds worker reports as they arrive.
#[derive(Debug)]
pub struct Aggregator {
    expected: usize,
    received: usize,
    stats: RequesterStats,
    failures: Vec<WorkerFailure>,
}

impl Aggregator {
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            received: 0,
            stats: RequesterStats::default(),
            failures: Vec::new(),
        }
    }

    pub fn fold(&mut self, report: SessionReport) {
        self.received += 1;
        self.stats.merge(&report.stats);
        if let Some(error) = report.error {
            self.failures.push(WorkerFailure {
                worker: report.worker,
                error,
            });
        }
    }

    pub fn received(&self) -> usize {
        self.received
    }

    pub fn is_complete(&self) -> bool {
        self.received >= self.expected
    }

    pub fn finish(mut self, interrupted: bool) -> RunReport {
        self.failures.sort_by_key(|f| f.worker);
        RunReport {
            stats: self.stats,
            workers: self.expected,
            interrupted,
            failures: self.failures,
        }
    }
}

#[derive(Debug)]
pub struct RunReport {
    /// Totals merged across every worker.
    pub stats: RequesterStats,
    /// Number of workers the run was configured with.
    pub workers: usize,
    /// Cancelled before the duration elapsed, by the user or by a script.
    pub interrupted: bool,
    pub failures: Vec<WorkerFailure>,
}

impl RunReport {
    /// `None` when no request succeeded.
    pub fn summary(&self) -> Option<Summary> {
        Summary::new(&self.stats, self.workers)
    }
}

/// Derived numbers for the final report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub num_requests: u64,
    pub num_errors: u64,
    pub total_response_bytes: u64,
    /// Total request time divided by the worker count.
    pub avg_worker_duration: Duration,
    pub requests_per_sec: f64,
    pub bytes_per_sec: f64,
    pub avg_request_time: Duration,
    pub fastest: Duration,
    pub slowest: Duration,
}

impl Summary {
    pub fn new(stats: &RequesterStats, workers: usize) -> Option<Self> {
        if stats.num_requests == 0 || workers == 0 {
            return None;
        }

        let avg_worker_duration = div_duration(stats.total_duration, workers as u128);
        let avg_request_time = div_duration(stats.total_duration, u128::from(stats.num_requests));

        let secs = avg_worker_duration.as_secs_f64();
        let per_sec = |v: u64| if secs > 0.0 { v as f64 / secs } else { 0.0 };

        Some(Self {
            num_requests: stats.num_requests,
            num_errors: stats.num_errors,
            total_response_bytes: stats.total_response_bytes,
            avg_worker_duration,
            requests_per_sec: per_sec(stats.num_requests),
            bytes_per_sec: per_sec(stats.total_response_bytes),
            avg_request_time,
            fastest: stats.min_request_time,
            slowest: stats.max_request_time,
        })
    }
}

fn div_duration(total: Duration, by: u128) -> Duration {
    let nanos = total.as_nanos() / by.max(1);
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}
