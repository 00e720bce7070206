use serde::Serialize;
use std::io::Write as _;

use pummel_core::{RunConfig, RunReport};

use super::OutputFormatter;

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn print_header(&self, _config: &RunConfig) {}

    fn print_report(&self, report: &RunReport) -> anyhow::Result<()> {
        let mut out = std::io::stdout().lock();
        match build_summary_line(report) {
            Some(line) => serde_json::to_writer(&mut out, &line)?,
            None => serde_json::to_writer(&mut out, &build_empty_line(report))?,
        }
        writeln!(out)?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSummaryLine {
    pub kind: &'static str,
    pub workers: usize,
    pub interrupted: bool,
    pub worker_failures: usize,

    pub requests_total: u64,
    pub errors_total: u64,
    pub bytes_received_total: u64,

    pub avg_worker_duration_secs: f64,
    pub requests_per_sec: f64,
    pub bytes_per_sec: f64,

    pub latency_mean_secs: f64,
    pub latency_min_secs: f64,
    pub latency_max_secs: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonEmptyLine {
    pub kind: &'static str,
    pub workers: usize,
    pub interrupted: bool,
    pub worker_failures: usize,
    pub errors_total: u64,
}

fn build_summary_line(report: &RunReport) -> Option<JsonSummaryLine> {
    let s = report.summary()?;
    Some(JsonSummaryLine {
        kind: "summary",
        workers: report.workers,
        interrupted: report.interrupted,
        worker_failures: report.failures.len(),

        requests_total: s.num_requests,
        errors_total: s.num_errors,
        bytes_received_total: s.total_response_bytes,

        avg_worker_duration_secs: s.avg_worker_duration.as_secs_f64(),
        requests_per_sec: s.requests_per_sec,
        bytes_per_sec: s.bytes_per_sec,

        latency_mean_secs: s.avg_request_time.as_secs_f64(),
        latency_min_secs: s.fastest.as_secs_f64(),
        latency_max_secs: s.slowest.as_secs_f64(),
    })
}

fn build_empty_line(report: &RunReport) -> JsonEmptyLine {
    JsonEmptyLine {
        kind: "empty",
        workers: report.workers,
        interrupted: report.interrupted,
        worker_failures: report.failures.len(),
        errors_total: report.stats.num_errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pummel_core::{Aggregator, RequesterStats, SessionReport};
    use serde_json::Value;
    use std::time::Duration;

    fn report(stats: RequesterStats) -> RunReport {
        let mut agg = Aggregator::new(2);
        for worker in 1..=2 {
            agg.fold(SessionReport {
                worker,
                stats: if worker == 1 {
                    stats
                } else {
                    RequesterStats::default()
                },
                error: None,
            });
        }
        agg.finish(true)
    }

    #[test]
    fn summary_line_has_totals() {
        let mut stats = RequesterStats::default();
        stats.record_success(10, Duration::from_millis(100));
        stats.record_success(30, Duration::from_millis(300));

        let line = build_summary_line(&report(stats))
            .unwrap_or_else(|| panic!("expected a summary line"));
        let v: Value = match serde_json::to_value(&line) {
            Ok(v) => v,
            Err(err) => panic!("to_value failed: {err}"),
        };

        assert_eq!(v.get("kind").and_then(Value::as_str), Some("summary"));
        assert_eq!(v.get("requests_total").and_then(Value::as_u64), Some(2));
        assert_eq!(v.get("bytes_received_total").and_then(Value::as_u64), Some(40));
        assert_eq!(v.get("workers").and_then(Value::as_u64), Some(2));
        assert_eq!(v.get("interrupted").and_then(Value::as_bool), Some(true));
        // 400ms of request time over two workers.
        assert_eq!(
            v.get("avg_worker_duration_secs").and_then(Value::as_f64),
            Some(0.2)
        );
    }

    #[test]
    fn empty_line_reports_errors() {
        let mut stats = RequesterStats::default();
        stats.record_error();
        let r = report(stats);

        assert!(build_summary_line(&r).is_none());
        let v: Value = match serde_json::to_value(build_empty_line(&r)) {
            Ok(v) => v,
            Err(err) => panic!("to_value failed: {err}"),
        };
        assert_eq!(v.get("kind").and_then(Value::as_str), Some("empty"));
        assert_eq!(v.get("errors_total").and_then(Value::as_u64), Some(1));
    }
}
