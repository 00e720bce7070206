use std::io::Write as _;

use pummel_core::{RunConfig, RunReport};

use super::OutputFormatter;
use super::format::{format_bytes, format_duration, format_rate};

pub(crate) struct HumanReadableOutput;

impl OutputFormatter for HumanReadableOutput {
    fn print_header(&self, config: &RunConfig) {
        println!(
            "Running {} test @ {}\n  {} worker(s) running concurrently",
            format_duration(config.duration),
            config.request.url,
            config.concurrency
        );
    }

    fn print_report(&self, report: &RunReport) -> anyhow::Result<()> {
        let mut out = std::io::stdout().lock();
        out.write_all(render_report(report).as_bytes())?;
        out.flush()?;
        Ok(())
    }
}

pub(crate) fn render_report(report: &RunReport) -> String {
    let Some(s) = report.summary() else {
        return "Error: No statistics collected / no requests found\n".to_string();
    };

    format!(
        "{} requests in {}, {} read\n\
         Requests/sec:\t\t{}\n\
         Transfer/sec:\t\t{}\n\
         Avg Req Time:\t\t{}\n\
         Fastest Request:\t{}\n\
         Slowest Request:\t{}\n\
         Number of Errors:\t{}\n",
        s.num_requests,
        format_duration(s.avg_worker_duration),
        format_bytes(s.total_response_bytes as f64),
        format_rate(s.requests_per_sec),
        format_bytes(s.bytes_per_sec),
        format_duration(s.avg_request_time),
        format_duration(s.fastest),
        format_duration(s.slowest),
        s.num_errors,
    )
}
