//! Sampler latency probe
//!
//! Samples one region repeatedly, the way a recording would, and reports
//! how long each sample took against the tick interval. A p95 above the
//! interval means the session would fall behind and lean on duplicate
//! frames.

use std::thread;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use image::RgbaImage;
use regioncast_core::capture::{FrameSampler, XcapSampler};
use regioncast_core::constants;
use regioncast_core::pacing::{Stopwatch, SystemClock};
use serde::Serialize;
use tracing::{debug, warn};

use crate::Geometry;

#[derive(Args, Debug)]
pub(crate) struct ProbeArgs {
    #[command(flatten)]
    geometry: Geometry,
    /// Number of samples to take
    #[arg(long, default_value_t = 30)]
    samples: u32,
    /// Tick interval in milliseconds to compare against
    #[arg(long)]
    interval: Option<u64>,
    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct ProbeReport {
    width:         u32,
    height:        u32,
    samples:       usize,
    failures:      u32,
    interval_ms:   u64,
    min_ms:        f64,
    max_ms:        f64,
    mean_ms:       f64,
    p50_ms:        f64,
    p95_ms:        f64,
    p99_ms:        f64,
    /// Samples slower than one interval
    over_interval: usize,
    within_budget: bool,
}

/// Runs the probe and prints the report. Returns whether p95 fits in one
/// interval.
pub(crate) fn run(args: &ProbeArgs) -> Result<bool> {
    let region = args.geometry.region();
    let origin = region.sample_origin(&args.geometry.insets());
    let interval = Duration::from_millis(args.interval.unwrap_or_else(constants::interval_ms));

    let mut sampler = XcapSampler::new()?;
    let mut surface = RgbaImage::new(region.requested_width.max(1), region.requested_height.max(1));
    let clock = SystemClock::new();

    let mut durations = Vec::with_capacity(args.samples as usize);
    let mut failures = 0;
    for i in 0..args.samples {
        let tick = Stopwatch::start(&clock);
        let result = sampler.sample(origin, &mut surface);
        let elapsed = tick.elapsed(&clock);

        match result {
            Ok(()) => durations.push(elapsed),
            Err(e) => {
                warn!(sample = i, error = %e, "Sample failed");
                failures += 1;
            }
        }
        debug!(sample = i, elapsed_ms = elapsed.as_secs_f64() * 1000.0, "Sampled");

        if let Some(rest) = interval.checked_sub(elapsed) {
            thread::sleep(rest);
        }
    }

    let report = summarize(
        &durations,
        failures,
        interval,
        (surface.width(), surface.height()),
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(report.within_budget)
}

fn summarize(
    durations: &[Duration],
    failures: u32,
    interval: Duration,
    (width, height): (u32, u32),
) -> ProbeReport {
    let mut sorted = durations.to_vec();
    sorted.sort();

    let ms = |d: Duration| d.as_nanos() as f64 / 1_000_000.0;
    let mean = if sorted.is_empty() {
        Duration::ZERO
    } else {
        sorted.iter().sum::<Duration>() / sorted.len() as u32
    };
    let p95 = percentile(&sorted, 95.0);

    ProbeReport {
        width,
        height,
        samples: sorted.len(),
        failures,
        interval_ms: interval.as_millis() as u64,
        min_ms: sorted.first().copied().map_or(0.0, ms),
        max_ms: sorted.last().copied().map_or(0.0, ms),
        mean_ms: ms(mean),
        p50_ms: ms(percentile(&sorted, 50.0)),
        p95_ms: ms(p95),
        p99_ms: ms(percentile(&sorted, 99.0)),
        over_interval: sorted.iter().filter(|d| **d > interval).count(),
        within_budget: !sorted.is_empty() && p95 <= interval,
    }
}

/// Nearest-rank percentile of an ascending slice
fn percentile(sorted: &[Duration], pct: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }

    let index = (pct / 100.0 * sorted.len() as f64).ceil() as usize;
    let index = index.min(sorted.len()).saturating_sub(1);
    sorted[index]
}

fn print_report(report: &ProbeReport) {
    println!(
        "Sampled {}x{} region {} times ({} failed)",
        report.width, report.height, report.samples, report.failures
    );
    println!("  min:  {:.2}ms", report.min_ms);
    println!("  mean: {:.2}ms", report.mean_ms);
    println!("  p50:  {:.2}ms", report.p50_ms);
    println!("  p95:  {:.2}ms", report.p95_ms);
    println!("  p99:  {:.2}ms", report.p99_ms);
    println!("  max:  {:.2}ms", report.max_ms);
    println!(
        "  {}/{} samples exceeded the {}ms interval",
        report.over_interval, report.samples, report.interval_ms
    );

    if report.within_budget {
        println!("OK: p95 fits in one interval");
    } else {
        println!("SLOW: p95 exceeds the interval; expect duplicate frames");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(values: &[u64]) -> Vec<Duration> {
        values.iter().map(|v| Duration::from_millis(*v)).collect()
    }

    #[test]
    fn test_percentile_nearest_rank() {
        let sorted = ms(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(percentile(&sorted, 50.0), Duration::from_millis(5));
        assert_eq!(percentile(&sorted, 95.0), Duration::from_millis(10));
        assert_eq!(percentile(&sorted, 0.0), Duration::from_millis(1));
        assert_eq!(percentile(&[], 95.0), Duration::ZERO);
    }

    #[test]
    fn test_summary_within_budget() {
        let report = summarize(&ms(&[12, 10, 14, 11]), 0, Duration::from_millis(33), (64, 48));

        assert!(report.within_budget);
        assert_eq!(report.samples, 4);
        assert_eq!(report.over_interval, 0);
        assert_eq!(report.min_ms, 10.0);
        assert_eq!(report.max_ms, 14.0);
        assert_eq!(report.mean_ms, 11.75);
    }

    #[test]
    fn test_summary_slow_sampler() {
        let report = summarize(
            &ms(&[20, 40, 45, 50, 30]),
            1,
            Duration::from_millis(33),
            (1920, 1080),
        );

        assert!(!report.within_budget);
        assert_eq!(report.over_interval, 3);
        assert_eq!(report.failures, 1);
        assert_eq!(report.p50_ms, 40.0);
    }

    #[test]
    fn test_summary_with_no_successful_samples() {
        let report = summarize(&[], 30, Duration::from_millis(33), (8, 8));
        assert!(!report.within_budget);
        assert_eq!(report.mean_ms, 0.0);
    }
}
