//! Session timing aggregates and the end-of-run summary.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{OutputSize, StopReason, TimingSample};

/// Running aggregates folded from every [`TimingSample`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Ticks that ran to completion
    pub ticks_run:       u64,
    /// Sum of all per-tick deviations (ms)
    pub total_deviation: u64,
    /// Largest single-tick deviation (ms)
    pub max_deviation:   u64,
    /// Ticks that overran the interval
    pub deviation_count: u64,
    /// Frames handed to the encoder, including duplicates and failed writes
    pub frames_written:  u64,
    /// Duplicate frames written for drift correction
    pub makeup_frames:   u64,
    /// Appends the encoder rejected
    pub write_failures:  u64,
    /// Ticks where the cursor query failed
    pub cursor_failures: u64,
    /// Ticks where the host position was unavailable
    pub position_misses: u64,
}

impl SessionStats {
    /// Folds one tick's timing into the aggregates
    pub fn record_tick(&mut self, sample: &TimingSample) {
        self.ticks_run += 1;
        if sample.deviation_ms > 0 {
            self.deviation_count += 1;
            self.total_deviation += sample.deviation_ms;
            self.max_deviation = self.max_deviation.max(sample.deviation_ms);
        }
    }

    /// Mean deviation over all ticks (ms), 0 when nothing ran
    pub fn average_deviation(&self) -> f64 {
        if self.ticks_run == 0 {
            return 0.0;
        }
        self.total_deviation as f64 / self.ticks_run as f64
    }
}

/// End-of-session report, delivered to the host as text and available as
/// JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Output file
    pub output_path:      PathBuf,
    /// Encoded frame size
    pub output_size:      OutputSize,
    /// Nominal interval (ms)
    pub interval_ms:      u64,
    /// Wall time from first tick to loop exit (ms)
    pub total_elapsed_ms: u64,
    /// `total_elapsed_ms / interval_ms`
    pub expected_frames:  u64,
    /// Aggregates
    pub stats:            SessionStats,
    /// Why the loop ended
    pub stop_reason:      StopReason,
    /// Session start time
    pub started_at:       DateTime<Utc>,
    /// Session end time (after the encoder closed)
    pub ended_at:         DateTime<Utc>,
}

impl SessionSummary {
    /// Mean deviation over all ticks (ms)
    pub fn average_deviation(&self) -> f64 {
        self.stats.average_deviation()
    }

    /// Difference between frames written and frames expected
    pub fn frame_drift(&self) -> i64 {
        self.stats.frames_written as i64 - self.expected_frames as i64
    }
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Finished with {:.2}ms average framerate deviation, {}/{} total missed frames, and \
             {}ms maximum frame deviation.",
            self.average_deviation(),
            self.stats.deviation_count,
            self.stats.ticks_run,
            self.stats.max_deviation,
        )?;
        write!(
            f,
            "Found {} frames; expected {}.",
            self.stats.frames_written, self.expected_frames
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(tick_index: u64, deviation_ms: u64) -> TimingSample {
        TimingSample {
            tick_index,
            loop_elapsed_ms: 33 + deviation_ms,
            deviation_ms,
        }
    }

    #[test]
    fn test_record_tick_aggregates() {
        let mut stats = SessionStats::default();
        stats.record_tick(&sample(0, 0));
        stats.record_tick(&sample(1, 67));
        stats.record_tick(&sample(2, 5));
        stats.record_tick(&sample(3, 0));

        assert_eq!(stats.ticks_run, 4);
        assert_eq!(stats.deviation_count, 2);
        assert_eq!(stats.max_deviation, 67);
        assert_eq!(stats.total_deviation, 72);
        assert!((stats.average_deviation() - 18.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_stats_average() {
        assert_eq!(SessionStats::default().average_deviation(), 0.0);
    }

    #[test]
    fn test_summary_text() {
        let now = Utc::now();
        let summary = SessionSummary {
            output_path:      PathBuf::from("Output/output.mp4"),
            output_size:      OutputSize::for_requested(101, 50),
            interval_ms:      33,
            total_elapsed_ms: 396,
            expected_frames:  12,
            stats:            SessionStats {
                ticks_run: 10,
                total_deviation: 67,
                max_deviation: 67,
                deviation_count: 1,
                frames_written: 12,
                makeup_frames: 2,
                ..Default::default()
            },
            stop_reason:      StopReason::TickCeiling,
            started_at:       now,
            ended_at:         now,
        };

        let text = summary.to_string();
        assert!(text.contains("6.70ms average framerate deviation"));
        assert!(text.contains("1/10 total missed frames"));
        assert!(text.contains("67ms maximum frame deviation"));
        assert!(text.ends_with("Found 12 frames; expected 12."));
        assert_eq!(summary.frame_drift(), 0);
    }

    #[test]
    fn test_summary_json_fields() {
        let now = Utc::now();
        let summary = SessionSummary {
            output_path:      PathBuf::from("out.mp4"),
            output_size:      OutputSize::for_requested(2, 2),
            interval_ms:      33,
            total_elapsed_ms: 0,
            expected_frames:  0,
            stats:            SessionStats::default(),
            stop_reason:      StopReason::Requested,
            started_at:       now,
            ended_at:         now,
        };

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["stop_reason"], "requested");
        assert_eq!(json["output_size"]["width"], 2);
    }
}
