//! The capture-and-pacing loop
//!
//! [`PacingController`] runs one session's ticks on the calling thread. Each
//! tick samples the region, composites the cursor, normalizes to the output
//! size, appends one frame, and refreshes the region position. The tick is
//! timed, and if the session has fallen behind wall-clock time the last
//! frame is appended again until the frame count matches
//! `elapsed / interval`. The residual interval is then slept.
//!
//! # Tick timeline
//!
//! ```text
//! |-- sample -- cursor -- normalize -- append -- position --|-- makeup --|-- sleep --|
//! |<--------------------- loop elapsed -------------------->|
//! ```
//!
//! Makeup appends happen after the tick timer stops, so they do not shorten
//! the following sleep. The stop flag is checked after makeup, so the tick
//! that observes a stop still writes its frame and any pending duplicates.

pub mod clock;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub use clock::{Clock, ManualClock, Stopwatch, SystemClock};
use image::RgbaImage;
use tracing::{debug, info, trace, warn};

use crate::capture::{CursorProvider, EncoderHandle, FrameSampler, PositionSource, SharedFrame};
use crate::constants;
use crate::error::RecordResult;
use crate::frame::{CursorCompositor, OutputSurface, blank_surface};
use crate::model::{OutputSize, SessionConfig, StopReason, TimingSample};
use crate::region::RegionTracker;
use crate::report::SessionStats;

/// What a completed loop hands to the reporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingOutcome {
    /// Final aggregates
    pub stats:            SessionStats,
    /// Wall time from the first tick to loop exit (ms)
    pub total_elapsed_ms: u64,
    /// `total_elapsed_ms / interval_ms`
    pub expected_frames:  u64,
    /// Why the loop ended
    pub stop_reason:      StopReason,
}

/// Collaborators the loop drives. Owned by the capture thread.
pub struct PacingInputs {
    /// Screen sampler
    pub sampler:   Box<dyn FrameSampler>,
    /// Cursor source; `None` records without a cursor
    pub cursor:    Option<Box<dyn CursorProvider>>,
    /// Host window position source
    pub positions: Box<dyn PositionSource>,
}

/// Runs the fixed-cadence tick loop for one session.
pub struct PacingController {
    clock:             Arc<dyn Clock>,
    interval_ms:       u64,
    max_ticks:         u64,
    max_makeup_frames: Option<u64>,
    burst_warn_frames: u64,
    tracker:           RegionTracker,
    sampler:           Box<dyn FrameSampler>,
    cursor:            Option<Box<dyn CursorProvider>>,
    compositor:        CursorCompositor,
    sampled:           RgbaImage,
    surface:           OutputSurface,
    stats:             SessionStats,
}

impl PacingController {
    /// Prepares a controller; allocates both surfaces once for the session.
    pub fn new(config: &SessionConfig, clock: Arc<dyn Clock>, inputs: PacingInputs) -> Self {
        let interval_ms = config.interval_ms();
        let region = config.region;
        let cursor = if config.include_cursor {
            inputs.cursor
        } else {
            None
        };

        Self {
            clock,
            interval_ms,
            max_ticks: config.max_ticks,
            max_makeup_frames: config.max_makeup_frames,
            burst_warn_frames: constants::MAKEUP_BURST_WARN_SECS * constants::FRAME_RATE_SCALE
                / interval_ms,
            tracker: RegionTracker::new(region, config.border, inputs.positions),
            sampler: inputs.sampler,
            cursor,
            compositor: CursorCompositor::new(config.border, config.cursor_offset),
            sampled: blank_surface(region.requested_width, region.requested_height),
            surface: OutputSurface::new(region.requested_width, region.requested_height),
            stats: SessionStats::default(),
        }
    }

    /// Encoded frame size
    pub fn output_size(&self) -> OutputSize {
        self.surface.size()
    }

    /// Aggregates so far
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Runs ticks until `stop` is observed or the tick ceiling is reached.
    ///
    /// # Errors
    ///
    /// Returns the sampler's error if screen capture becomes unavailable.
    /// Every other failure is counted and absorbed.
    pub fn run(
        &mut self,
        encoder: &mut dyn EncoderHandle,
        stop: &AtomicBool,
    ) -> RecordResult<PacingOutcome> {
        let session_watch = Stopwatch::start(self.clock.as_ref());
        let mut tick_watch = session_watch;

        info!(
            interval_ms = self.interval_ms,
            max_ticks = self.max_ticks,
            width = self.surface.size().width,
            height = self.surface.size().height,
            "Pacing loop started"
        );

        let stop_reason = loop {
            tick_watch.restart(self.clock.as_ref());
            let tick_index = self.stats.ticks_run;

            let frame = self.capture_frame()?;
            self.append(encoder, &frame);
            if let Err(e) = self.tracker.refresh() {
                trace!(tick = tick_index, error = %e, "Region not refreshed");
            }

            let elapsed_ms = tick_watch.elapsed_ms(self.clock.as_ref());
            let sample = TimingSample {
                tick_index,
                loop_elapsed_ms: elapsed_ms,
                deviation_ms: elapsed_ms.saturating_sub(self.interval_ms),
            };
            self.stats.record_tick(&sample);
            if sample.deviation_ms > 0 {
                debug!(
                    tick = sample.tick_index,
                    elapsed_ms = sample.loop_elapsed_ms,
                    deviation_ms = sample.deviation_ms,
                    "Tick overran interval"
                );
            } else {
                trace!(tick = sample.tick_index, elapsed_ms, "Tick");
            }

            self.write_makeup(encoder, session_watch.elapsed_ms(self.clock.as_ref()));

            if stop.load(Ordering::SeqCst) {
                break StopReason::Requested;
            }
            if self.stats.ticks_run >= self.max_ticks {
                break StopReason::TickCeiling;
            }

            self.clock.sleep(Duration::from_millis(
                self.interval_ms.saturating_sub(elapsed_ms),
            ));
        };

        self.stats.position_misses = self.tracker.misses();
        let total_elapsed_ms = session_watch.elapsed_ms(self.clock.as_ref());
        let outcome = PacingOutcome {
            stats: self.stats,
            total_elapsed_ms,
            expected_frames: total_elapsed_ms / self.interval_ms,
            stop_reason,
        };

        info!(
            ?stop_reason,
            ticks = outcome.stats.ticks_run,
            frames = outcome.stats.frames_written,
            expected = outcome.expected_frames,
            makeup = outcome.stats.makeup_frames,
            "Pacing loop finished"
        );
        Ok(outcome)
    }

    /// Sampler, compositor, and normalizer for one tick.
    fn capture_frame(&mut self) -> RecordResult<SharedFrame> {
        self.sampler
            .sample(self.tracker.sample_origin(), &mut self.sampled)?;

        if let Some(cursor) = self.cursor.as_mut() {
            match cursor.snapshot() {
                Ok(snapshot) => {
                    self.compositor
                        .composite(&mut self.sampled, self.tracker.region(), &snapshot);
                }
                Err(e) => {
                    self.stats.cursor_failures += 1;
                    if self.stats.cursor_failures == 1 {
                        warn!(error = %e, "Cursor query failed, omitting cursor");
                    } else {
                        debug!(error = %e, "Cursor query failed, omitting cursor");
                    }
                }
            }
        }

        Ok(self.surface.normalize(&self.sampled))
    }

    /// Appends a frame; every attempt counts as written.
    fn append(&mut self, encoder: &mut dyn EncoderHandle, frame: &SharedFrame) {
        self.stats.frames_written += 1;
        if let Err(e) = encoder.append_frame(frame) {
            self.stats.write_failures += 1;
            if self.stats.write_failures.is_power_of_two() {
                warn!(
                    error = %e,
                    failures = self.stats.write_failures,
                    "Encoder rejected frame"
                );
            }
        }
    }

    /// Duplicates the last frame until the frame count catches up with
    /// `session_elapsed_ms / interval`.
    fn write_makeup(&mut self, encoder: &mut dyn EncoderHandle, session_elapsed_ms: u64) {
        let expected = session_elapsed_ms / self.interval_ms;
        let mut pending = expected.saturating_sub(self.stats.frames_written);
        if pending == 0 {
            return;
        }

        if pending > self.burst_warn_frames {
            warn!(
                frames = pending,
                seconds = pending * self.interval_ms / constants::FRAME_RATE_SCALE,
                "Large makeup burst"
            );
        }
        if let Some(cap) = self.max_makeup_frames {
            pending = pending.min(cap);
        }

        debug!(frames = pending, "Writing makeup frames");
        let last = self.surface.last_frame();
        for _ in 0..pending {
            self.append(encoder, &last);
            self.stats.makeup_frames += 1;
        }
    }
}
