//! Mock collaborators for testing
//!
//! These implementations of the capture traits need no display server and no
//! encoder binary. Paired with [`ManualClock`](crate::pacing::ManualClock)
//! they make pacing behaviour fully deterministic: the sampler advances the
//! clock by a scripted cost per tick instead of doing real work.
//!
//! # Features
//!
//! - **Synthetic frames:** [`MockSampler`] writes a test pattern derived from
//!   the sampling origin, so region moves are visible in the output
//! - **Scripted tick cost:** simulate slow ticks at exact millisecond values
//! - **Error injection:** fail a specific tick, the cursor query, the encoder
//!   open, or individual frame writes
//! - **Inspection:** [`MockEncoder`] records every frame and the open
//!   parameters behind a shared handle that tests keep after the sink moves
//!   into a session
//!
//! # Examples
//!
//! ```
//! use regioncast_core::capture::mock::{MockEncoder, MockSampler};
//! use regioncast_core::pacing::ManualClock;
//!
//! let clock = ManualClock::new();
//! let sampler = MockSampler::new().with_tick_costs(clock.clone(), vec![33, 100, 33]);
//! let encoder = MockEncoder::new();
//! let frames = encoder.recorded();
//! assert!(frames.frames().is_empty());
//! # drop(sampler);
//! ```

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use parking_lot::Mutex;

use super::{
    CursorProvider, EncoderHandle, EncoderParams, EncoderSink, FrameSampler, PositionSource,
    SharedFrame,
};
use crate::error::{RecordError, RecordResult};
use crate::model::{BackendType, CursorGlyph, CursorSnapshot, ScreenPoint};
use crate::pacing::ManualClock;

/// Writes the synthetic test pattern for a surface sampled at `origin`.
///
/// Each pixel encodes its absolute screen coordinate, so two samples from
/// different origins never produce the same surface.
pub fn test_pattern(origin: ScreenPoint, dest: &mut RgbaImage) {
    for (x, y, pixel) in dest.enumerate_pixels_mut() {
        let sx = origin.x + x as i32;
        let sy = origin.y + y as i32;
        *pixel = Rgba([sx as u8, sy as u8, (sx ^ sy) as u8, 255]);
    }
}

/// Mock screen sampler
#[derive(Debug, Default)]
pub struct MockSampler {
    clock:        Option<ManualClock>,
    tick_costs:   VecDeque<u64>,
    default_cost: u64,
    fail_at:      Option<(u64, RecordError)>,
    calls:        u64,
    origins:      Arc<Mutex<Vec<ScreenPoint>>>,
}

impl MockSampler {
    /// Creates a sampler that costs no time
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances `clock` by `costs[n]` milliseconds on the n-th sample, then
    /// by the default cost once the script runs out.
    pub fn with_tick_costs(mut self, clock: ManualClock, costs: Vec<u64>) -> Self {
        self.clock = Some(clock);
        self.tick_costs = costs.into();
        self
    }

    /// Cost applied after the scripted costs are used up
    pub fn with_default_cost(mut self, clock: ManualClock, cost_ms: u64) -> Self {
        self.clock = Some(clock);
        self.default_cost = cost_ms;
        self
    }

    /// Fails the sample with the given zero-based index
    pub fn with_error_at(mut self, sample_index: u64, error: RecordError) -> Self {
        self.fail_at = Some((sample_index, error));
        self
    }

    /// Fails the given sample as if the display went away
    pub fn with_capture_lost_at(self, sample_index: u64) -> Self {
        self.with_error_at(sample_index, RecordError::CaptureUnavailable {
            backend: BackendType::None,
            reason:  "mock display disconnected".to_string(),
        })
    }

    /// Origins of every sample taken so far
    pub fn origins(&self) -> Arc<Mutex<Vec<ScreenPoint>>> {
        Arc::clone(&self.origins)
    }
}

impl FrameSampler for MockSampler {
    fn sample(&mut self, origin: ScreenPoint, dest: &mut RgbaImage) -> RecordResult<()> {
        let index = self.calls;
        self.calls += 1;

        if let Some(clock) = &self.clock {
            let cost = self.tick_costs.pop_front().unwrap_or(self.default_cost);
            clock.advance_ms(cost);
        }

        if matches!(self.fail_at, Some((at, _)) if at == index) {
            if let Some((_, error)) = self.fail_at.take() {
                return Err(error);
            }
        }

        self.origins.lock().push(origin);
        test_pattern(origin, dest);
        Ok(())
    }
}

/// Mock cursor with scripted visibility
#[derive(Debug)]
pub struct MockCursor {
    position:   ScreenPoint,
    glyph:      Arc<CursorGlyph>,
    visibility: VecDeque<bool>,
    failing:    HashSet<u64>,
    calls:      u64,
}

impl MockCursor {
    /// A cursor that is always visible at `position` with a 2x2 red glyph
    pub fn new(position: ScreenPoint) -> Self {
        Self {
            position,
            glyph: Arc::new(CursorGlyph {
                handle: 0xC0FFEE,
                image:  RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255])),
            }),
            visibility: VecDeque::new(),
            failing: HashSet::new(),
            calls: 0,
        }
    }

    /// Per-query visibility; the cursor stays visible once the script runs out
    pub fn with_visibility(mut self, script: Vec<bool>) -> Self {
        self.visibility = script.into();
        self
    }

    /// Makes the given zero-based queries fail
    pub fn with_failures(mut self, queries: impl IntoIterator<Item = u64>) -> Self {
        self.failing = queries.into_iter().collect();
        self
    }
}

impl CursorProvider for MockCursor {
    fn snapshot(&mut self) -> RecordResult<CursorSnapshot> {
        let index = self.calls;
        self.calls += 1;

        if self.failing.contains(&index) {
            return Err(RecordError::CursorQueryFailed {
                reason: format!("mock failure on query {}", index),
            });
        }

        if self.visibility.pop_front().unwrap_or(true) {
            Ok(CursorSnapshot::visible(
                self.position.x,
                self.position.y,
                Arc::clone(&self.glyph),
            ))
        } else {
            Ok(CursorSnapshot::hidden())
        }
    }
}

/// Frames and lifecycle calls observed by a [`MockEncoder`]
#[derive(Debug, Default)]
pub struct EncoderRecord {
    params:       Option<EncoderParams>,
    frames:       Vec<SharedFrame>,
    write_errors: u64,
    closed:       bool,
}

impl EncoderRecord {
    /// Parameters of the last successful open
    pub fn params(&self) -> Option<&EncoderParams> {
        self.params.as_ref()
    }

    /// Frames accepted so far, in order
    pub fn frames(&self) -> &[SharedFrame] {
        &self.frames
    }

    /// Number of rejected appends
    pub fn write_errors(&self) -> u64 {
        self.write_errors
    }

    /// Whether `close` was called
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Cloneable view of an [`EncoderRecord`]
#[derive(Debug, Clone, Default)]
pub struct RecordedFrames(Arc<Mutex<EncoderRecord>>);

impl RecordedFrames {
    /// Frames accepted so far
    pub fn frames(&self) -> Vec<SharedFrame> {
        self.0.lock().frames.clone()
    }

    /// Number of accepted frames
    pub fn frame_count(&self) -> usize {
        self.0.lock().frames.len()
    }

    /// Runs `f` with the full record
    pub fn with<R>(&self, f: impl FnOnce(&EncoderRecord) -> R) -> R {
        f(&self.0.lock())
    }
}

/// Mock encoder sink
#[derive(Debug, Default)]
pub struct MockEncoder {
    record:       RecordedFrames,
    open_error:   Option<String>,
    failing:      Arc<HashSet<u64>>,
    append_clock: Option<(ManualClock, u64)>,
}

impl MockEncoder {
    /// Creates an encoder that accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `open` fail with `reason`
    pub fn with_open_error(mut self, reason: impl Into<String>) -> Self {
        self.open_error = Some(reason.into());
        self
    }

    /// Rejects the appends with the given zero-based indices
    pub fn with_write_failures(mut self, appends: impl IntoIterator<Item = u64>) -> Self {
        self.failing = Arc::new(appends.into_iter().collect());
        self
    }

    /// Advances `clock` by `cost_ms` on every append
    pub fn with_append_cost(mut self, clock: ManualClock, cost_ms: u64) -> Self {
        self.append_clock = Some((clock, cost_ms));
        self
    }

    /// Shared view of what this encoder receives
    pub fn recorded(&self) -> RecordedFrames {
        self.record.clone()
    }
}

impl EncoderSink for MockEncoder {
    fn open(&self, params: &EncoderParams) -> RecordResult<Box<dyn EncoderHandle>> {
        if let Some(reason) = &self.open_error {
            return Err(RecordError::EncoderOpenFailed {
                path:   params.path.clone(),
                reason: reason.clone(),
            });
        }

        {
            let mut record = self.record.0.lock();
            record.params = Some(params.clone());
            record.frames.clear();
            record.write_errors = 0;
            record.closed = false;
        }

        Ok(Box::new(MockEncoderHandle {
            record:       self.record.clone(),
            failing:      Arc::clone(&self.failing),
            append_clock: self.append_clock.clone(),
            appends:      0,
        }))
    }
}

struct MockEncoderHandle {
    record:       RecordedFrames,
    failing:      Arc<HashSet<u64>>,
    append_clock: Option<(ManualClock, u64)>,
    appends:      u64,
}

impl EncoderHandle for MockEncoderHandle {
    fn append_frame(&mut self, frame: &SharedFrame) -> RecordResult<()> {
        let index = self.appends;
        self.appends += 1;

        if let Some((clock, cost)) = &self.append_clock {
            clock.advance_ms(*cost);
        }

        let mut record = self.record.0.lock();
        if self.failing.contains(&index) {
            record.write_errors += 1;
            return Err(RecordError::EncoderWriteFailed {
                reason: format!("mock rejected append {}", index),
            });
        }

        record.frames.push(Arc::clone(frame));
        Ok(())
    }

    fn close(self: Box<Self>) -> RecordResult<()> {
        self.record.0.lock().closed = true;
        Ok(())
    }
}

/// Position source that never moves
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub ScreenPoint);

impl PositionSource for FixedPosition {
    fn current_position(&mut self) -> Option<ScreenPoint> {
        Some(self.0)
    }
}

/// Position source that replays a script, then reports nothing
#[derive(Debug, Clone, Default)]
pub struct ScriptedPosition {
    script: VecDeque<Option<ScreenPoint>>,
}

impl ScriptedPosition {
    /// Creates a source from per-tick answers (`None` simulates a timeout)
    pub fn new(script: Vec<Option<ScreenPoint>>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

impl PositionSource for ScriptedPosition {
    fn current_position(&mut self) -> Option<ScreenPoint> {
        self.script.pop_front().flatten()
    }
}
