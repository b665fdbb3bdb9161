//! Scripted sessions
//!
//! [`ScriptedSession`] wires a [`Recorder`] to a manual clock, a mock
//! sampler whose per-tick cost is scripted, and a mock encoder. A run takes
//! no wall time and is fully deterministic, so tests can assert exact frame
//! counts and deviations.
//!
//! [`RecordingObserver`] keeps every lifecycle notification for later
//! inspection.

use std::sync::Arc;

use parking_lot::Mutex;
use regioncast_core::capture::mock::{
    FixedPosition, MockCursor, MockEncoder, MockSampler, RecordedFrames,
};
use regioncast_core::capture::{CursorProvider, PositionSource, SessionObserver};
use regioncast_core::error::RecordResult;
use regioncast_core::model::{BorderInsets, CaptureRegion, ScreenPoint, SessionConfig};
use regioncast_core::pacing::{ManualClock, PacingInputs};
use regioncast_core::report::SessionSummary;
use regioncast_core::session::Recorder;

/// A notification seen by [`RecordingObserver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverEvent {
    /// `on_session_started`
    Started,
    /// `on_session_ended`
    Ended,
    /// `on_session_complete` with its text
    Complete(String),
}

/// Observer that records every notification in order
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObserverEvent>>,
}

impl RecordingObserver {
    /// Creates an empty observer
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications received so far
    pub fn events(&self) -> Vec<ObserverEvent> {
        self.events.lock().clone()
    }

    /// Text of the last completion message, if any
    pub fn completion(&self) -> Option<String> {
        self.events.lock().iter().rev().find_map(|event| match event {
            ObserverEvent::Complete(text) => Some(text.clone()),
            _ => None,
        })
    }
}

impl SessionObserver for RecordingObserver {
    fn on_session_started(&self) {
        self.events.lock().push(ObserverEvent::Started);
    }

    fn on_session_ended(&self) {
        self.events.lock().push(ObserverEvent::Ended);
    }

    fn on_session_complete(&self, summary_text: &str) {
        self.events
            .lock()
            .push(ObserverEvent::Complete(summary_text.to_string()));
    }
}

/// Position source that asks the recorder to stop on its n-th query.
///
/// Position refresh is the last step of a tick, so the session ends right
/// after tick `n` (plus any makeup frames that tick owes).
struct StopAfter {
    inner:     Box<dyn PositionSource>,
    recorder:  Arc<Recorder>,
    remaining: u64,
}

impl PositionSource for StopAfter {
    fn current_position(&mut self) -> Option<ScreenPoint> {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.recorder.request_stop();
        }
        self.inner.current_position()
    }
}

/// Everything a scripted run produced
pub struct ScriptedRun {
    /// The session result
    pub summary:  RecordResult<SessionSummary>,
    /// Frames the encoder accepted
    pub frames:   RecordedFrames,
    /// Lifecycle notifications
    pub observer: Arc<RecordingObserver>,
    /// Sampling origin of every tick
    pub origins:  Vec<ScreenPoint>,
    /// The session clock, left at the end of the run
    pub clock:    ManualClock,
}

/// Builder for a deterministic session run
pub struct ScriptedSession {
    region:            CaptureRegion,
    border:            BorderInsets,
    interval_ms:       u64,
    max_ticks:         u64,
    tick_costs:        Vec<u64>,
    default_cost:      Option<u64>,
    cursor:            Option<MockCursor>,
    cursor_offset:     Option<ScreenPoint>,
    positions:         Option<Box<dyn PositionSource>>,
    encoder:           MockEncoder,
    max_makeup_frames: Option<u64>,
    stop_after:        Option<u64>,
    clock:             ManualClock,
}

impl ScriptedSession {
    /// A `width` x `height` region at the origin, 33ms ticks that each cost
    /// exactly one interval, ten ticks, no cursor
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            region:            CaptureRegion::new(0, 0, width, height),
            border:            BorderInsets::default(),
            interval_ms:       33,
            max_ticks:         10,
            tick_costs:        Vec::new(),
            default_cost:      None,
            cursor:            None,
            cursor_offset:     None,
            positions:         None,
            encoder:           MockEncoder::new(),
            max_makeup_frames: None,
            stop_after:        None,
            clock:             ManualClock::new(),
        }
    }

    /// The clock the run will use, for collaborators that advance it
    pub fn clock(&self) -> ManualClock {
        self.clock.clone()
    }

    /// Starting window position
    pub fn at(mut self, left: i32, top: i32) -> Self {
        self.region.left = left;
        self.region.top = top;
        self
    }

    /// Host border insets
    pub fn border(mut self, border: BorderInsets) -> Self {
        self.border = border;
        self
    }

    /// Tick interval
    pub fn interval_ms(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    /// Tick ceiling
    pub fn max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    /// Per-tick sampling cost in milliseconds, in tick order
    pub fn tick_costs(mut self, costs: Vec<u64>) -> Self {
        self.tick_costs = costs;
        self
    }

    /// Cost of ticks past the scripted ones (defaults to the interval)
    pub fn default_cost(mut self, cost_ms: u64) -> Self {
        self.default_cost = Some(cost_ms);
        self
    }

    /// Composites this cursor
    pub fn cursor(mut self, cursor: MockCursor) -> Self {
        self.cursor = Some(cursor);
        self
    }

    /// Cursor calibration offset
    pub fn cursor_offset(mut self, offset: ScreenPoint) -> Self {
        self.cursor_offset = Some(offset);
        self
    }

    /// Host position source (defaults to a fixed position at the start)
    pub fn positions(mut self, source: impl PositionSource + 'static) -> Self {
        self.positions = Some(Box::new(source));
        self
    }

    /// Encoder to record into
    pub fn encoder(mut self, encoder: MockEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    /// Caps makeup frames per tick
    pub fn max_makeup_frames(mut self, cap: u64) -> Self {
        self.max_makeup_frames = Some(cap);
        self
    }

    /// Requests a stop during tick `ticks` (one-based)
    pub fn stop_after(mut self, ticks: u64) -> Self {
        self.stop_after = Some(ticks);
        self
    }

    /// The session configuration this run uses.
    ///
    /// # Panics
    ///
    /// Panics if the scripted values do not form a valid configuration.
    pub fn config(&self) -> SessionConfig {
        let mut builder = SessionConfig::builder(self.region, "scripted.mp4")
            .border(self.border)
            .interval(std::time::Duration::from_millis(self.interval_ms))
            .max_ticks(self.max_ticks)
            .include_cursor(self.cursor.is_some())
            .max_makeup_frames(self.max_makeup_frames);
        if let Some(offset) = self.cursor_offset {
            builder = builder.cursor_offset(offset);
        }
        builder.build().expect("scripted session config is invalid")
    }

    /// Runs the session to completion on the manual clock
    pub fn run(self) -> ScriptedRun {
        let config = self.config();
        let clock = self.clock;
        let observer = Arc::new(RecordingObserver::new());
        let frames = self.encoder.recorded();

        let sampler = MockSampler::new()
            .with_tick_costs(clock.clone(), self.tick_costs)
            .with_default_cost(clock.clone(), self.default_cost.unwrap_or(self.interval_ms));
        let origins = sampler.origins();

        let recorder = Arc::new(
            Recorder::new(Arc::new(self.encoder))
                .with_clock(Arc::new(clock.clone()))
                .with_observer(observer.clone()),
        );

        let start = self.region.position();
        let mut positions = self
            .positions
            .unwrap_or_else(|| Box::new(FixedPosition(start)));
        if let Some(ticks) = self.stop_after {
            positions = Box::new(StopAfter {
                inner:     positions,
                recorder:  Arc::clone(&recorder),
                remaining: ticks,
            });
        }

        let inputs = PacingInputs {
            sampler: Box::new(sampler),
            cursor: self
                .cursor
                .map(|cursor| Box::new(cursor) as Box<dyn CursorProvider>),
            positions,
        };

        let summary = recorder.start(config, inputs).and_then(|handle| handle.join());
        let origins = origins.lock().clone();

        ScriptedRun {
            summary,
            frames,
            observer,
            origins,
            clock,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_run() {
        let run = ScriptedSession::new(8, 8).run();
        let summary = run.summary.unwrap();

        assert_eq!(summary.stats.ticks_run, 10);
        assert_eq!(run.frames.frame_count(), 10);
        assert_eq!(run.origins.len(), 10);
        assert_eq!(run.observer.events().first(), Some(&ObserverEvent::Started));
    }

    #[test]
    fn test_stop_after() {
        let run = ScriptedSession::new(8, 8).max_ticks(100).stop_after(3).run();
        let summary = run.summary.unwrap();

        assert_eq!(summary.stats.ticks_run, 3);
        assert_eq!(
            summary.stop_reason,
            regioncast_core::model::StopReason::Requested
        );
    }

    #[test]
    fn test_completion_text() {
        let run = ScriptedSession::new(8, 8).max_ticks(2).run();
        let text = run.observer.completion().unwrap();
        assert!(text.contains("Found 2 frames; expected 2."));
    }
}
