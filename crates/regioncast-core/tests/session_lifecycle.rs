//! Recorder lifecycle tests
//!
//! These tests drive [`Recorder`] through its state machine with mock
//! collaborators: a single active session, stop requests, encoder open
//! failures, fatal capture loss, and the host position round-trip.

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, bounded};
use regioncast_core::capture::{EncoderHandle, EncoderParams, EncoderSink, PositionSource, SharedFrame};
use regioncast_core::capture::mock::{FixedPosition, MockEncoder, MockSampler};
use regioncast_core::error::{RecordError, RecordResult};
use regioncast_core::host::position_channel;
use regioncast_core::model::{CaptureRegion, ScreenPoint, SessionConfig, SessionState, StopReason};
use regioncast_core::pacing::{ManualClock, PacingInputs};
use regioncast_core::session::Recorder;
use regioncast_test_utils::session::{ObserverEvent, RecordingObserver, ScriptedSession};

fn config(max_ticks: u64) -> SessionConfig {
    SessionConfig::builder(CaptureRegion::new(0, 0, 32, 24), "lifecycle.mp4")
        .interval(Duration::from_millis(33))
        .max_ticks(max_ticks)
        .build()
        .unwrap()
}

fn inputs(clock: &ManualClock, positions: Box<dyn PositionSource>) -> PacingInputs {
    PacingInputs {
        sampler: Box::new(MockSampler::new().with_default_cost(clock.clone(), 33)),
        cursor: None,
        positions,
    }
}

/// Position source that parks the capture thread on its first query until
/// the test releases it.
struct Gate {
    entered: Sender<()>,
    release: Option<Receiver<()>>,
}

impl Gate {
    fn new() -> (Self, Receiver<()>, Sender<()>) {
        let (entered, entered_rx) = bounded(1);
        let (release_tx, release) = bounded(1);
        let gate = Self {
            entered,
            release: Some(release),
        };
        (gate, entered_rx, release_tx)
    }
}

impl PositionSource for Gate {
    fn current_position(&mut self) -> Option<ScreenPoint> {
        if let Some(release) = self.release.take() {
            let _ = self.entered.send(());
            let _ = release.recv();
        }
        Some(ScreenPoint::new(0, 0))
    }
}

/// Encoder whose `close` parks the capture thread until the test releases
/// it, holding the recorder in Draining.
struct SlowClose {
    entered: Sender<()>,
    release: Receiver<()>,
}

struct SlowCloseHandle {
    entered: Sender<()>,
    release: Receiver<()>,
}

impl EncoderSink for SlowClose {
    fn open(&self, _params: &EncoderParams) -> RecordResult<Box<dyn EncoderHandle>> {
        Ok(Box::new(SlowCloseHandle {
            entered: self.entered.clone(),
            release: self.release.clone(),
        }))
    }
}

impl EncoderHandle for SlowCloseHandle {
    fn append_frame(&mut self, _frame: &SharedFrame) -> RecordResult<()> {
        Ok(())
    }

    fn close(self: Box<Self>) -> RecordResult<()> {
        let _ = self.entered.send(());
        let _ = self.release.recv();
        Ok(())
    }
}

#[test]
fn test_second_start_refused_while_recording() {
    let clock = ManualClock::new();
    let observer = Arc::new(RecordingObserver::new());
    let recorder = Recorder::new(Arc::new(MockEncoder::new()))
        .with_clock(Arc::new(clock.clone()))
        .with_observer(observer.clone());

    let (gate, entered, release) = Gate::new();
    let handle = recorder
        .start(config(10_000), inputs(&clock, Box::new(gate)))
        .unwrap();
    entered.recv_timeout(Duration::from_secs(5)).unwrap();

    assert_eq!(recorder.state(), SessionState::Recording);
    let err = recorder
        .start(config(1), inputs(&clock, Box::new(FixedPosition(ScreenPoint::new(0, 0)))))
        .err()
        .unwrap();
    assert!(matches!(err, RecordError::SessionActive {
        state: SessionState::Recording
    }));

    assert!(recorder.request_stop());
    drop(release);
    let summary = handle.join().unwrap();

    assert_eq!(summary.stop_reason, StopReason::Requested);
    assert_eq!(summary.stats.ticks_run, 1);
    assert_eq!(recorder.state(), SessionState::Idle);
    assert!(!recorder.request_stop());

    let events = observer.events();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0], ObserverEvent::Started);
    assert_eq!(events[1], ObserverEvent::Ended);
    assert!(matches!(&events[2], ObserverEvent::Complete(text) if text.starts_with("Finished with")));
}

#[test]
fn test_second_start_refused_while_draining() {
    let clock = ManualClock::new();
    let (entered_tx, entered) = bounded(1);
    let (release, release_rx) = bounded(1);
    let encoder = SlowClose {
        entered: entered_tx,
        release: release_rx,
    };
    let recorder = Recorder::new(Arc::new(encoder)).with_clock(Arc::new(clock.clone()));

    let fixed = || Box::new(FixedPosition(ScreenPoint::new(0, 0)));
    let handle = recorder.start(config(3), inputs(&clock, fixed())).unwrap();
    entered.recv_timeout(Duration::from_secs(5)).unwrap();

    assert_eq!(recorder.state(), SessionState::Draining);
    let err = recorder.start(config(1), inputs(&clock, fixed())).err().unwrap();
    assert!(matches!(err, RecordError::SessionActive {
        state: SessionState::Draining
    }));

    release.send(()).unwrap();
    let summary = handle.join().unwrap();
    assert_eq!(summary.stop_reason, StopReason::TickCeiling);
    assert_eq!(recorder.state(), SessionState::Idle);
}

#[test]
fn test_stop_through_session_handle() {
    let clock = ManualClock::new();
    let recorder = Recorder::new(Arc::new(MockEncoder::new())).with_clock(Arc::new(clock.clone()));

    let (gate, entered, release) = Gate::new();
    let handle = recorder
        .start(config(10_000), inputs(&clock, Box::new(gate)))
        .unwrap();
    entered.recv_timeout(Duration::from_secs(5)).unwrap();

    let stop = handle.stop_handle();
    thread::spawn(move || stop.request_stop()).join().unwrap();
    drop(release);

    let summary = handle.join().unwrap();
    assert_eq!(summary.stop_reason, StopReason::Requested);
}

#[test]
fn test_recorder_restarts_after_completion() {
    let clock = ManualClock::new();
    let encoder = MockEncoder::new();
    let recorded = encoder.recorded();
    let recorder = Recorder::new(Arc::new(encoder)).with_clock(Arc::new(clock.clone()));

    let fixed = || Box::new(FixedPosition(ScreenPoint::new(0, 0)));
    let first = recorder.start(config(3), inputs(&clock, fixed())).unwrap().join().unwrap();
    assert_eq!(first.stats.frames_written, 3);

    let second = recorder.start(config(5), inputs(&clock, fixed())).unwrap().join().unwrap();
    assert_eq!(second.stats.frames_written, 5);
    assert_eq!(recorded.frame_count(), 5);
    assert!(second.started_at >= first.ended_at);
}

#[test]
fn test_open_failure_reports_status() {
    let run = ScriptedSession::new(16, 16)
        .encoder(MockEncoder::new().with_open_error("Permission denied"))
        .run();

    let err = run.summary.unwrap_err();
    assert!(matches!(err, RecordError::EncoderOpenFailed { .. }));

    // No session started, so only the completion message arrives.
    let events = run.observer.events();
    assert_eq!(events.len(), 1);
    let text = run.observer.completion().unwrap();
    assert!(text.starts_with("Recording failed:"));
    assert!(text.contains("Permission denied"));
    assert!(text.contains("writable"));
    assert_eq!(run.frames.frame_count(), 0);
}

#[test]
fn test_capture_loss_ends_session_and_closes_encoder() {
    let clock = ManualClock::new();
    let observer = Arc::new(RecordingObserver::new());
    let encoder = MockEncoder::new();
    let recorded = encoder.recorded();
    let recorder = Recorder::new(Arc::new(encoder))
        .with_clock(Arc::new(clock.clone()))
        .with_observer(observer.clone());

    let inputs = PacingInputs {
        sampler: Box::new(MockSampler::new().with_capture_lost_at(2)),
        cursor: None,
        positions: Box::new(FixedPosition(ScreenPoint::new(0, 0))),
    };
    let err = recorder.start(config(100), inputs).unwrap().join().unwrap_err();

    assert!(matches!(err, RecordError::CaptureUnavailable { .. }));
    assert_eq!(recorded.frame_count(), 2);
    assert!(recorded.with(|record| record.is_closed()));
    assert_eq!(recorder.state(), SessionState::Idle);

    let events = observer.events();
    assert_eq!(events[..2], [ObserverEvent::Started, ObserverEvent::Ended]);
    let text = observer.completion().unwrap();
    assert!(text.contains("Screen capture unavailable"));
}

#[test]
fn test_invalid_config_never_starts() {
    let err = SessionConfig::builder(CaptureRegion::new(0, 0, 0, 10), "bad.mp4")
        .build()
        .unwrap_err();
    assert!(matches!(err, RecordError::InvalidParameter { ref parameter, .. } if parameter == "region"));

    let err = SessionConfig::builder(CaptureRegion::new(0, 0, 10, 10), "bad.mp4")
        .interval(Duration::ZERO)
        .build()
        .unwrap_err();
    assert!(matches!(err, RecordError::InvalidParameter { ref parameter, .. } if parameter == "interval"));
}

#[test]
fn test_host_position_channel_drives_region() {
    let (requester, dispatcher) = position_channel(Duration::from_secs(5));
    let moves = Arc::new(AtomicI32::new(0));

    let host_moves = Arc::clone(&moves);
    let host = thread::spawn(move || {
        dispatcher.serve_until(
            || Some(ScreenPoint::new(host_moves.fetch_add(1, Ordering::SeqCst) * 10 + 10, 0)),
            || false,
        )
    });

    let run = ScriptedSession::new(8, 8).positions(requester).max_ticks(4).run();
    run.summary.unwrap();

    // The dispatcher exits once the session drops its requester.
    let served = host.join().unwrap();
    assert_eq!(served, 4);
    assert_eq!(moves.load(Ordering::SeqCst), 4);
    assert_eq!(
        run.origins,
        vec![
            ScreenPoint::new(0, 0),
            ScreenPoint::new(10, 0),
            ScreenPoint::new(20, 0),
            ScreenPoint::new(30, 0),
        ]
    );
}

#[test]
fn test_summary_serializes_for_hosts() {
    let run = ScriptedSession::new(9, 9).max_ticks(2).run();
    let summary = run.summary.unwrap();

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["stop_reason"], "tick_ceiling");
    assert_eq!(json["output_size"]["width"], 10);
    assert_eq!(json["stats"]["frames_written"], 2);
    assert_eq!(json["output_path"], "scripted.mp4");
}
