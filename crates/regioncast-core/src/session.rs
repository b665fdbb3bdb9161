//! Session lifecycle
//!
//! [`Recorder`] is the host-facing entry point. It enforces a single active
//! session, opens the encoder, and runs the pacing loop on a dedicated
//! capture thread:
//!
//! ```text
//! Idle --start--> Recording --stop / tick ceiling--> Draining --encoder closed--> Idle
//! ```
//!
//! The host talks to a running session through a [`SessionHandle`] (or a
//! cloned [`StopHandle`]) and hears back through a
//! [`SessionObserver`](crate::capture::SessionObserver).
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use regioncast_core::capture::mock::{FixedPosition, MockEncoder, MockSampler};
//! use regioncast_core::model::{CaptureRegion, ScreenPoint, SessionConfig};
//! use regioncast_core::pacing::{ManualClock, PacingInputs};
//! use regioncast_core::session::Recorder;
//!
//! let clock = ManualClock::new();
//! let recorder = Recorder::new(Arc::new(MockEncoder::new())).with_clock(Arc::new(clock.clone()));
//!
//! let config = SessionConfig::builder(CaptureRegion::new(0, 0, 64, 48), "out.mp4")
//!     .interval(Duration::from_millis(33))
//!     .max_ticks(5)
//!     .build()
//!     .unwrap();
//! let inputs = PacingInputs {
//!     sampler:   Box::new(MockSampler::new().with_default_cost(clock.clone(), 33)),
//!     cursor:    None,
//!     positions: Box::new(FixedPosition(ScreenPoint::new(0, 0))),
//! };
//!
//! let summary = recorder.start(config, inputs).unwrap().join().unwrap();
//! assert_eq!(summary.stats.frames_written, 5);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::capture::{EncoderSink, NoopObserver, SessionObserver};
use crate::encoder::params_for;
use crate::error::{RecordError, RecordResult};
use crate::model::{SessionConfig, SessionState};
use crate::pacing::{Clock, PacingController, PacingInputs, SystemClock};
use crate::report::SessionSummary;

/// Cooperative stop signal shared between the host and the capture thread.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Creates an un-signalled handle
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the session to stop after its current tick
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a stop has been requested
    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn flag(&self) -> &AtomicBool {
        &self.0
    }
}

/// Host-facing recorder. Cheap to share; all state is behind `Arc`s.
pub struct Recorder {
    state:    Arc<Mutex<SessionState>>,
    current:  Arc<Mutex<Option<StopHandle>>>,
    encoder:  Arc<dyn EncoderSink>,
    clock:    Arc<dyn Clock>,
    observer: Arc<dyn SessionObserver>,
}

impl Recorder {
    /// Creates a recorder that writes through `encoder`, timed by the system
    /// clock
    pub fn new(encoder: Arc<dyn EncoderSink>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::Idle)),
            current: Arc::new(Mutex::new(None)),
            encoder,
            clock: Arc::new(SystemClock::new()),
            observer: Arc::new(NoopObserver),
        }
    }

    /// Replaces the clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Registers the host observer
    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Requests a stop of the active session, if any. Returns whether a
    /// session was signalled.
    pub fn request_stop(&self) -> bool {
        match self.current.lock().as_ref() {
            Some(stop) => {
                stop.request_stop();
                true
            }
            None => false,
        }
    }

    /// Starts a session.
    ///
    /// The encoder is opened on the calling thread; the tick loop runs on a
    /// new capture thread.
    ///
    /// # Errors
    ///
    /// - [`RecordError::SessionActive`] if a session is recording or draining
    /// - [`RecordError::EncoderOpenFailed`] if the output cannot be opened;
    ///   the observer also receives the failure as a status message
    /// - [`RecordError::Io`] if the capture thread cannot be spawned
    pub fn start(&self, config: SessionConfig, inputs: PacingInputs) -> RecordResult<SessionHandle> {
        let mut state = self.state.lock();
        if *state != SessionState::Idle {
            warn!(state = %*state, "Start refused, session already active");
            return Err(RecordError::SessionActive { state: *state });
        }

        let params = params_for(&config);
        let mut encoder = match self.encoder.open(&params) {
            Ok(encoder) => encoder,
            Err(e) => {
                error!(error = %e, "Encoder open failed");
                self.observer.on_session_complete(&e.status_message());
                return Err(e);
            }
        };

        let stop = StopHandle::new();
        let mut pacing = PacingController::new(&config, Arc::clone(&self.clock), inputs);
        let started_at = Utc::now();
        let observer = Arc::clone(&self.observer);
        let thread_state = Arc::clone(&self.state);
        let thread_current = Arc::clone(&self.current);
        let thread_stop = stop.clone();

        // The state lock is held until this function returns, so the capture
        // thread cannot move past Recording before it is published.
        *state = SessionState::Recording;
        *self.current.lock() = Some(stop.clone());

        let spawned = thread::Builder::new()
            .name("regioncast-capture".to_string())
            .spawn(move || {
                let guard = IdleGuard {
                    state:   thread_state,
                    current: thread_current,
                };
                observer.on_session_started();

                let run = pacing.run(encoder.as_mut(), thread_stop.flag());

                guard.set(SessionState::Draining);
                info!("Session draining");
                let closed = encoder.close();
                let ended_at = Utc::now();
                drop(guard);
                observer.on_session_ended();

                if let (Err(_), Err(close_error)) = (&run, &closed) {
                    warn!(error = %close_error, "Encoder close failed after fatal error");
                }
                let result = run.and_then(|outcome| {
                    closed?;
                    Ok(SessionSummary {
                        output_path: config.output_path.clone(),
                        output_size: pacing.output_size(),
                        interval_ms: config.interval_ms(),
                        total_elapsed_ms: outcome.total_elapsed_ms,
                        expected_frames: outcome.expected_frames,
                        stats: outcome.stats,
                        stop_reason: outcome.stop_reason,
                        started_at,
                        ended_at,
                    })
                });

                match &result {
                    Ok(summary) => {
                        info!(
                            path = %summary.output_path.display(),
                            frames = summary.stats.frames_written,
                            expected = summary.expected_frames,
                            "Session complete"
                        );
                        observer.on_session_complete(&summary.to_string());
                    }
                    Err(e) => {
                        error!(error = %e, "Session failed");
                        observer.on_session_complete(&e.status_message());
                    }
                }
                result
            });

        match spawned {
            Ok(thread) => {
                info!(
                    path = %params.path.display(),
                    width = params.width,
                    height = params.height,
                    fps = params.frame_rate,
                    "Session started"
                );
                Ok(SessionHandle { stop, thread })
            }
            Err(e) => {
                error!(error = %e, "Failed to spawn capture thread");
                *state = SessionState::Idle;
                *self.current.lock() = None;
                Err(RecordError::Io(e))
            }
        }
    }
}

/// Returns the recorder to `Idle` when the capture thread finishes, even if
/// it panics.
struct IdleGuard {
    state:   Arc<Mutex<SessionState>>,
    current: Arc<Mutex<Option<StopHandle>>>,
}

impl IdleGuard {
    fn set(&self, state: SessionState) {
        *self.state.lock() = state;
    }
}

impl Drop for IdleGuard {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        *self.current.lock() = None;
        *state = SessionState::Idle;
    }
}

/// A running session.
#[derive(Debug)]
pub struct SessionHandle {
    stop:   StopHandle,
    thread: JoinHandle<RecordResult<SessionSummary>>,
}

impl SessionHandle {
    /// Asks the session to stop after its current tick
    pub fn request_stop(&self) {
        self.stop.request_stop();
    }

    /// A stop handle that can be moved to another thread
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Whether the capture thread has exited
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Waits for the session to drain and returns its summary.
    ///
    /// # Errors
    ///
    /// The fatal error that ended the session, or [`RecordError::Io`] if the
    /// capture thread panicked.
    pub fn join(self) -> RecordResult<SessionSummary> {
        self.thread
            .join()
            .map_err(|_| RecordError::Io(std::io::Error::other("capture thread panicked")))?
    }
}
