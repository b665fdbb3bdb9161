//! regioncast-core: real-time screen region capture with drift-corrected pacing
//!
//! This library records a moving rectangle of the screen to a video file at
//! a fixed cadence. It samples the screen, composites the cursor, pads the
//! frame to even dimensions, and keeps the video's frame count locked to
//! wall-clock time by duplicating frames when a tick runs long.
//!
//! # Layout
//!
//! - [`session`]: host-facing [`Recorder`](session::Recorder) and lifecycle
//! - [`pacing`]: the tick loop and its clock abstraction
//! - [`capture`]: collaborator traits, platform implementations, and mocks
//! - [`frame`]: cursor compositing and even-dimension normalization
//! - [`encoder`]: ffmpeg encoder sink and output paths
//! - [`host`]: position round-trip between the capture and host threads
//! - [`report`]: timing aggregates and the end-of-session summary

pub mod capture;
pub mod constants;
pub mod encoder;
pub mod error;
pub mod frame;
pub mod host;
pub mod model;
pub mod pacing;
pub mod region;
pub mod report;
pub mod session;
pub mod util;

pub use error::{RecordError, RecordResult};
pub use model::{BorderInsets, CaptureRegion, ScreenPoint, SessionConfig};
pub use report::SessionSummary;
pub use session::{Recorder, SessionHandle, StopHandle};
