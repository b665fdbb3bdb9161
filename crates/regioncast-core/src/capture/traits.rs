//! Collaborator traits for the capture thread
//!
//! The pacing loop only talks to the outside world through these traits.
//! Each one is owned by the capture thread for the lifetime of a session,
//! so methods take `&mut self` and implementations may cache freely.
//!
//! # Trait Overview
//!
//! - [`FrameSampler`]: Copy screen pixels at an absolute origin
//! - [`CursorProvider`]: Report cursor visibility, position, and glyph
//! - [`PositionSource`]: Report the host window's current position
//! - [`EncoderSink`] / [`EncoderHandle`]: Open and feed the video encoder
//! - [`SessionObserver`]: Receive lifecycle notifications on the host side

use std::path::PathBuf;
use std::sync::Arc;

use image::RgbaImage;

use crate::error::RecordResult;
use crate::model::{CursorSnapshot, ScreenPoint};

/// A finished frame shared between the capture thread and the encoder.
///
/// Duplicate frames written for drift correction clone the `Arc`, not the
/// pixels.
pub type SharedFrame = Arc<RgbaImage>;

/// Capability: copy a rectangle of the screen into a surface.
pub trait FrameSampler: Send {
    /// Fills `dest` with the screen pixels whose top-left corner is `origin`.
    ///
    /// The rectangle size is `dest`'s size. Pixels that fall outside every
    /// monitor are left transparent black; this is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::RecordError::CaptureUnavailable`] when the
    /// platform capture API cannot be used at all. The pacing loop treats
    /// this as fatal.
    fn sample(&mut self, origin: ScreenPoint, dest: &mut RgbaImage) -> RecordResult<()>;
}

/// Capability: query the OS cursor.
pub trait CursorProvider: Send {
    /// Current cursor state. `x`/`y` are the screen coordinates of the glyph
    /// image origin.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::RecordError::CursorQueryFailed`] if the OS
    /// query fails. Callers composite nothing for that frame.
    fn snapshot(&mut self) -> RecordResult<CursorSnapshot>;
}

/// Capability: report the host window's logical position.
///
/// Returns `None` when the host could not answer in time; the caller keeps
/// the previous position.
pub trait PositionSource: Send {
    /// Latest window position, if available
    fn current_position(&mut self) -> Option<ScreenPoint>;
}

/// Parameters the encoder is opened with. Fixed for the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderParams {
    /// Output file (overwritten if present)
    pub path:       PathBuf,
    /// Frame width in pixels (even)
    pub width:      u32,
    /// Frame height in pixels (even)
    pub height:     u32,
    /// Frames per second
    pub frame_rate: u32,
    /// Target bitrate in bits per second
    pub bitrate:    u64,
}

/// Capability: open an encoder for a session.
pub trait EncoderSink: Send + Sync {
    /// Opens (creating or overwriting) the output described by `params`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::RecordError::EncoderOpenFailed`] if the
    /// output cannot be created. The session never starts recording.
    fn open(&self, params: &EncoderParams) -> RecordResult<Box<dyn EncoderHandle>>;
}

/// An open encoder. Frames are appended in order and each one is exactly one
/// video frame at the session frame rate.
pub trait EncoderHandle: Send {
    /// Appends one frame.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::RecordError::EncoderWriteFailed`] if the frame
    /// could not be accepted. The pacing loop counts it and moves on.
    fn append_frame(&mut self, frame: &SharedFrame) -> RecordResult<()>;

    /// Flushes and finalizes the output.
    fn close(self: Box<Self>) -> RecordResult<()>;
}

/// Host-side lifecycle notifications.
///
/// Called from the capture thread; implementations marshal to their own
/// thread if they need to.
pub trait SessionObserver: Send + Sync {
    /// The encoder is open and the first tick is about to run
    fn on_session_started(&self) {}

    /// The session has ended (normally or not) and the host may resume
    /// its idle appearance
    fn on_session_ended(&self) {}

    /// Human-readable message for the host status area: the summary on
    /// success, or the error and its remediation hint on failure
    fn on_session_complete(&self, _summary_text: &str) {}
}

/// Observer that ignores every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}
