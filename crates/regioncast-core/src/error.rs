//! Error types for region recording sessions
//!
//! This module defines the error type shared by every capture collaborator
//! and by the pacing loop. Each error carries a user-facing message, an
//! actionable remediation hint, and a fatal/recoverable classification that
//! the pacing loop uses to decide whether a tick can continue.
//!
//! # Fatal vs recovered
//!
//! | Variant | Fatal | Handling |
//! |---------|-------|----------|
//! | `CaptureUnavailable` | yes | Session aborts before or during recording |
//! | `EncoderOpenFailed` | yes | Session never enters `Recording` |
//! | `SessionActive` | yes | Start request refused |
//! | `InvalidParameter` | yes | Start request refused |
//! | `EncoderWriteFailed` | no | Logged and counted, frame still accounted |
//! | `CursorQueryFailed` | no | Cursor treated as hidden for that frame |
//! | `PositionUnavailable` | no | Previous region position retained |

use std::path::PathBuf;

use crate::model::{BackendType, SessionState};

/// Result type alias for recording operations
pub type RecordResult<T> = Result<T, RecordError>;

/// Error type for region capture, compositing, and encoding
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// The screen capture API could not be used
    #[error("Screen capture unavailable on {backend}: {reason}")]
    CaptureUnavailable {
        /// Backend that failed
        backend: BackendType,
        /// Reason reported by the platform
        reason: String,
    },

    /// The encoder could not open the output file
    #[error("Failed to open encoder for '{}': {reason}", path.display())]
    EncoderOpenFailed {
        /// Output path the encoder tried to open
        path: PathBuf,
        /// Reason for the failure
        reason: String,
    },

    /// A frame could not be handed to the encoder
    #[error("Encoder rejected frame: {reason}")]
    EncoderWriteFailed {
        /// Reason for the failure
        reason: String,
    },

    /// The encoder failed while finalizing the output file
    #[error("Encoder failed to finalize output: {reason}")]
    EncoderCloseFailed {
        /// Reason for the failure
        reason: String,
    },

    /// Querying the OS cursor state failed
    #[error("Cursor query failed: {reason}")]
    CursorQueryFailed {
        /// Reason for the failure
        reason: String,
    },

    /// The host did not answer a position request in time
    #[error("Host position unavailable ({misses} refreshes missed this session)")]
    PositionUnavailable {
        /// Misses so far in the session, including this one
        misses: u64,
    },

    /// Invalid session parameter
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: String,
        /// Reason why it's invalid
        reason: String,
    },

    /// A session is already running
    #[error("A recording session is already active (state: {state})")]
    SessionActive {
        /// State the recorder was in when start was requested
        state: SessionState,
    },

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecordError {
    /// Whether this error aborts the session.
    ///
    /// Non-fatal errors are absorbed inside a tick: the pacing loop logs
    /// them and keeps its schedule.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            RecordError::EncoderWriteFailed { .. }
                | RecordError::CursorQueryFailed { .. }
                | RecordError::PositionUnavailable { .. }
        )
    }

    /// Returns an actionable remediation hint for this error
    ///
    /// # Examples
    ///
    /// ```
    /// use regioncast_core::error::RecordError;
    ///
    /// let error = RecordError::EncoderOpenFailed {
    ///     path:   "/readonly/output.mp4".into(),
    ///     reason: "permission denied".to_string(),
    /// };
    ///
    /// assert!(error.remediation_hint().contains("ffmpeg"));
    /// ```
    pub fn remediation_hint(&self) -> &str {
        match self {
            RecordError::CaptureUnavailable { backend, .. } => match backend {
                BackendType::X11 => {
                    "Ensure an X11 session is running and DISPLAY is set. Check xhost settings if \
                     running in a restricted environment."
                }
                BackendType::Wayland => {
                    "Direct screen sampling is restricted on Wayland. Run the recorder inside an \
                     X11 or XWayland session."
                }
                BackendType::Windows => {
                    "Ensure the desktop is unlocked and the process runs in an interactive \
                     session."
                }
                BackendType::MacOS => {
                    "Grant screen recording permission in System Settings > Privacy & Security > \
                     Screen Recording."
                }
                BackendType::None => "No screen capture backend is available on this platform.",
            },
            RecordError::EncoderOpenFailed { .. } => {
                "Check that the output directory is writable and that ffmpeg is installed and on \
                 PATH (or set REGIONCAST_FFMPEG)."
            }
            RecordError::EncoderWriteFailed { .. } => {
                "The encoder fell behind or exited. Try a smaller region, a longer interval, or a \
                 lower bitrate."
            }
            RecordError::EncoderCloseFailed { .. } => {
                "The output file may be truncated. Check free disk space and the ffmpeg log \
                 output."
            }
            RecordError::CursorQueryFailed { .. } => {
                "The cursor is omitted from affected frames. Recording continues normally."
            }
            RecordError::PositionUnavailable { .. } => {
                "The host did not report a new region position in time. The previous position is \
                 used."
            }
            RecordError::InvalidParameter { parameter, .. } => match parameter.as_str() {
                "interval" => "The capture interval must be between 1 and 1000 milliseconds.",
                "region" => "The capture region must be at least 1x1 pixels after border insets.",
                "max_ticks" => "The tick ceiling must be at least 1.",
                "bitrate" => "The bitrate must be greater than zero.",
                _ => "Check the parameter value against the command help.",
            },
            RecordError::SessionActive { .. } => {
                "Stop the current recording before starting a new one."
            }
            RecordError::Io(_) => {
                "An I/O error occurred. Check file permissions, disk space, and system resources."
            }
        }
    }

    /// Formats the error for the host status message: message plus hint.
    pub fn status_message(&self) -> String {
        format!("Recording failed: {}\n{}", self, self.remediation_hint())
    }
}
