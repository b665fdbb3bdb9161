//! Data models and type definitions for regioncast
//!
//! This module defines the core types shared by the capture collaborators
//! and the pacing loop:
//! - Platform and backend detection types
//! - Region geometry (position, client size, border insets, output size)
//! - Per-tick ephemeral state (cursor snapshots, timing samples)
//! - The immutable session start message ([`SessionConfig`])

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{RecordError, RecordResult};

/// Represents the display backend type for the current platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// No backend detected or not yet initialized
    None,
    /// Wayland display server (Linux)
    Wayland,
    /// X11 display server (Linux)
    X11,
    /// Windows desktop (GDI)
    Windows,
    /// macOS
    #[serde(rename = "macos")]
    MacOS,
}

impl BackendType {
    /// Returns the backend type as a lowercase string
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendType::None => "none",
            BackendType::Wayland => "wayland",
            BackendType::X11 => "x11",
            BackendType::Windows => "windows",
            BackendType::MacOS => "macos",
        }
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Platform information including OS and display backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformInfo {
    /// Operating system name (e.g., "linux", "windows", "macos")
    pub os:      String,
    /// Detected display backend
    pub backend: BackendType,
}

impl PlatformInfo {
    /// Creates a new PlatformInfo instance
    pub fn new(os: String, backend: BackendType) -> Self {
        Self { os, backend }
    }
}

/// A point in absolute screen coordinates (may be negative on multi-monitor
/// layouts).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenPoint {
    /// Horizontal coordinate
    pub x: i32,
    /// Vertical coordinate
    pub y: i32,
}

impl ScreenPoint {
    /// Creates a new point
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Host window chrome surrounding the client content, in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorderInsets {
    /// Left border thickness
    pub left:   u32,
    /// Top border thickness
    pub top:    u32,
    /// Right border thickness
    pub right:  u32,
    /// Bottom border thickness
    pub bottom: u32,
}

impl BorderInsets {
    /// Creates insets from explicit thicknesses
    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Creates insets with the same thickness on every side
    pub fn uniform(thickness: u32) -> Self {
        Self::new(thickness, thickness, thickness, thickness)
    }
}

/// The rectangle being recorded.
///
/// `left`/`top` track the host window's logical position and are refreshed
/// every tick. The requested size is the client area (window size minus
/// border insets) and is frozen for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRegion {
    /// Host window left edge
    pub left:             i32,
    /// Host window top edge
    pub top:              i32,
    /// Client width to sample
    pub requested_width:  u32,
    /// Client height to sample
    pub requested_height: u32,
}

impl CaptureRegion {
    /// Creates a region from a window position and client size
    pub fn new(left: i32, top: i32, requested_width: u32, requested_height: u32) -> Self {
        Self {
            left,
            top,
            requested_width,
            requested_height,
        }
    }

    /// Derives the client region from a host window's outer geometry.
    ///
    /// Insets larger than the window collapse the size to zero rather than
    /// underflowing.
    ///
    /// # Examples
    ///
    /// ```
    /// use regioncast_core::model::{BorderInsets, CaptureRegion};
    ///
    /// let region = CaptureRegion::from_window(100, 50, 405, 310, &BorderInsets::uniform(2));
    /// assert_eq!((region.requested_width, region.requested_height), (401, 306));
    /// ```
    pub fn from_window(
        left: i32,
        top: i32,
        outer_width: u32,
        outer_height: u32,
        border: &BorderInsets,
    ) -> Self {
        Self {
            left,
            top,
            requested_width: outer_width.saturating_sub(border.left.saturating_add(border.right)),
            requested_height: outer_height.saturating_sub(border.top.saturating_add(border.bottom)),
        }
    }

    /// Absolute screen coordinate of the first client pixel.
    pub fn sample_origin(&self, border: &BorderInsets) -> ScreenPoint {
        ScreenPoint::new(self.left + border.left as i32, self.top + border.top as i32)
    }

    /// Moves the region, keeping its size.
    pub fn move_to(&mut self, position: ScreenPoint) {
        self.left = position.x;
        self.top = position.y;
    }

    /// Current window position
    pub fn position(&self) -> ScreenPoint {
        ScreenPoint::new(self.left, self.top)
    }

    /// Whether the region has no pixels to sample
    pub fn is_empty(&self) -> bool {
        self.requested_width == 0 || self.requested_height == 0
    }
}

/// Even-dimensioned size of the encoded video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSize {
    /// Encoded width (always even)
    pub width:  u32,
    /// Encoded height (always even)
    pub height: u32,
}

impl OutputSize {
    /// Rounds each requested dimension up to the next even number.
    ///
    /// # Examples
    ///
    /// ```
    /// use regioncast_core::model::OutputSize;
    ///
    /// let size = OutputSize::for_requested(101, 50);
    /// assert_eq!((size.width, size.height), (102, 50));
    /// ```
    pub fn for_requested(requested_width: u32, requested_height: u32) -> Self {
        Self {
            width:  requested_width + requested_width % 2,
            height: requested_height + requested_height % 2,
        }
    }
}

/// A cursor shape image. `handle` identifies the shape so providers can
/// cache converted glyphs between ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorGlyph {
    /// Platform identifier for the shape (HCURSOR, XFixes serial, ...)
    pub handle: u64,
    /// Straight-alpha RGBA pixels
    pub image:  image::RgbaImage,
}

/// Cursor state sampled once per tick. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorSnapshot {
    /// Whether the cursor is currently shown
    pub visible: bool,
    /// Screen x of the pointer as the OS reports it
    pub x:       i32,
    /// Screen y of the pointer as the OS reports it
    pub y:       i32,
    /// Glyph to draw, if the provider could resolve one
    pub glyph:   Option<Arc<CursorGlyph>>,
}

impl CursorSnapshot {
    /// A snapshot that composites nothing
    pub fn hidden() -> Self {
        Self {
            visible: false,
            x:       0,
            y:       0,
            glyph:   None,
        }
    }

    /// A visible cursor at `(x, y)` drawn with `glyph`
    pub fn visible(x: i32, y: i32, glyph: Arc<CursorGlyph>) -> Self {
        Self {
            visible: true,
            x,
            y,
            glyph: Some(glyph),
        }
    }
}

/// Timing of one tick, folded into the running aggregates immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingSample {
    /// Zero-based tick number
    pub tick_index:      u64,
    /// Time spent sampling, compositing, encoding, and refreshing position
    pub loop_elapsed_ms: u64,
    /// Milliseconds over the interval (0 when on time)
    pub deviation_ms:    u64,
}

/// Lifecycle state of the recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No session
    Idle,
    /// Capture thread is ticking
    Recording,
    /// Stop observed; encoder is being finalized
    Draining,
}

impl SessionState {
    /// Returns the state as a lowercase string
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Recording => "recording",
            SessionState::Draining => "draining",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why the tick loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The host requested a stop
    Requested,
    /// The session reached its tick ceiling
    TickCeiling,
}

/// Immutable session start message.
///
/// Built with [`SessionConfig::builder`], which validates every value and
/// fills unset fields from [`crate::constants`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Region at session start (size frozen for the session)
    pub region:            CaptureRegion,
    /// Host window chrome to skip when sampling
    pub border:            BorderInsets,
    /// Nominal tick interval
    pub interval:          Duration,
    /// Tick ceiling; reaching it ends the session normally
    pub max_ticks:         u64,
    /// Output video path (overwritten if it exists)
    pub output_path:       PathBuf,
    /// Encoder target bitrate in bits per second
    pub bitrate:           u64,
    /// Cursor glyph calibration offset
    pub cursor_offset:     ScreenPoint,
    /// Whether to composite the cursor at all
    pub include_cursor:    bool,
    /// Optional cap on duplicate frames written in a single tick
    pub max_makeup_frames: Option<u64>,
}

impl SessionConfig {
    /// Creates a builder for the given region and output path
    pub fn builder(region: CaptureRegion, output_path: impl Into<PathBuf>) -> SessionConfigBuilder {
        SessionConfigBuilder::new(region, output_path.into())
    }

    /// Interval in whole milliseconds
    pub fn interval_ms(&self) -> u64 {
        self.interval.as_millis() as u64
    }

    /// Encoded frame rate, `1000 / interval_ms`
    pub fn frame_rate(&self) -> u32 {
        (constants::FRAME_RATE_SCALE / self.interval_ms().max(1)) as u32
    }

    /// Even-dimensioned size of the encoded video
    pub fn output_size(&self) -> OutputSize {
        OutputSize::for_requested(self.region.requested_width, self.region.requested_height)
    }

    /// Output path
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}

/// Builder for [`SessionConfig`]
#[derive(Debug, Clone)]
pub struct SessionConfigBuilder {
    region:            CaptureRegion,
    output_path:       PathBuf,
    border:            BorderInsets,
    interval:          Option<Duration>,
    max_ticks:         Option<u64>,
    max_duration:      Option<Duration>,
    bitrate:           Option<u64>,
    cursor_offset:     ScreenPoint,
    include_cursor:    bool,
    max_makeup_frames: Option<u64>,
}

impl SessionConfigBuilder {
    fn new(region: CaptureRegion, output_path: PathBuf) -> Self {
        Self {
            region,
            output_path,
            border: BorderInsets::default(),
            interval: None,
            max_ticks: None,
            max_duration: None,
            bitrate: None,
            cursor_offset: ScreenPoint::new(
                constants::CURSOR_OFFSET_LEFT,
                constants::CURSOR_OFFSET_TOP,
            ),
            include_cursor: true,
            max_makeup_frames: None,
        }
    }

    /// Sets the host border insets
    pub fn border(mut self, border: BorderInsets) -> Self {
        self.border = border;
        self
    }

    /// Sets the tick interval
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Sets an explicit tick ceiling (takes precedence over `max_duration`)
    pub fn max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    /// Sets the ceiling as a duration, converted to ticks at build time
    pub fn max_duration(mut self, duration: Duration) -> Self {
        self.max_duration = Some(duration);
        self
    }

    /// Sets the encoder bitrate
    pub fn bitrate(mut self, bitrate: u64) -> Self {
        self.bitrate = Some(bitrate);
        self
    }

    /// Sets the cursor calibration offset
    pub fn cursor_offset(mut self, offset: ScreenPoint) -> Self {
        self.cursor_offset = offset;
        self
    }

    /// Enables or disables cursor compositing
    pub fn include_cursor(mut self, include: bool) -> Self {
        self.include_cursor = include;
        self
    }

    /// Caps duplicate frames per tick. `None` keeps bursts uncapped.
    pub fn max_makeup_frames(mut self, cap: Option<u64>) -> Self {
        self.max_makeup_frames = cap;
        self
    }

    /// Validates and builds the configuration
    ///
    /// # Errors
    ///
    /// - [`RecordError::InvalidParameter`] for a zero or >1s interval, an
    ///   empty region, a zero tick ceiling, or a zero bitrate
    pub fn build(self) -> RecordResult<SessionConfig> {
        let interval = self
            .interval
            .unwrap_or_else(|| Duration::from_millis(constants::interval_ms()));
        let interval_ms = interval.as_millis() as u64;
        if interval_ms == 0 || interval_ms > constants::FRAME_RATE_SCALE {
            return Err(RecordError::InvalidParameter {
                parameter: "interval".to_string(),
                reason:    format!("{}ms is outside 1..=1000ms", interval_ms),
            });
        }

        if self.region.is_empty() {
            return Err(RecordError::InvalidParameter {
                parameter: "region".to_string(),
                reason:    format!(
                    "{}x{} has no pixels",
                    self.region.requested_width, self.region.requested_height
                ),
            });
        }

        let max_ticks = match self.max_ticks {
            Some(ticks) => ticks,
            None => {
                let ceiling = self.max_duration.unwrap_or_else(constants::max_session_duration);
                ceiling.as_millis() as u64 / interval_ms
            }
        };
        if max_ticks == 0 {
            return Err(RecordError::InvalidParameter {
                parameter: "max_ticks".to_string(),
                reason:    "session would end before its first tick".to_string(),
            });
        }

        let bitrate = self.bitrate.unwrap_or_else(constants::bitrate);
        if bitrate == 0 {
            return Err(RecordError::InvalidParameter {
                parameter: "bitrate".to_string(),
                reason:    "must be greater than zero".to_string(),
            });
        }

        Ok(SessionConfig {
            region: self.region,
            border: self.border,
            interval,
            max_ticks,
            output_path: self.output_path,
            bitrate,
            cursor_offset: self.cursor_offset,
            include_cursor: self.include_cursor,
            max_makeup_frames: self.max_makeup_frames,
        })
    }
}
