//! Capture collaborators and their implementations
//!
//! This module provides the abstractions the pacing loop drives, plus one
//! implementation of each per supported platform and a mock of each for
//! tests.
//!
//! # Architecture
//!
//! - [`FrameSampler`] - Copy screen pixels into a surface
//! - [`CursorProvider`] - Cursor visibility, position, and glyph
//! - [`PositionSource`] - Host window position, refreshed every tick
//! - [`EncoderSink`] / [`EncoderHandle`] - Open and feed the video encoder
//! - [`SessionObserver`] - Lifecycle notifications to the host
//!
//! ## Recommended Usage
//!
//! Use [`create_default_backend()`], which returns a [`CaptureBackend`] with
//! the sampler and whichever cursor provider the platform supports:
//!
//! ```rust,ignore
//! use regioncast_core::capture::create_default_backend;
//!
//! let backend = create_default_backend()?;
//! if !backend.has_cursor() {
//!     println!("recording without cursor");
//! }
//! ```
//!
//! ## Platform Support
//!
//! | Platform | Sampler | Cursor |
//! |----------|---------|--------|
//! | Windows  | xcap    | GDI (`GetCursorInfo` + `DrawIconEx`) |
//! | X11      | xcap    | XFixes |
//! | XWayland | xcap    | XFixes |
//! | macOS    | xcap    | - |
//! | Mock     | test pattern | scripted |

pub mod composite;
pub mod mock;
pub mod traits;
pub mod xcap_sampler;

#[cfg(target_os = "linux")]
pub mod x11_cursor;

#[cfg(target_os = "windows")]
pub mod windows_cursor;

pub use composite::CaptureBackend;
pub use mock::{MockCursor, MockEncoder, MockSampler};
pub use traits::{
    CursorProvider, EncoderHandle, EncoderParams, EncoderSink, FrameSampler, NoopObserver,
    PositionSource, SessionObserver, SharedFrame,
};
#[cfg(target_os = "windows")]
pub use windows_cursor::WindowsCursorProvider;
#[cfg(target_os = "linux")]
pub use x11_cursor::X11CursorProvider;
pub use xcap_sampler::{DisplayInfo, ScreenRect, XcapSampler, list_displays};

use tracing::{info, warn};

use crate::error::RecordResult;
use crate::util::detect::{CursorBackend, detect_cursor_backend};

/// Creates the capture backend for the current platform.
///
/// The sampler is required; a cursor provider that fails to initialize is
/// logged and dropped so recording can still proceed without a cursor.
///
/// # Errors
///
/// [`crate::error::RecordError::CaptureUnavailable`] if screen sampling is
/// unavailable.
pub fn create_default_backend() -> RecordResult<CaptureBackend> {
    let sampler = XcapSampler::new()?;
    let requested = detect_cursor_backend();

    let cursor: Option<Box<dyn CursorProvider>> = match requested {
        #[cfg(target_os = "linux")]
        CursorBackend::X11 => match X11CursorProvider::new() {
            Ok(provider) => Some(Box::new(provider)),
            Err(e) => {
                warn!(error = %e, "X11 cursor unavailable, recording without cursor");
                None
            }
        },
        #[cfg(target_os = "windows")]
        CursorBackend::Windows => Some(Box::new(WindowsCursorProvider::new())),
        _ => None,
    };

    let cursor_backend = if cursor.is_some() {
        requested
    } else {
        CursorBackend::None
    };
    info!(?cursor_backend, "Capture backend ready");

    Ok(CaptureBackend::new(
        Box::new(sampler),
        cursor,
        cursor_backend,
        "xcap",
    ))
}
