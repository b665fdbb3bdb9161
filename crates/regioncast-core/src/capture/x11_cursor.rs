//! X11 cursor provider using the XFixes extension
//!
//! XFixes reports the current cursor image together with the pointer
//! position in a single request. The position is passed through untouched;
//! the session's calibration offset accounts for the glyph's hotspot. The
//! image arrives as premultiplied ARGB words and is converted to
//! straight-alpha RGBA once per cursor shape; `cursor_serial` identifies the
//! shape between ticks.

use std::sync::Arc;

use image::{Rgba, RgbaImage};
use tracing::debug;
use x11rb::connection::Connection;
use x11rb::protocol::xfixes::ConnectionExt as _;
use x11rb::rust_connection::RustConnection;

use super::CursorProvider;
use crate::error::{RecordError, RecordResult};
use crate::model::{BackendType, CursorGlyph, CursorSnapshot};

/// [`CursorProvider`] for X11 sessions.
pub struct X11CursorProvider {
    conn:   RustConnection,
    cached: Option<Arc<CursorGlyph>>,
}

impl X11CursorProvider {
    /// Connects to `$DISPLAY` and negotiates XFixes.
    ///
    /// # Errors
    ///
    /// [`RecordError::CaptureUnavailable`] if the display cannot be opened or
    /// the server lacks XFixes.
    pub fn new() -> RecordResult<Self> {
        let unavailable = |reason: String| RecordError::CaptureUnavailable {
            backend: BackendType::X11,
            reason,
        };

        let (conn, _screen) = x11rb::connect(None).map_err(|e| unavailable(e.to_string()))?;
        let version = conn
            .xfixes_query_version(5, 0)
            .map_err(|e| unavailable(e.to_string()))?
            .reply()
            .map_err(|e| unavailable(format!("XFixes unavailable: {}", e)))?;

        debug!(
            major = version.major_version,
            minor = version.minor_version,
            "XFixes negotiated"
        );
        conn.flush().map_err(|e| unavailable(e.to_string()))?;

        Ok(Self { conn, cached: None })
    }
}

/// Converts premultiplied ARGB words into straight-alpha RGBA.
pub fn argb_premultiplied_to_rgba(width: u32, height: u32, pixels: &[u32]) -> RgbaImage {
    let mut image = RgbaImage::new(width, height);
    for (dst, &argb) in image.pixels_mut().zip(pixels.iter()) {
        let a = (argb >> 24) & 0xff;
        let unpremultiply = |c: u32| -> u8 {
            if a == 0 {
                0
            } else {
                ((c * 255 + a / 2) / a).min(255) as u8
            }
        };
        *dst = Rgba([
            unpremultiply((argb >> 16) & 0xff),
            unpremultiply((argb >> 8) & 0xff),
            unpremultiply(argb & 0xff),
            a as u8,
        ]);
    }
    image
}

impl CursorProvider for X11CursorProvider {
    fn snapshot(&mut self) -> RecordResult<CursorSnapshot> {
        let failed = |reason: String| RecordError::CursorQueryFailed { reason };

        let reply = self
            .conn
            .xfixes_get_cursor_image()
            .map_err(|e| failed(e.to_string()))?
            .reply()
            .map_err(|e| failed(e.to_string()))?;

        // XFixes has no visibility flag; a hidden cursor is an empty image.
        if reply.width == 0 || reply.height == 0 {
            return Ok(CursorSnapshot::hidden());
        }

        let handle = reply.cursor_serial as u64;
        let glyph = match &self.cached {
            Some(glyph) if glyph.handle == handle => Arc::clone(glyph),
            _ => {
                let glyph = Arc::new(CursorGlyph {
                    handle,
                    image: argb_premultiplied_to_rgba(
                        reply.width as u32,
                        reply.height as u32,
                        &reply.cursor_image,
                    ),
                });
                debug!(
                    serial = reply.cursor_serial,
                    width = reply.width,
                    height = reply.height,
                    "Cursor shape changed"
                );
                self.cached = Some(Arc::clone(&glyph));
                glyph
            }
        };

        Ok(pointer_snapshot(reply.x, reply.y, glyph))
    }
}

/// Snapshot at the pointer position XFixes reported.
fn pointer_snapshot(x: i16, y: i16, glyph: Arc<CursorGlyph>) -> CursorSnapshot {
    CursorSnapshot::visible(x as i32, y as i32, glyph)
}
