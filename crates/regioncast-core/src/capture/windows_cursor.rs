//! Windows cursor provider using GDI
//!
//! `GetCursorInfo` reports visibility, position, and the current `HCURSOR`.
//! The glyph is rendered with `DrawIconEx` into a 32-bit DIB, once over black
//! and once over white; the difference between the two renders recovers
//! per-pixel alpha for colour, monochrome, and inverting cursors alike.
//! Converted glyphs are cached by handle. The snapshot carries the raw
//! pointer position; the session's calibration offset accounts for the
//! hotspot.

use std::collections::HashMap;
use std::ffi::c_void;
use std::mem;
use std::ptr;
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use tracing::debug;
use windows_sys::Win32::Foundation::POINT;
use windows_sys::Win32::Graphics::Gdi::{
    BI_RGB, BITMAP, BITMAPINFO, BITMAPINFOHEADER, CreateCompatibleDC, CreateDIBSection,
    DIB_RGB_COLORS, DeleteDC, DeleteObject, GetDC, GetObjectW, ReleaseDC, SelectObject,
};
use windows_sys::Win32::UI::WindowsAndMessaging::{
    CURSOR_SHOWING, CURSORINFO, DI_NORMAL, DrawIconEx, GetCursorInfo, GetIconInfo, HCURSOR,
    ICONINFO,
};

use super::CursorProvider;
use crate::error::{RecordError, RecordResult};
use crate::model::{CursorGlyph, CursorSnapshot};

/// Upper bound on cached shapes before the cache is reset
const GLYPH_CACHE_LIMIT: usize = 64;

/// [`CursorProvider`] for the Windows desktop.
#[derive(Debug, Default)]
pub struct WindowsCursorProvider {
    cache: HashMap<u64, Arc<CursorGlyph>>,
}

impl WindowsCursorProvider {
    /// Creates a provider with an empty glyph cache
    pub fn new() -> Self {
        Self::default()
    }

    fn glyph_for(&mut self, cursor: HCURSOR) -> RecordResult<Arc<CursorGlyph>> {
        let handle = cursor as usize as u64;
        if let Some(cached) = self.cache.get(&handle) {
            return Ok(Arc::clone(cached));
        }

        let image = render_cursor(cursor)?;
        debug!(
            handle,
            width = image.width(),
            height = image.height(),
            "Cursor shape changed"
        );

        if self.cache.len() >= GLYPH_CACHE_LIMIT {
            self.cache.clear();
        }
        let glyph = Arc::new(CursorGlyph { handle, image });
        self.cache.insert(handle, Arc::clone(&glyph));
        Ok(glyph)
    }
}

impl CursorProvider for WindowsCursorProvider {
    fn snapshot(&mut self) -> RecordResult<CursorSnapshot> {
        let mut info: CURSORINFO = unsafe { mem::zeroed() };
        info.cbSize = mem::size_of::<CURSORINFO>() as u32;

        // SAFETY: `info` is a properly sized, writable CURSORINFO.
        if unsafe { GetCursorInfo(&mut info) } == 0 {
            return Err(RecordError::CursorQueryFailed {
                reason: std::io::Error::last_os_error().to_string(),
            });
        }

        if info.flags & CURSOR_SHOWING == 0 || info.hCursor.is_null() {
            return Ok(CursorSnapshot::hidden());
        }

        let glyph = self.glyph_for(info.hCursor)?;
        Ok(pointer_snapshot(info.ptScreenPos, glyph))
    }
}

/// Snapshot at the pointer position `GetCursorInfo` reported.
fn pointer_snapshot(position: POINT, glyph: Arc<CursorGlyph>) -> CursorSnapshot {
    CursorSnapshot::visible(position.x, position.y, glyph)
}

/// Recovers straight-alpha RGBA from a render over black and one over white
/// (both BGRA rows, top-down).
pub fn alpha_from_renders(width: u32, height: u32, on_black: &[u8], on_white: &[u8]) -> RgbaImage {
    let mut image = RgbaImage::new(width, height);
    for (i, pixel) in image.pixels_mut().enumerate() {
        let offset = i * 4;
        if offset + 3 >= on_black.len() || offset + 3 >= on_white.len() {
            break;
        }

        // Per channel: white - black = 255 - alpha. Use the smallest gap.
        let mut alpha = 0u32;
        for c in 0..3 {
            let b = on_black[offset + c] as u32;
            let w = on_white[offset + c] as u32;
            alpha = alpha.max(255u32.saturating_sub(w.saturating_sub(b)));
        }

        if alpha == 0 {
            *pixel = Rgba([0, 0, 0, 0]);
            continue;
        }

        let straight = |c: usize| ((on_black[offset + c] as u32 * 255 + alpha / 2) / alpha).min(255) as u8;
        *pixel = Rgba([straight(2), straight(1), straight(0), alpha as u8]);
    }
    image
}

/// Renders `cursor` to RGBA.
fn render_cursor(cursor: HCURSOR) -> RecordResult<RgbaImage> {
    let failed = |what: &str| RecordError::CursorQueryFailed {
        reason: format!("{} failed: {}", what, std::io::Error::last_os_error()),
    };

    let mut icon: ICONINFO = unsafe { mem::zeroed() };
    // SAFETY: `icon` is writable; the bitmaps it receives are deleted below.
    if unsafe { GetIconInfo(cursor, &mut icon) } == 0 {
        return Err(failed("GetIconInfo"));
    }

    let sized_from = if icon.hbmColor.is_null() { icon.hbmMask } else { icon.hbmColor };
    let mut bitmap: BITMAP = unsafe { mem::zeroed() };
    // SAFETY: `bitmap` is a writable BITMAP of the size passed.
    let got = unsafe {
        GetObjectW(
            sized_from,
            mem::size_of::<BITMAP>() as i32,
            &mut bitmap as *mut BITMAP as *mut c_void,
        )
    };
    // SAFETY: GetIconInfo hands ownership of both bitmaps to the caller.
    unsafe {
        if !icon.hbmColor.is_null() {
            DeleteObject(icon.hbmColor);
        }
        if !icon.hbmMask.is_null() {
            DeleteObject(icon.hbmMask);
        }
    }
    if got == 0 {
        return Err(failed("GetObjectW"));
    }

    let width = bitmap.bmWidth.max(0) as u32;
    // Monochrome cursors stack the AND and XOR masks vertically.
    let height = if icon.hbmColor.is_null() {
        (bitmap.bmHeight / 2).max(0) as u32
    } else {
        bitmap.bmHeight.max(0) as u32
    };
    if width == 0 || height == 0 {
        return Err(RecordError::CursorQueryFailed {
            reason: "cursor bitmap is empty".to_string(),
        });
    }

    let on_black = draw_on(cursor, width, height, 0x00).ok_or_else(|| failed("DrawIconEx"))?;
    let on_white = draw_on(cursor, width, height, 0xff).ok_or_else(|| failed("DrawIconEx"))?;

    Ok(alpha_from_renders(width, height, &on_black, &on_white))
}

/// Draws `cursor` over an opaque background of `fill` and returns the BGRA
/// bytes.
fn draw_on(cursor: HCURSOR, width: u32, height: u32, fill: u8) -> Option<Vec<u8>> {
    let len = width as usize * height as usize * 4;

    // SAFETY: every GDI object created here is released before returning,
    // and `bits` is only read while the DIB section is alive.
    unsafe {
        let screen = GetDC(ptr::null_mut());
        if screen.is_null() {
            return None;
        }
        let dc = CreateCompatibleDC(screen);
        ReleaseDC(ptr::null_mut(), screen);
        if dc.is_null() {
            return None;
        }

        let mut info: BITMAPINFO = mem::zeroed();
        info.bmiHeader = BITMAPINFOHEADER {
            biSize: mem::size_of::<BITMAPINFOHEADER>() as u32,
            biWidth: width as i32,
            // Negative height selects a top-down DIB.
            biHeight: -(height as i32),
            biPlanes: 1,
            biBitCount: 32,
            biCompression: BI_RGB,
            biSizeImage: 0,
            biXPelsPerMeter: 0,
            biYPelsPerMeter: 0,
            biClrUsed: 0,
            biClrImportant: 0,
        };

        let mut bits: *mut c_void = ptr::null_mut();
        let dib = CreateDIBSection(dc, &info, DIB_RGB_COLORS, &mut bits, ptr::null_mut(), 0);
        if dib.is_null() || bits.is_null() {
            DeleteDC(dc);
            return None;
        }

        let previous = SelectObject(dc, dib);
        let pixels = std::slice::from_raw_parts_mut(bits as *mut u8, len);
        for px in pixels.chunks_exact_mut(4) {
            px[0] = fill;
            px[1] = fill;
            px[2] = fill;
            px[3] = 0xff;
        }

        let drawn = DrawIconEx(
            dc,
            0,
            0,
            cursor,
            width as i32,
            height as i32,
            0,
            ptr::null_mut(),
            DI_NORMAL,
        );
        let result = if drawn != 0 {
            Some(pixels.to_vec())
        } else {
            None
        };

        SelectObject(dc, previous);
        DeleteObject(dib);
        DeleteDC(dc);
        result
    }
}
