//! Per-tick surface pipeline
//!
//! A tick samples into a requested-size surface, composites the cursor onto
//! it, then copies it into the even-sized output surface that is handed to
//! the encoder.
//!
//! - [`CursorCompositor`]: draws the cursor glyph with alpha blending
//! - [`OutputSurface`]: owns the even-dimensioned frame reused across ticks

pub mod compositor;
pub mod normalize;

pub use compositor::CursorCompositor;
pub use normalize::OutputSurface;

use image::{Rgba, RgbaImage};

/// Fill colour for pixels no monitor covers
pub const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Fill colour for the padding row/column of the output surface
pub const PAD: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Allocates a cleared surface of the given size
pub fn blank_surface(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, CLEAR)
}
