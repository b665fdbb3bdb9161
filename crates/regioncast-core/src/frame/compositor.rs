//! Cursor compositing onto sampled surfaces.

use image::RgbaImage;

use crate::model::{BorderInsets, CaptureRegion, CursorSnapshot, ScreenPoint};

/// Draws the OS cursor into a sampled surface.
///
/// The glyph lands at
/// `(cursor.x - region.left - border.left - offset.x, cursor.y - region.top - border.top - offset.y)`
/// in surface coordinates, where `cursor` is the raw pointer position.
/// `offset` is the calibration constant between that position and the
/// glyph's top-left pixel (the hotspot of a typical arrow cursor).
#[derive(Debug, Clone, Copy)]
pub struct CursorCompositor {
    border: BorderInsets,
    offset: ScreenPoint,
}

impl CursorCompositor {
    /// Creates a compositor for a session's border and calibration offset
    pub fn new(border: BorderInsets, offset: ScreenPoint) -> Self {
        Self { border, offset }
    }

    /// Surface coordinate of the glyph's top-left pixel.
    pub fn glyph_origin(&self, region: &CaptureRegion, snapshot: &CursorSnapshot) -> (i64, i64) {
        let x = snapshot.x as i64
            - region.left as i64
            - self.border.left as i64
            - self.offset.x as i64;
        let y = snapshot.y as i64
            - region.top as i64
            - self.border.top as i64
            - self.offset.y as i64;
        (x, y)
    }

    /// Composites the cursor if it is visible and has a glyph.
    ///
    /// Returns whether anything was drawn. A hidden cursor leaves the
    /// surface untouched.
    pub fn composite(
        &self,
        surface: &mut RgbaImage,
        region: &CaptureRegion,
        snapshot: &CursorSnapshot,
    ) -> bool {
        if !snapshot.visible {
            return false;
        }
        let Some(glyph) = snapshot.glyph.as_ref() else {
            return false;
        };

        let (x, y) = self.glyph_origin(region, snapshot);
        blend_over(surface, &glyph.image, x, y)
    }
}

/// Alpha-blends `src` over `dest` with its top-left at `(x, y)`, clipping to
/// `dest`. Returns whether any pixel overlapped.
pub fn blend_over(dest: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64) -> bool {
    let dest_w = dest.width() as i64;
    let dest_h = dest.height() as i64;

    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + src.width() as i64).min(dest_w);
    let y1 = (y + src.height() as i64).min(dest_h);
    if x0 >= x1 || y0 >= y1 {
        return false;
    }

    for dy in y0..y1 {
        for dx in x0..x1 {
            let fg = src.get_pixel((dx - x) as u32, (dy - y) as u32);
            let alpha = fg[3] as u32;
            if alpha == 0 {
                continue;
            }

            let bg = dest.get_pixel_mut(dx as u32, dy as u32);
            if alpha == 255 {
                *bg = *fg;
                continue;
            }

            let inv = 255 - alpha;
            for c in 0..3 {
                bg[c] = ((fg[c] as u32 * alpha + bg[c] as u32 * inv + 127) / 255) as u8;
            }
            bg[3] = (alpha + (bg[3] as u32 * inv + 127) / 255).min(255) as u8;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use image::Rgba;

    use super::*;
    use crate::model::CursorGlyph;

    fn glyph(width: u32, height: u32, pixel: Rgba<u8>) -> Arc<CursorGlyph> {
        Arc::new(CursorGlyph {
            handle: 1,
            image:  RgbaImage::from_pixel(width, height, pixel),
        })
    }

    fn surface() -> RgbaImage {
        RgbaImage::from_pixel(20, 10, Rgba([10, 20, 30, 255]))
    }

    #[test]
    fn test_glyph_origin_formula() {
        let compositor = CursorCompositor::new(BorderInsets::new(2, 3, 0, 0), ScreenPoint::new(4, 0));
        let region = CaptureRegion::new(100, 200, 20, 10);
        let snapshot = CursorSnapshot::visible(110, 207, glyph(1, 1, Rgba([255; 4])));

        assert_eq!(compositor.glyph_origin(&region, &snapshot), (4, 4));
    }

    #[test]
    fn test_hidden_cursor_draws_nothing() {
        let compositor = CursorCompositor::new(BorderInsets::default(), ScreenPoint::new(4, 0));
        let region = CaptureRegion::new(0, 0, 20, 10);
        let mut target = surface();
        let before = target.clone();

        let mut snapshot = CursorSnapshot::visible(5, 5, glyph(3, 3, Rgba([255, 0, 0, 255])));
        snapshot.visible = false;

        assert!(!compositor.composite(&mut target, &region, &snapshot));
        assert_eq!(target, before);
    }

    #[test]
    fn test_opaque_glyph_replaces_pixels() {
        let compositor = CursorCompositor::new(BorderInsets::default(), ScreenPoint::new(0, 0));
        let region = CaptureRegion::new(0, 0, 20, 10);
        let mut target = surface();

        let snapshot = CursorSnapshot::visible(5, 5, glyph(2, 2, Rgba([255, 0, 0, 255])));
        assert!(compositor.composite(&mut target, &region, &snapshot));

        assert_eq!(*target.get_pixel(5, 5), Rgba([255, 0, 0, 255]));
        assert_eq!(*target.get_pixel(6, 6), Rgba([255, 0, 0, 255]));
        assert_eq!(*target.get_pixel(7, 7), Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_glyph_clipped_at_edges() {
        let mut target = surface();
        let src = RgbaImage::from_pixel(4, 4, Rgba([0, 255, 0, 255]));

        assert!(blend_over(&mut target, &src, -2, -2));
        assert_eq!(*target.get_pixel(0, 0), Rgba([0, 255, 0, 255]));
        assert_eq!(*target.get_pixel(1, 1), Rgba([0, 255, 0, 255]));
        assert_eq!(*target.get_pixel(2, 2), Rgba([10, 20, 30, 255]));

        assert!(blend_over(&mut target, &src, 18, 8));
        assert_eq!(*target.get_pixel(19, 9), Rgba([0, 255, 0, 255]));

        assert!(!blend_over(&mut target, &src, 20, 0));
        assert!(!blend_over(&mut target, &src, -4, 0));
    }

    #[test]
    fn test_translucent_glyph_blends() {
        let mut target = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255]));
        let src = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 128]));

        blend_over(&mut target, &src, 0, 0);
        let px = target.get_pixel(0, 0);
        assert_eq!(px[0], 128);
        assert_eq!(px[3], 255);
    }

    #[test]
    fn test_transparent_glyph_pixels_leave_surface() {
        let mut target = surface();
        let before = target.clone();
        let src = RgbaImage::from_pixel(3, 3, Rgba([255, 255, 255, 0]));

        blend_over(&mut target, &src, 1, 1);
        assert_eq!(target, before);
    }
}
