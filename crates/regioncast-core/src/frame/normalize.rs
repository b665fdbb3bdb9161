//! Even-dimension normalization.
//!
//! Most encoders reject odd frame sizes, so every session writes into an
//! [`OutputSurface`] whose size is the requested size rounded up to even.

use std::sync::Arc;

use image::{RgbaImage, imageops};

use super::PAD;
use crate::capture::SharedFrame;
use crate::model::OutputSize;

/// The even-dimensioned frame handed to the encoder.
///
/// Allocated once per session and filled with opaque black. Each tick copies
/// the sampled surface to `(0, 0)`; the padding row/column, if any, keeps
/// its initial fill.
#[derive(Debug, Clone)]
pub struct OutputSurface {
    size:  OutputSize,
    frame: SharedFrame,
}

impl OutputSurface {
    /// Allocates the surface for a requested client size
    pub fn new(requested_width: u32, requested_height: u32) -> Self {
        let size = OutputSize::for_requested(requested_width, requested_height);
        Self {
            size,
            frame: Arc::new(RgbaImage::from_pixel(size.width, size.height, PAD)),
        }
    }

    /// Encoded size
    pub fn size(&self) -> OutputSize {
        self.size
    }

    /// Copies `sampled` into the surface and returns the finished frame.
    ///
    /// If the encoder still holds the previous frame, the pixels are copied
    /// once before writing; otherwise the buffer is reused in place.
    pub fn normalize(&mut self, sampled: &RgbaImage) -> SharedFrame {
        let frame = Arc::make_mut(&mut self.frame);
        imageops::replace(frame, sampled, 0, 0);
        Arc::clone(&self.frame)
    }

    /// Most recent finished frame (for makeup duplicates)
    pub fn last_frame(&self) -> SharedFrame {
        Arc::clone(&self.frame)
    }
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;

    #[test]
    fn test_odd_width_padded() {
        let mut surface = OutputSurface::new(101, 50);
        assert_eq!(surface.size(), OutputSize { width: 102, height: 50 });

        let sampled = RgbaImage::from_pixel(101, 50, Rgba([200, 100, 50, 255]));
        let frame = surface.normalize(&sampled);

        assert_eq!(frame.dimensions(), (102, 50));
        assert_eq!(*frame.get_pixel(100, 49), Rgba([200, 100, 50, 255]));
        for y in 0..50 {
            assert_eq!(*frame.get_pixel(101, y), Rgba([0, 0, 0, 255]));
        }
    }

    #[test]
    fn test_even_size_copied_exactly() {
        let mut surface = OutputSurface::new(4, 2);
        let mut sampled = RgbaImage::new(4, 2);
        sampled.put_pixel(3, 1, Rgba([1, 2, 3, 4]));

        let frame = surface.normalize(&sampled);
        assert_eq!(*frame, sampled);
    }

    #[test]
    fn test_held_frame_not_mutated() {
        let mut surface = OutputSurface::new(3, 3);

        let first = surface.normalize(&RgbaImage::from_pixel(3, 3, Rgba([9, 9, 9, 255])));
        let second = surface.normalize(&RgbaImage::from_pixel(3, 3, Rgba([7, 7, 7, 255])));

        assert_eq!(*first.get_pixel(0, 0), Rgba([9, 9, 9, 255]));
        assert_eq!(*second.get_pixel(0, 0), Rgba([7, 7, 7, 255]));
        assert_eq!(*second.get_pixel(3, 3), Rgba([0, 0, 0, 255]));
        assert!(Arc::ptr_eq(&second, &surface.last_frame()));
    }
}
