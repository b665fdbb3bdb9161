//! Screen sampling via xcap
//!
//! [`XcapSampler`] copies an arbitrary rectangle of the virtual desktop into
//! a surface. The rectangle may straddle several monitors or hang off the
//! edge of all of them: each monitor contributes the part of the rectangle
//! it covers, and uncovered pixels keep the clear colour.
//!
//! Monitors are re-enumerated on every sample so hot-plugging and layout
//! changes take effect on the next tick.

use std::fmt;

use image::{RgbaImage, imageops};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::FrameSampler;
use crate::error::{RecordError, RecordResult};
use crate::frame::CLEAR;
use crate::model::{BackendType, ScreenPoint};
use crate::util::detect::detect_platform;

/// An axis-aligned rectangle in absolute screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenRect {
    /// Left edge
    pub x:      i32,
    /// Top edge
    pub y:      i32,
    /// Width in pixels
    pub width:  u32,
    /// Height in pixels
    pub height: u32,
}

impl ScreenRect {
    /// Creates a rectangle
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    /// Overlapping part of two rectangles, if any
    ///
    /// # Examples
    ///
    /// ```
    /// use regioncast_core::capture::xcap_sampler::ScreenRect;
    ///
    /// let monitor = ScreenRect::new(0, 0, 1920, 1080);
    /// let region = ScreenRect::new(1900, 1000, 100, 100);
    /// assert_eq!(monitor.intersect(&region), Some(ScreenRect::new(1900, 1000, 20, 80)));
    /// ```
    pub fn intersect(&self, other: &ScreenRect) -> Option<ScreenRect> {
        let left = (self.x as i64).max(other.x as i64);
        let top = (self.y as i64).max(other.y as i64);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if left >= right || top >= bottom {
            return None;
        }
        Some(ScreenRect::new(
            left as i32,
            top as i32,
            (right - left) as u32,
            (bottom - top) as u32,
        ))
    }
}

/// A display as reported by the capture backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayInfo {
    /// Display name
    pub name:       String,
    /// Position and size on the virtual desktop
    pub bounds:     ScreenRect,
    /// Whether this is the primary display
    pub is_primary: bool,
}

impl fmt::Display for DisplayInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}x{} at ({}, {}){}",
            self.name,
            self.bounds.width,
            self.bounds.height,
            self.bounds.x,
            self.bounds.y,
            if self.is_primary { " [primary]" } else { "" }
        )
    }
}

/// Maps an xcap error to [`RecordError::CaptureUnavailable`].
fn map_xcap_error(backend: BackendType, e: impl fmt::Display) -> RecordError {
    let reason = e.to_string();
    let lower = reason.to_lowercase();

    if lower.contains("permission denied") || lower.contains("access denied") {
        warn!("xcap permission denied - check screen capture permissions");
    } else if lower.contains("display") || lower.contains("connection") {
        warn!("xcap failed to connect to the display server - verify DISPLAY is set");
    }

    RecordError::CaptureUnavailable { backend, reason }
}

fn bounds_of(monitor: &xcap::Monitor) -> Result<ScreenRect, String> {
    let x = monitor.x().map_err(|e| e.to_string())?;
    let y = monitor.y().map_err(|e| e.to_string())?;
    let width = monitor.width().map_err(|e| e.to_string())?;
    let height = monitor.height().map_err(|e| e.to_string())?;
    Ok(ScreenRect::new(x, y, width, height))
}

/// Lists the displays xcap can capture.
///
/// # Errors
///
/// [`RecordError::CaptureUnavailable`] if the display server cannot be
/// reached.
pub fn list_displays() -> RecordResult<Vec<DisplayInfo>> {
    let backend = detect_platform().backend;
    let monitors = xcap::Monitor::all().map_err(|e| map_xcap_error(backend, e))?;

    monitors
        .iter()
        .map(|monitor| {
            let bounds = bounds_of(monitor).map_err(|e| map_xcap_error(backend, e))?;
            Ok(DisplayInfo {
                name: monitor.name().unwrap_or_else(|_| "Unknown".to_string()),
                bounds,
                is_primary: monitor.is_primary().unwrap_or(false),
            })
        })
        .collect()
}

/// Production [`FrameSampler`] backed by xcap monitor capture.
#[derive(Debug, Clone)]
pub struct XcapSampler {
    backend: BackendType,
}

impl XcapSampler {
    /// Creates a sampler, failing if no display can be enumerated.
    ///
    /// # Errors
    ///
    /// [`RecordError::CaptureUnavailable`] if the capture API is unusable or
    /// reports no monitors.
    pub fn new() -> RecordResult<Self> {
        let backend = detect_platform().backend;
        let monitors = xcap::Monitor::all().map_err(|e| map_xcap_error(backend, e))?;
        if monitors.is_empty() {
            return Err(RecordError::CaptureUnavailable {
                backend,
                reason: "no monitors found".to_string(),
            });
        }

        debug!(%backend, monitors = monitors.len(), "xcap sampler ready");
        Ok(Self { backend })
    }
}

impl FrameSampler for XcapSampler {
    fn sample(&mut self, origin: ScreenPoint, dest: &mut RgbaImage) -> RecordResult<()> {
        for pixel in dest.pixels_mut() {
            *pixel = CLEAR;
        }

        let target = ScreenRect::new(origin.x, origin.y, dest.width(), dest.height());
        let monitors = xcap::Monitor::all().map_err(|e| map_xcap_error(self.backend, e))?;

        let mut covered = 0usize;
        let mut last_error = None;
        for monitor in &monitors {
            let bounds = match bounds_of(monitor) {
                Ok(bounds) => bounds,
                Err(e) => {
                    last_error = Some(e);
                    continue;
                }
            };
            let Some(overlap) = bounds.intersect(&target) else {
                continue;
            };

            let image = match monitor.capture_image() {
                Ok(image) => image,
                Err(e) => {
                    last_error = Some(e.to_string());
                    continue;
                }
            };

            let part = imageops::crop_imm(
                &image,
                (overlap.x - bounds.x) as u32,
                (overlap.y - bounds.y) as u32,
                overlap.width,
                overlap.height,
            )
            .to_image();
            imageops::replace(
                dest,
                &part,
                (overlap.x - target.x) as i64,
                (overlap.y - target.y) as i64,
            );
            covered += 1;
        }

        // Off-screen regions are clipped silently; only a total failure is fatal.
        if covered == 0 {
            if let Some(reason) = last_error {
                return Err(map_xcap_error(self.backend, reason));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersect_inside() {
        let monitor = ScreenRect::new(0, 0, 100, 100);
        let region = ScreenRect::new(10, 20, 30, 40);
        assert_eq!(monitor.intersect(&region), Some(region));
    }

    #[test]
    fn test_intersect_negative_coordinates() {
        let left_monitor = ScreenRect::new(-1920, 0, 1920, 1080);
        let region = ScreenRect::new(-10, 100, 50, 50);
        assert_eq!(
            left_monitor.intersect(&region),
            Some(ScreenRect::new(-10, 100, 10, 50))
        );
    }

    #[test]
    fn test_intersect_disjoint() {
        let monitor = ScreenRect::new(0, 0, 100, 100);
        assert_eq!(monitor.intersect(&ScreenRect::new(100, 0, 10, 10)), None);
        assert_eq!(monitor.intersect(&ScreenRect::new(0, -10, 10, 10)), None);
    }

    #[test]
    fn test_display_info_format() {
        let info = DisplayInfo {
            name:       "HDMI-1".to_string(),
            bounds:     ScreenRect::new(1920, 0, 2560, 1440),
            is_primary: true,
        };
        assert_eq!(info.to_string(), "HDMI-1 2560x1440 at (1920, 0) [primary]");
    }

    #[test]
    fn test_capture_error_mapping() {
        let err = map_xcap_error(BackendType::X11, "Cannot open display");
        assert!(matches!(err, RecordError::CaptureUnavailable { backend: BackendType::X11, .. }));
        assert!(err.is_fatal());
    }
}
