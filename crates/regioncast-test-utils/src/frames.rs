//! Frame inspection helpers
//!
//! Encoded frames are plain RGBA surfaces, so most assertions are pixel
//! comparisons. These helpers add the checks several test files share and a
//! way to dump a frame to disk when a comparison fails.

use std::fs;
use std::path::PathBuf;

use image::{Rgba, RgbaImage};
use regioncast_core::capture::mock::test_pattern;
use regioncast_core::model::ScreenPoint;

/// Get the test output directory using CARGO_MANIFEST_DIR for robustness
pub fn test_output_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_output")
}

/// Save a frame to test_output/ for visual verification
///
/// Creates the directory if needed and returns the absolute path.
///
/// # Example
///
/// ```ignore
/// use regioncast_test_utils::frames::save_test_frame;
///
/// let path = save_test_frame(&frames[0], "first_frame");
/// println!("Frame saved to: {}", path.display());
/// ```
pub fn save_test_frame(frame: &RgbaImage, name: &str) -> PathBuf {
    let output_dir = test_output_dir();
    fs::create_dir_all(&output_dir).expect("Failed to create test_output directory");

    let path = output_dir.join(format!("{}.png", name));
    frame.save(&path).expect("Failed to save PNG");

    let abs_path = fs::canonicalize(&path).unwrap_or(path.clone());
    println!(
        "[SAVED] {} ({}x{}) -> {}",
        name,
        frame.width(),
        frame.height(),
        abs_path.display()
    );
    abs_path
}

/// The mock sampler's output for a `width` x `height` surface at `origin`
pub fn expected_pattern(origin: ScreenPoint, width: u32, height: u32) -> RgbaImage {
    let mut image = RgbaImage::new(width, height);
    test_pattern(origin, &mut image);
    image
}

/// Asserts both frame dimensions are even.
///
/// # Panics
///
/// Panics naming the odd dimension.
pub fn assert_even_dimensions(frame: &RgbaImage) {
    assert!(
        frame.width() % 2 == 0 && frame.height() % 2 == 0,
        "frame is {}x{}, expected even dimensions",
        frame.width(),
        frame.height()
    );
}

/// Asserts every pixel of column `x` is `color`.
///
/// # Panics
///
/// Panics on the first mismatching row.
pub fn assert_column(frame: &RgbaImage, x: u32, color: Rgba<u8>) {
    for y in 0..frame.height() {
        assert_eq!(
            *frame.get_pixel(x, y),
            color,
            "pixel ({}, {}) differs from column colour",
            x,
            y
        );
    }
}

/// Asserts that `frame` matches `expected` inside the `expected` bounds.
///
/// Padding outside those bounds is ignored.
///
/// # Panics
///
/// Panics on the first differing pixel, after saving both surfaces to
/// test_output/ under `name`.
pub fn assert_matches_within(frame: &RgbaImage, expected: &RgbaImage, name: &str) {
    assert!(
        frame.width() >= expected.width() && frame.height() >= expected.height(),
        "frame {}x{} is smaller than expected {}x{}",
        frame.width(),
        frame.height(),
        expected.width(),
        expected.height()
    );

    for (x, y, pixel) in expected.enumerate_pixels() {
        if frame.get_pixel(x, y) != pixel {
            save_test_frame(frame, &format!("{}_actual", name));
            save_test_frame(expected, &format!("{}_expected", name));
            panic!(
                "{}: pixel ({}, {}) is {:?}, expected {:?}",
                name,
                x,
                y,
                frame.get_pixel(x, y),
                pixel
            );
        }
    }
}
