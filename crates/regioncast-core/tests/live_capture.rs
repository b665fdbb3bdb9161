//! Live capture integration tests
//!
//! These tests sample a real display and encode with a real ffmpeg. They
//! are compiled only with the `integration-tests` feature and skip
//! themselves when `$DISPLAY` is unset or ffmpeg cannot be run.
//!
//! # Requirements
//!
//! - X11 display server or XWayland ($DISPLAY must be set)
//! - An `ffmpeg` binary on PATH, or `REGIONCAST_FFMPEG`
//!
//! # Running Tests
//!
//! ```bash
//! # Headless with xvfb
//! xvfb-run -a cargo test -p regioncast-core --features integration-tests --test live_capture
//!
//! # Against a live session
//! DISPLAY=:0 cargo test -p regioncast-core --features integration-tests --test live_capture
//! ```

#[cfg(feature = "integration-tests")]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use image::RgbaImage;
    use regioncast_core::capture::mock::FixedPosition;
    use regioncast_core::capture::{FrameSampler, XcapSampler, create_default_backend, list_displays};
    use regioncast_core::encoder::FfmpegEncoder;
    use regioncast_core::model::{CaptureRegion, ScreenPoint, SessionConfig};
    use regioncast_core::session::Recorder;
    use regioncast_test_utils::env::{
        display_available, ffmpeg_available, ffmpeg_program, print_test_environment,
    };
    use regioncast_test_utils::timing::{assert_duration_below, measure_sync};

    fn live_display() -> bool {
        if !display_available() {
            eprintln!("Skipping: DISPLAY not set");
            return false;
        }
        true
    }

    #[test]
    fn test_list_displays() {
        if !live_display() {
            return;
        }

        let displays = list_displays().expect("list displays");
        assert!(!displays.is_empty(), "at least one display expected");
        for display in &displays {
            println!("{}", display);
            assert!(display.bounds.width > 0 && display.bounds.height > 0);
        }
    }

    #[test]
    fn test_sample_primary_corner() {
        if !live_display() {
            return;
        }

        let displays = list_displays().expect("list displays");
        let primary = displays
            .iter()
            .find(|d| d.is_primary)
            .unwrap_or(&displays[0]);
        let origin = ScreenPoint::new(primary.bounds.x, primary.bounds.y);

        let mut sampler = XcapSampler::new().expect("sampler");
        let mut surface = RgbaImage::new(64, 48);
        let (result, elapsed) = measure_sync("sample_64x48", || sampler.sample(origin, &mut surface));

        result.expect("sample");
        assert_duration_below(elapsed, Duration::from_secs(2), "sample_64x48");
    }

    #[test]
    fn test_region_off_every_display_is_blank() {
        if !live_display() {
            return;
        }

        let mut sampler = XcapSampler::new().expect("sampler");
        let mut surface = RgbaImage::new(8, 8);
        sampler
            .sample(ScreenPoint::new(-1_000_000, -1_000_000), &mut surface)
            .expect("off-screen sample is not an error");
        assert!(surface.pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }

    #[test]
    fn test_record_short_session() {
        print_test_environment();
        if !live_display() {
            return;
        }
        if !ffmpeg_available() {
            eprintln!("Skipping: ffmpeg not runnable");
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.mp4");
        let backend = create_default_backend().expect("capture backend");
        println!("{:?}", backend);

        let config = SessionConfig::builder(CaptureRegion::new(0, 0, 161, 99), &path)
            .interval(Duration::from_millis(50))
            .max_ticks(20)
            .build()
            .unwrap();
        let encoder = FfmpegEncoder::from_env().with_program(ffmpeg_program());
        let recorder = Recorder::new(Arc::new(encoder));

        let inputs = backend.into_inputs(Box::new(FixedPosition(ScreenPoint::new(0, 0))));
        let summary = recorder.start(config, inputs).unwrap().join().unwrap();
        println!("{}", summary);

        assert_eq!(summary.stats.ticks_run, 20);
        assert_eq!((summary.output_size.width, summary.output_size.height), (162, 100));
        assert!(summary.stats.frames_written >= 20);
        let written = std::fs::metadata(&path).unwrap().len();
        assert!(written > 0, "encoder produced an empty file");
    }
}
