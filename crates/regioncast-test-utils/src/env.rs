//! Test environment detection
//!
//! Live tests (real screen sampling, real cursor queries, real ffmpeg) skip
//! themselves when the machine cannot run them. CI runs them under `xvfb`:
//!
//! ```bash
//! xvfb-run -a cargo test -p regioncast-core --features integration-tests
//! ```

use std::process::{Command, Stdio};

/// Whether an X11 display (native or XWayland) is reachable
pub fn display_available() -> bool {
    std::env::var("DISPLAY").is_ok_and(|display| !display.is_empty())
}

/// ffmpeg executable the tests should use: `REGIONCAST_FFMPEG` or `ffmpeg`
pub fn ffmpeg_program() -> String {
    std::env::var("REGIONCAST_FFMPEG").unwrap_or_else(|_| "ffmpeg".to_string())
}

/// Whether the ffmpeg executable runs
pub fn ffmpeg_available() -> bool {
    Command::new(ffmpeg_program())
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}

/// Prints the variables that decide which live tests run
///
/// Displays display-server and encoder settings for debugging test failures.
pub fn print_test_environment() {
    let var = |name: &str| std::env::var(name).unwrap_or_else(|_| "NOT SET".to_string());

    eprintln!("=== Regioncast Test Environment ===");
    eprintln!("DISPLAY: {}", var("DISPLAY"));
    eprintln!("WAYLAND_DISPLAY: {}", var("WAYLAND_DISPLAY"));
    eprintln!("XDG_SESSION_TYPE: {}", var("XDG_SESSION_TYPE"));
    eprintln!("REGIONCAST_FFMPEG: {}", var("REGIONCAST_FFMPEG"));
    eprintln!("ffmpeg runnable: {}", ffmpeg_available());
    eprintln!("===================================\n");
}
