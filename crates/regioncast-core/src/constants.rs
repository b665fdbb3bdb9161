//! Centralized timing and encoding constants for recording sessions.
//!
//! This module consolidates the defaults used when a session is started
//! without explicit values. Centralizing them keeps the pacing loop, the
//! encoder, and the CLI in agreement about cadence and limits.
//!
//! # Runtime Configuration
//!
//! Every value can be overridden at runtime via environment variables:
//!
//! | Environment Variable | Default | Description |
//! |---------------------|---------|-------------|
//! | `REGIONCAST_INTERVAL_MS` | 33 | Nominal tick interval |
//! | `REGIONCAST_BITRATE` | 100000000 | Encoder target bitrate (bits/s) |
//! | `REGIONCAST_MAX_DURATION_SECS` | 21600 | Session ceiling (6 hours) |
//! | `REGIONCAST_POSITION_TIMEOUT_MS` | 250 | Host position round-trip budget |
//! | `REGIONCAST_ENCODER_SEND_TIMEOUT_MS` | 2000 | Encoder frame hand-off budget |
//! | `REGIONCAST_ENCODER_QUEUE_DEPTH` | 8 | Frames buffered ahead of the encoder |
//! | `REGIONCAST_FFMPEG` | `ffmpeg` | Encoder executable |
//!
//! Invalid values (unparseable, zero where zero is meaningless) fall back to
//! the defaults.

use std::time::Duration;

/// Nominal interval between ticks, in milliseconds (~30 fps).
pub const DEFAULT_INTERVAL_MS: u64 = 33;

/// Frame rate numerator: `frame_rate = FRAME_RATE_SCALE / interval_ms`.
pub const FRAME_RATE_SCALE: u64 = 1000;

/// Encoder target bitrate. Large on purpose: screen content compresses
/// poorly at low bitrates and the files are meant for editing.
pub const DEFAULT_BITRATE: u64 = 100_000_000;

/// Hard ceiling on session length. Converted to a tick count at session
/// start using the configured interval.
pub const MAX_SESSION_DURATION_SECS: u64 = 6 * 60 * 60;

/// Horizontal cursor calibration: glyph origin vs OS-reported position.
pub const CURSOR_OFFSET_LEFT: i32 = 4;

/// Vertical cursor calibration: glyph origin vs OS-reported position.
pub const CURSOR_OFFSET_TOP: i32 = 0;

/// How long the capture thread waits for the host to answer a position
/// request before keeping the previous position.
pub const POSITION_TIMEOUT_MS: u64 = 250;

/// How long a single frame hand-off may block before it is counted as a
/// failed write.
pub const ENCODER_SEND_TIMEOUT_MS: u64 = 2000;

/// Frames buffered between the capture thread and the encoder writer.
pub const ENCODER_QUEUE_DEPTH: usize = 8;

/// Default encoder executable.
pub const DEFAULT_FFMPEG: &str = "ffmpeg";

/// Default output directory, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "Output";

/// Default output file name inside [`DEFAULT_OUTPUT_DIR`].
pub const DEFAULT_OUTPUT_FILENAME: &str = "output.mp4";

/// Makeup bursts above this many seconds of video are logged at warn level.
pub const MAKEUP_BURST_WARN_SECS: u64 = 1;

// =============================================================================
// Environment Variable Overrides
// =============================================================================

/// Reads a positive integer from the environment, falling back to `default`.
fn get_u64_from_env(env_var: &str, default: u64) -> u64 {
    std::env::var(env_var)
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

/// Get the tick interval in milliseconds.
///
/// Override with: `REGIONCAST_INTERVAL_MS`
pub fn interval_ms() -> u64 {
    get_u64_from_env("REGIONCAST_INTERVAL_MS", DEFAULT_INTERVAL_MS)
}

/// Get the encoder bitrate.
///
/// Override with: `REGIONCAST_BITRATE`
pub fn bitrate() -> u64 {
    get_u64_from_env("REGIONCAST_BITRATE", DEFAULT_BITRATE)
}

/// Get the session ceiling.
///
/// Override with: `REGIONCAST_MAX_DURATION_SECS`
pub fn max_session_duration() -> Duration {
    Duration::from_secs(get_u64_from_env(
        "REGIONCAST_MAX_DURATION_SECS",
        MAX_SESSION_DURATION_SECS,
    ))
}

/// Get the host position round-trip timeout.
///
/// Override with: `REGIONCAST_POSITION_TIMEOUT_MS`
pub fn position_timeout() -> Duration {
    Duration::from_millis(get_u64_from_env("REGIONCAST_POSITION_TIMEOUT_MS", POSITION_TIMEOUT_MS))
}

/// Get the encoder hand-off timeout.
///
/// Override with: `REGIONCAST_ENCODER_SEND_TIMEOUT_MS`
pub fn encoder_send_timeout() -> Duration {
    Duration::from_millis(get_u64_from_env(
        "REGIONCAST_ENCODER_SEND_TIMEOUT_MS",
        ENCODER_SEND_TIMEOUT_MS,
    ))
}

/// Get the encoder queue depth.
///
/// Override with: `REGIONCAST_ENCODER_QUEUE_DEPTH`
pub fn encoder_queue_depth() -> usize {
    get_u64_from_env("REGIONCAST_ENCODER_QUEUE_DEPTH", ENCODER_QUEUE_DEPTH as u64) as usize
}

/// Get the encoder executable path.
///
/// Override with: `REGIONCAST_FFMPEG`
pub fn ffmpeg_path() -> String {
    std::env::var("REGIONCAST_FFMPEG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FFMPEG.to_string())
}
