//! Encoder sinks and output paths
//!
//! The pacing loop only sees [`EncoderSink`](crate::capture::EncoderSink).
//! This module holds the production implementation ([`FfmpegEncoder`]) and
//! the helpers that turn a [`SessionConfig`] into encoder parameters.

pub mod ffmpeg;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
pub use ffmpeg::FfmpegEncoder;

use crate::capture::EncoderParams;
use crate::constants;
use crate::model::SessionConfig;

/// Encoder parameters for a session: even output size, `1000 / interval`
/// frames per second, and the configured bitrate.
pub fn params_for(config: &SessionConfig) -> EncoderParams {
    let size = config.output_size();
    EncoderParams {
        path:       config.output_path.clone(),
        width:      size.width,
        height:     size.height,
        frame_rate: config.frame_rate(),
        bitrate:    config.bitrate,
    }
}

/// `Output/output.mp4` relative to the working directory.
pub fn default_output_path() -> PathBuf {
    Path::new(constants::DEFAULT_OUTPUT_DIR).join(constants::DEFAULT_OUTPUT_FILENAME)
}

/// A per-session file name inside `dir`, e.g. `recording-20240131-142501.mp4`.
pub fn timestamped_output_path(dir: &Path, at: DateTime<Local>) -> PathBuf {
    dir.join(format!("recording-{}.mp4", at.format("%Y%m%d-%H%M%S")))
}
