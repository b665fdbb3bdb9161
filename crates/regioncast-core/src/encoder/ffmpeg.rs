//! FFmpeg encoder sink.
//!
//! Frames are streamed as raw RGBA to an `ffmpeg` child process over stdin
//! and encoded with the MPEG-4 codec at a fixed bitrate. A writer thread owns
//! the pipe; the capture thread hands frames to it through a bounded queue
//! with a send timeout, so a stalled encoder costs at most one timeout per
//! frame instead of blocking the tick loop.

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, SendTimeoutError, Sender, bounded};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::capture::{EncoderHandle, EncoderParams, EncoderSink, SharedFrame};
use crate::constants;
use crate::error::{RecordError, RecordResult};

/// Lines of ffmpeg stderr kept for error reports
const STDERR_TAIL_LINES: usize = 8;

/// Encoder sink backed by an `ffmpeg` executable.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    program:      String,
    queue_depth:  usize,
    send_timeout: Duration,
}

impl FfmpegEncoder {
    /// Uses the executable and queue settings from [`crate::constants`].
    pub fn from_env() -> Self {
        Self {
            program:      constants::ffmpeg_path(),
            queue_depth:  constants::encoder_queue_depth(),
            send_timeout: constants::encoder_send_timeout(),
        }
    }

    /// Uses an explicit executable
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Overrides the hand-off timeout
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Command-line arguments for encoding `params` from raw RGBA on stdin.
pub fn ffmpeg_args(params: &EncoderParams) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-y".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        "rgba".to_string(),
        "-s".to_string(),
        format!("{}x{}", params.width, params.height),
        "-r".to_string(),
        params.frame_rate.to_string(),
        "-i".to_string(),
        "-".to_string(),
        "-c:v".to_string(),
        "mpeg4".to_string(),
        "-b:v".to_string(),
        params.bitrate.to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        params.path.to_string_lossy().to_string(),
    ]
}

impl EncoderSink for FfmpegEncoder {
    fn open(&self, params: &EncoderParams) -> RecordResult<Box<dyn EncoderHandle>> {
        let open_failed = |reason: String| RecordError::EncoderOpenFailed {
            path: params.path.clone(),
            reason,
        };

        if let Some(parent) = params.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| open_failed(format!("cannot create {}: {}", parent.display(), e)))?;
        }
        // Surface permission problems here rather than as a failed close.
        File::create(&params.path).map_err(|e| open_failed(e.to_string()))?;

        let args = ffmpeg_args(params);
        debug!(program = %self.program, args = %args.join(" "), "Spawning encoder");

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| open_failed(format!("failed to start {}: {}", self.program, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| open_failed("encoder stdin unavailable".to_string()))?;

        let stderr_tail = Arc::new(Mutex::new(VecDeque::with_capacity(STDERR_TAIL_LINES)));
        let stderr_reader = child.stderr.take().map(|stderr| {
            let tail = Arc::clone(&stderr_tail);
            thread::spawn(move || {
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    debug!(target: "regioncast_core::encoder::ffmpeg", "{}", line);
                    let mut tail = tail.lock();
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
            })
        });

        let (frames, queue) = bounded::<SharedFrame>(self.queue_depth.max(1));
        let writer = thread::Builder::new()
            .name("regioncast-encoder".to_string())
            .spawn(move || write_frames(stdin, queue))
            .map_err(|e| open_failed(format!("failed to start writer thread: {}", e)))?;

        info!(
            path = %params.path.display(),
            width = params.width,
            height = params.height,
            fps = params.frame_rate,
            bitrate = params.bitrate,
            "Encoder opened"
        );

        Ok(Box::new(FfmpegHandle {
            frames: Some(frames),
            writer: Some(writer),
            stderr_reader,
            stderr_tail,
            child,
            send_timeout: self.send_timeout,
            expected_len: params.width as usize * params.height as usize * 4,
        }))
    }
}

/// Drains the queue into the pipe until the sender is dropped.
fn write_frames(stdin: ChildStdin, queue: Receiver<SharedFrame>) -> io::Result<u64> {
    let mut stdin = io::BufWriter::new(stdin);
    let mut written = 0;
    for frame in queue {
        stdin.write_all(frame.as_raw())?;
        written += 1;
    }
    stdin.flush()?;
    Ok(written)
}

struct FfmpegHandle {
    frames:        Option<Sender<SharedFrame>>,
    writer:        Option<JoinHandle<io::Result<u64>>>,
    stderr_reader: Option<JoinHandle<()>>,
    stderr_tail:   Arc<Mutex<VecDeque<String>>>,
    child:         Child,
    send_timeout:  Duration,
    expected_len:  usize,
}

impl FfmpegHandle {
    fn stderr_summary(&self) -> String {
        let tail = self.stderr_tail.lock();
        if tail.is_empty() {
            "no encoder output".to_string()
        } else {
            tail.iter().cloned().collect::<Vec<_>>().join("; ")
        }
    }

    fn finish(&mut self) -> RecordResult<()> {
        // Closing the queue ends the writer, which closes stdin.
        drop(self.frames.take());

        let written = match self.writer.take().map(|writer| writer.join()) {
            Some(Ok(Ok(written))) => Some(written),
            Some(Ok(Err(e))) => {
                warn!(error = %e, "Encoder pipe closed early");
                None
            }
            Some(Err(_)) => {
                return Err(RecordError::EncoderCloseFailed {
                    reason: "encoder writer thread panicked".to_string(),
                });
            }
            None => return Ok(()),
        };

        let status = self.child.wait()?;
        if let Some(reader) = self.stderr_reader.take() {
            let _ = reader.join();
        }

        if !status.success() {
            return Err(RecordError::EncoderCloseFailed {
                reason: format!("ffmpeg exited with {}: {}", status, self.stderr_summary()),
            });
        }

        info!(frames = written.unwrap_or_default(), "Encoder closed");
        Ok(())
    }
}

impl EncoderHandle for FfmpegHandle {
    fn append_frame(&mut self, frame: &SharedFrame) -> RecordResult<()> {
        if frame.as_raw().len() != self.expected_len {
            return Err(RecordError::EncoderWriteFailed {
                reason: format!(
                    "frame is {}x{}, encoder expects {} bytes",
                    frame.width(),
                    frame.height(),
                    self.expected_len
                ),
            });
        }

        let Some(frames) = self.frames.as_ref() else {
            return Err(RecordError::EncoderWriteFailed {
                reason: "encoder already closed".to_string(),
            });
        };

        frames
            .send_timeout(Arc::clone(frame), self.send_timeout)
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => RecordError::EncoderWriteFailed {
                    reason: format!(
                        "encoder queue still full after {}ms",
                        self.send_timeout.as_millis()
                    ),
                },
                SendTimeoutError::Disconnected(_) => RecordError::EncoderWriteFailed {
                    reason: format!("encoder exited ({})", self.stderr_summary()),
                },
            })
    }

    fn close(mut self: Box<Self>) -> RecordResult<()> {
        self.finish()
    }
}

impl Drop for FfmpegHandle {
    fn drop(&mut self) {
        if self.writer.is_some() {
            if let Err(e) = self.finish() {
                warn!(error = %e, "Encoder finalize failed during drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn params(path: PathBuf) -> EncoderParams {
        EncoderParams {
            path,
            width: 102,
            height: 50,
            frame_rate: 30,
            bitrate: 100_000_000,
        }
    }

    #[test]
    fn test_ffmpeg_args() {
        let args = ffmpeg_args(&params(PathBuf::from("Output/output.mp4")));
        let joined = args.join(" ");

        assert!(joined.contains("-f rawvideo -pix_fmt rgba -s 102x50 -r 30 -i -"));
        assert!(joined.contains("-c:v mpeg4 -b:v 100000000"));
        assert_eq!(args.last().map(String::as_str), Some("Output/output.mp4"));
    }

    #[test]
    fn test_missing_program_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = FfmpegEncoder::from_env().with_program("regioncast-no-such-ffmpeg");

        let err = encoder
            .open(&params(dir.path().join("out.mp4")))
            .err()
            .unwrap();
        assert!(matches!(err, RecordError::EncoderOpenFailed { .. }));
        assert!(err.to_string().contains("regioncast-no-such-ffmpeg"));
    }

    #[test]
    fn test_unwritable_output_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        File::create(&blocker).unwrap();

        let encoder = FfmpegEncoder::from_env();
        let err = encoder
            .open(&params(blocker.join("nested").join("out.mp4")))
            .err()
            .unwrap();
        assert!(matches!(err, RecordError::EncoderOpenFailed { .. }));
    }

    #[test]
    fn test_output_directory_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Output").join("out.mp4");

        let encoder = FfmpegEncoder::from_env().with_program("regioncast-no-such-ffmpeg");
        let _ = encoder.open(&params(path.clone()));

        assert!(path.parent().unwrap().is_dir());
    }
}
