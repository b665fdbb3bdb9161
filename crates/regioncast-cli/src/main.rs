//! regioncast: record a screen region to video
//!
//! Provides commands for recording a region with drift-corrected pacing,
//! listing the displays that can be sampled, and probing how fast a region
//! can be sampled on this machine.

mod probe;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use regioncast_core::capture::{SessionObserver, create_default_backend, list_displays};
use regioncast_core::constants;
use regioncast_core::encoder::{FfmpegEncoder, default_output_path, timestamped_output_path};
use regioncast_core::error::{RecordError, RecordResult};
use regioncast_core::host::position_channel;
use regioncast_core::model::{BorderInsets, CaptureRegion, ScreenPoint, SessionConfig};
use regioncast_core::session::Recorder;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "regioncast")]
#[command(about = "Record a screen region to video with drift-corrected pacing")]
struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a region until Ctrl-C or the tick ceiling
    Record(RecordArgs),
    /// List the displays available for sampling
    Monitors {
        /// Print the list as JSON
        #[arg(long)]
        json: bool,
    },
    /// Measure sampling latency for a region against the tick interval
    Probe(probe::ProbeArgs),
}

/// Window geometry shared by `record` and `probe`
#[derive(Args, Debug, Clone)]
pub(crate) struct Geometry {
    /// Window left edge in screen coordinates
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    x: i32,
    /// Window top edge in screen coordinates
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    y: i32,
    /// Outer window width
    #[arg(long)]
    width: u32,
    /// Outer window height
    #[arg(long)]
    height: u32,
    /// Border inset on every edge
    #[arg(long, default_value_t = 0)]
    border: u32,
    /// Top inset, if the title bar is thicker than the border
    #[arg(long)]
    border_top: Option<u32>,
}

impl Geometry {
    pub(crate) fn insets(&self) -> BorderInsets {
        BorderInsets::new(
            self.border,
            self.border_top.unwrap_or(self.border),
            self.border,
            self.border,
        )
    }

    pub(crate) fn region(&self) -> CaptureRegion {
        CaptureRegion::from_window(self.x, self.y, self.width, self.height, &self.insets())
    }
}

#[derive(Args, Debug)]
struct RecordArgs {
    #[command(flatten)]
    geometry: Geometry,
    /// Tick interval in milliseconds (default: REGIONCAST_INTERVAL_MS or 33)
    #[arg(long)]
    interval: Option<u64>,
    /// Stop after this many seconds
    #[arg(long)]
    duration: Option<u64>,
    /// Stop after this many ticks (takes precedence over --duration)
    #[arg(long)]
    max_ticks: Option<u64>,
    /// Encoder bitrate in bits per second
    #[arg(long)]
    bitrate: Option<u64>,
    /// Record without the mouse cursor
    #[arg(long)]
    no_cursor: bool,
    /// Horizontal cursor calibration offset
    #[arg(long, allow_negative_numbers = true)]
    cursor_offset_x: Option<i32>,
    /// Vertical cursor calibration offset
    #[arg(long, allow_negative_numbers = true)]
    cursor_offset_y: Option<i32>,
    /// Cap on duplicate frames written in one tick
    #[arg(long)]
    max_makeup: Option<u64>,
    /// Output file (default: Output/output.mp4)
    #[arg(short, long)]
    out: Option<PathBuf>,
    /// Name the output after the start time, inside Output/
    #[arg(long, conflicts_with = "out")]
    timestamped: bool,
    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

impl RecordArgs {
    fn output_path(&self) -> PathBuf {
        match (&self.out, self.timestamped) {
            (Some(out), _) => out.clone(),
            (None, true) => {
                timestamped_output_path(PathBuf::from(constants::DEFAULT_OUTPUT_DIR).as_path(), Local::now())
            }
            (None, false) => default_output_path(),
        }
    }

    fn session_config(&self) -> RecordResult<SessionConfig> {
        let offset = ScreenPoint::new(
            self.cursor_offset_x.unwrap_or(constants::CURSOR_OFFSET_LEFT),
            self.cursor_offset_y.unwrap_or(constants::CURSOR_OFFSET_TOP),
        );
        let mut builder = SessionConfig::builder(self.geometry.region(), self.output_path())
            .border(self.geometry.insets())
            .include_cursor(!self.no_cursor)
            .cursor_offset(offset)
            .max_makeup_frames(self.max_makeup);

        if let Some(ms) = self.interval {
            builder = builder.interval(Duration::from_millis(ms));
        }
        if let Some(secs) = self.duration {
            builder = builder.max_duration(Duration::from_secs(secs));
        }
        if let Some(ticks) = self.max_ticks {
            builder = builder.max_ticks(ticks);
        }
        if let Some(bitrate) = self.bitrate {
            builder = builder.bitrate(bitrate);
        }
        builder.build()
    }
}

/// Prints lifecycle notifications to the terminal.
///
/// With `--json` the status text goes to stderr so stdout carries only the
/// JSON summary.
struct TerminalObserver {
    json: bool,
}

impl SessionObserver for TerminalObserver {
    fn on_session_started(&self) {
        eprintln!("Recording... press Ctrl-C to stop");
    }

    fn on_session_complete(&self, summary_text: &str) {
        if self.json {
            eprintln!("{}", summary_text);
        } else {
            println!("{}", summary_text);
        }
    }
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("regioncast_cli=info,regioncast_core=info"));
    let subscriber = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    match cli.command {
        Commands::Record(args) => record(args).await?,
        Commands::Monitors { json } => monitors(json)?,
        Commands::Probe(args) => {
            let within_budget = tokio::task::spawn_blocking(move || probe::run(&args)).await??;
            if !within_budget {
                process::exit(1);
            }
        }
    }

    Ok(())
}

async fn record(args: RecordArgs) -> Result<()> {
    let config = args.session_config()?;
    debug!(config = %serde_json::to_string(&config)?, "Session config");

    let backend = create_default_backend()?;
    info!(?backend, "Capture backend");

    // The CLI has no window of its own; the region stays where it started.
    let position = config.region.position();
    let (requester, dispatcher) = position_channel(constants::position_timeout());

    let recorder = Recorder::new(Arc::new(FfmpegEncoder::from_env()))
        .with_observer(Arc::new(TerminalObserver { json: args.json }));

    let output_path = config.output_path.clone();
    let handle = match recorder.start(config, backend.into_inputs(Box::new(requester))) {
        Ok(handle) => handle,
        // Already reported through the observer.
        Err(RecordError::EncoderOpenFailed { .. }) => process::exit(1),
        Err(e) => return Err(e.into()),
    };

    let host = tokio::task::spawn_blocking(move || dispatcher.serve_until(|| Some(position), || false));

    let stop = handle.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Stop requested, finishing the current tick");
            stop.request_stop();
        }
    });

    let result = tokio::task::spawn_blocking(move || handle.join()).await?;
    let served = host.await?;
    debug!(served, "Position requests answered");

    let Ok(summary) = result else {
        process::exit(1);
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Saved to {}", output_path.display());
    }
    Ok(())
}

fn monitors(json: bool) -> Result<()> {
    let displays = list_displays()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&displays)?);
        return Ok(());
    }

    println!("Found {} displays:\n", displays.len());
    for display in &displays {
        println!("  {}", display);
    }
    Ok(())
}
