//! Test utilities for regioncast integration tests
//!
//! This crate provides shared helpers for integration testing across the
//! regioncast workspace. Everything here runs without a display server or an
//! encoder binary unless stated otherwise.
//!
//! # Usage
//!
//! Add to your crate's dev-dependencies:
//!
//! ```toml
//! [dev-dependencies]
//! regioncast-test-utils = { path = "../regioncast-test-utils" }
//! ```
//!
//! # Modules
//!
//! - [`session`]: Scripted sessions on a manual clock, plus an observer that
//!   records every notification
//! - [`frames`]: Frame inspection and saving frames for visual checks
//! - [`env`]: Display-server detection for tests that need a live desktop
//! - [`timing`]: Wall-clock timing for tests against live hardware
//!
//! # Examples
//!
//! ## Scripted Session
//!
//! ```
//! use regioncast_test_utils::session::ScriptedSession;
//!
//! let run = ScriptedSession::new(64, 48).tick_costs(vec![33, 100, 33]).max_ticks(3).run();
//! let summary = run.summary.unwrap();
//!
//! assert_eq!(summary.stats.max_deviation, 67);
//! assert_eq!(run.frames.frame_count() as u64, summary.stats.frames_written);
//! ```
//!
//! ## Live Timing
//!
//! ```ignore
//! use regioncast_test_utils::timing::{measure_sync, assert_duration_below};
//! use std::time::Duration;
//!
//! let (result, elapsed) = measure_sync("sample", || sampler.sample(origin, &mut surface));
//! assert_duration_below(elapsed, Duration::from_millis(33), "sample");
//! ```

pub mod env;
pub mod frames;
pub mod session;
pub mod timing;
