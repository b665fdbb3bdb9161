//! Synchronous position round-trip between the capture thread and the host.
//!
//! The host owns its window state and is not assumed to be free-threaded, so
//! the capture thread never reads it directly. Instead it posts a one-shot
//! request and blocks (up to a timeout) until the host thread answers from
//! its own event loop.
//!
//! ```
//! use std::time::Duration;
//!
//! use regioncast_core::capture::PositionSource;
//! use regioncast_core::host::position_channel;
//! use regioncast_core::model::ScreenPoint;
//!
//! let (mut requester, dispatcher) = position_channel(Duration::from_millis(500));
//!
//! let host = std::thread::spawn(move || {
//!     dispatcher.serve_until(|| Some(ScreenPoint::new(40, 80)), || false);
//! });
//!
//! assert_eq!(requester.current_position(), Some(ScreenPoint::new(40, 80)));
//! drop(requester);
//! host.join().unwrap();
//! ```

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, bounded};
use tracing::trace;

use crate::capture::PositionSource;
use crate::model::ScreenPoint;

type Reply = Sender<Option<ScreenPoint>>;

/// How often a blocking dispatcher re-checks its exit condition.
const DISPATCH_POLL: Duration = Duration::from_millis(50);

/// Longest round-trip budget accepted. Larger values are clamped.
pub const MAX_POSITION_TIMEOUT: Duration = Duration::from_secs(60);

/// Creates a connected requester/dispatcher pair.
///
/// `timeout` bounds each round-trip as seen by the capture thread, up to
/// [`MAX_POSITION_TIMEOUT`].
pub fn position_channel(timeout: Duration) -> (PositionRequester, PositionDispatcher) {
    let (requests, incoming) = bounded(1);
    let timeout = timeout.min(MAX_POSITION_TIMEOUT);
    (
        PositionRequester { requests, timeout },
        PositionDispatcher { incoming },
    )
}

/// Capture-side end. Implements [`PositionSource`].
#[derive(Debug, Clone)]
pub struct PositionRequester {
    requests: Sender<Reply>,
    timeout:  Duration,
}

impl PositionSource for PositionRequester {
    fn current_position(&mut self) -> Option<ScreenPoint> {
        let now = Instant::now();
        let deadline = now.checked_add(self.timeout).unwrap_or(now);
        let (reply, answer) = bounded(1);

        if self.requests.send_deadline(reply, deadline).is_err() {
            trace!("Position request not accepted before deadline");
            return None;
        }

        match answer.recv_deadline(deadline) {
            Ok(position) => position,
            Err(_) => {
                trace!("Position reply not received before deadline");
                None
            }
        }
    }
}

/// Host-side end. Answers requests on whichever thread calls it.
#[derive(Debug)]
pub struct PositionDispatcher {
    incoming: Receiver<Reply>,
}

impl PositionDispatcher {
    /// Answers every request already queued without blocking.
    ///
    /// Intended for a host event loop that calls it once per iteration.
    /// Returns the number of requests answered.
    pub fn serve_pending(&self, mut answer: impl FnMut() -> Option<ScreenPoint>) -> usize {
        let mut served = 0;
        loop {
            match self.incoming.try_recv() {
                Ok(reply) => {
                    // The requester may have timed out and gone away.
                    let _ = reply.send(answer());
                    served += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return served,
            }
        }
    }

    /// Answers requests until the capture side disconnects or `done`
    /// returns true. Returns the number of requests answered.
    pub fn serve_until(
        &self,
        mut answer: impl FnMut() -> Option<ScreenPoint>,
        done: impl Fn() -> bool,
    ) -> usize {
        let mut served = 0;
        while !done() {
            match self.incoming.recv_timeout(DISPATCH_POLL) {
                Ok(reply) => {
                    let _ = reply.send(answer());
                    served += 1;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        served
    }

    /// Whether the capture side has gone away
    pub fn is_disconnected(&self) -> bool {
        self.incoming.is_empty() && self.incoming.sender_count() == 0
    }
}
