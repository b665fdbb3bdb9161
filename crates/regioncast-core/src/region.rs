//! Per-tick region tracking.

use tracing::{debug, warn};

use crate::capture::PositionSource;
use crate::error::{RecordError, RecordResult};
use crate::model::{BorderInsets, CaptureRegion, ScreenPoint};

/// Holds the capture rectangle and refreshes its position once per tick.
///
/// The size never changes after construction. A position source that cannot
/// answer leaves the previous position in place.
pub struct RegionTracker {
    region: CaptureRegion,
    border: BorderInsets,
    source: Box<dyn PositionSource>,
    misses: u64,
}

impl RegionTracker {
    /// Creates a tracker starting at `region`
    pub fn new(region: CaptureRegion, border: BorderInsets, source: Box<dyn PositionSource>) -> Self {
        Self {
            region,
            border,
            source,
            misses: 0,
        }
    }

    /// Current region
    pub fn region(&self) -> &CaptureRegion {
        &self.region
    }

    /// Absolute coordinate of the first client pixel to sample
    pub fn sample_origin(&self) -> ScreenPoint {
        self.region.sample_origin(&self.border)
    }

    /// Number of refreshes that kept the previous position
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Asks the host for its position and moves the region.
    ///
    /// # Errors
    ///
    /// [`RecordError::PositionUnavailable`] if the host did not answer. The
    /// region keeps its previous position; the error is never fatal.
    pub fn refresh(&mut self) -> RecordResult<ScreenPoint> {
        match self.source.current_position() {
            Some(position) => {
                if position != self.region.position() {
                    debug!(
                        from_x = self.region.left,
                        from_y = self.region.top,
                        to_x = position.x,
                        to_y = position.y,
                        "Region moved"
                    );
                }
                self.region.move_to(position);
                Ok(position)
            }
            None => {
                self.misses += 1;
                let error = RecordError::PositionUnavailable { misses: self.misses };
                if self.misses.is_power_of_two() {
                    warn!(error = %error, "Keeping previous region position");
                }
                Err(error)
            }
        }
    }
}
