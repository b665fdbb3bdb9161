//! Bundle of the screen-side collaborators for one session
//!
//! A session needs a sampler and, optionally, a cursor provider. Which
//! implementations are available depends on the platform, so they travel
//! together as a [`CaptureBackend`] built by
//! [`create_default_backend`](super::create_default_backend) or, in tests,
//! from mocks.

use super::{CursorProvider, FrameSampler, PositionSource};
use crate::pacing::PacingInputs;
use crate::util::detect::CursorBackend;

/// Sampler plus optional cursor provider.
pub struct CaptureBackend {
    /// Screen sampling capability. Present on every backend.
    pub sampler: Box<dyn FrameSampler>,

    /// Cursor capability.
    ///
    /// `None` where no cursor source is supported or it failed to
    /// initialize; frames are then recorded without a cursor.
    pub cursor: Option<Box<dyn CursorProvider>>,

    /// Which cursor provider was selected
    pub cursor_backend: CursorBackend,

    /// Backend name for diagnostics.
    pub name: &'static str,
}

impl CaptureBackend {
    /// Creates a backend from explicit parts
    pub fn new(
        sampler: Box<dyn FrameSampler>,
        cursor: Option<Box<dyn CursorProvider>>,
        cursor_backend: CursorBackend,
        name: &'static str,
    ) -> Self {
        Self {
            sampler,
            cursor,
            cursor_backend,
            name,
        }
    }

    /// Whether the cursor can be composited
    pub fn has_cursor(&self) -> bool {
        self.cursor.is_some()
    }

    /// Pairs the collaborators with a host position source for the pacing
    /// loop.
    pub fn into_inputs(self, positions: Box<dyn PositionSource>) -> PacingInputs {
        PacingInputs {
            sampler: self.sampler,
            cursor: self.cursor,
            positions,
        }
    }
}

impl std::fmt::Debug for CaptureBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureBackend")
            .field("name", &self.name)
            .field("cursor_backend", &self.cursor_backend)
            .field("has_cursor", &self.has_cursor())
            .finish()
    }
}
