use thiserror::Error;

use crate::registry::EntryKind;

/// Errors surfaced by the runtime core. Every fallible operation hands one of
/// these back to the caller; there is no panic-based control flow.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("no {kind} entry with id {entry_id}")]
    NotFound { kind: EntryKind, entry_id: u32 },

    #[error("failed to load media '{locator}': {reason}")]
    MediaLoad { locator: String, reason: String },

    #[error("off-screen surface {width}x{height} could not be allocated: {reason}")]
    SurfaceAlloc {
        width: u32,
        height: u32,
        reason: String,
    },

    #[error("a transition session is already in flight for this scene")]
    TransitionInFlight,
}

pub type Result<T> = std::result::Result<T, CoreError>;
