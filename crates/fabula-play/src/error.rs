//! Error types for the playback engine.

use thiserror::Error;

use fabula_core::{CoreError, FragmentId, StoryId};

/// Result type for playback operations.
pub type PlayResult<T> = Result<T, PlayError>;

/// Errors that can occur during playback.
#[derive(Debug, Error)]
pub enum PlayError {
    /// A graph-model error bubbled up from the core.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The story does not exist in the store.
    #[error("story not found: \"{0}\"")]
    StoryNotFound(StoryId),

    /// A choice targets a fragment that does not exist, and the story does
    /// not auto-generate.
    #[error("dead link: fragment \"{0}\" does not exist")]
    DeadLink(FragmentId),

    /// A selected choice index is out of range or not currently visible.
    #[error("choice {0} is not available")]
    ChoiceUnavailable(usize),

    /// Transient persistence failure; in-memory state is unchanged and the
    /// caller may retry.
    #[error("persistence failure: {0}")]
    Store(String),

    /// The generation service failed or returned malformed output; the
    /// graph is unchanged.
    #[error("generation failure: {0}")]
    Generation(String),
}
