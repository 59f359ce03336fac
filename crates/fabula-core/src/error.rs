use crate::id::{FragmentId, PlayerId};

/// Alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur when manipulating a story graph.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A fragment name failed authoring validation.
    #[error("invalid fragment id \"{name}\": {reason}")]
    InvalidFragmentId {
        /// The offending name.
        name: String,
        /// Why the name was rejected.
        reason: String,
    },

    /// A fragment with this id already exists.
    #[error("fragment already exists: \"{0}\"")]
    DuplicateFragment(FragmentId),

    /// The requested fragment does not exist in the story.
    #[error("fragment not found: \"{0}\"")]
    FragmentNotFound(FragmentId),

    /// A choice index is out of range for its fragment.
    #[error("choice {index} not found on fragment \"{fragment}\"")]
    ChoiceNotFound {
        /// The fragment the choice was looked up on.
        fragment: FragmentId,
        /// The out-of-range index.
        index: usize,
    },

    /// The protected root fragment cannot be renamed or deleted.
    #[error("the root fragment cannot be renamed or deleted")]
    ProtectedRoot,

    /// The player is neither the owner nor a co-editor of the story.
    #[error("player {0} may not edit this story")]
    PermissionDenied(PlayerId),

    /// Fragment text exceeds the platform message ceiling.
    #[error("fragment text exceeds {limit} characters")]
    TextTooLong {
        /// The maximum allowed length.
        limit: usize,
    },

    /// A generic validation error with a descriptive message.
    #[error("validation error: {0}")]
    Validation(String),
}
