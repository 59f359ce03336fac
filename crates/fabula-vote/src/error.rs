//! Error types for shared-session voting.

use thiserror::Error;

use fabula_core::{CoreError, PlayerId, SessionId};

/// Result type for voting operations.
pub type VoteResult<T> = Result<T, VoteError>;

/// Errors that can occur while opening or resolving a poll.
#[derive(Debug, Error)]
pub enum VoteError {
    /// A graph-model error bubbled up from the core.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// No poll is open in this session.
    #[error("no open poll in session {0}")]
    NoPoll(SessionId),

    /// The fragment has fewer than two votable choices, so there is
    /// nothing to poll about.
    #[error("fragment has fewer than two votable choices")]
    NotEnoughChoices,

    /// The voter already cast a vote in this poll.
    #[error("player {0} already voted")]
    AlreadyVoted(PlayerId),

    /// The voted choice index does not exist in the poll.
    #[error("choice {0} is not part of the poll")]
    InvalidChoice(usize),

    /// Transient persistence failure; in-memory state is unchanged and the
    /// caller may retry.
    #[error("persistence failure: {0}")]
    Store(String),
}
