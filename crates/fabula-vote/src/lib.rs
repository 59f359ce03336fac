//! Quorum voting for shared Fabula sessions.
//!
//! When a group plays one story together, each fragment with two or more
//! live choices becomes a poll: members vote, and the first choice to
//! collect the story's vote threshold wins and drives navigation for
//! everyone. Poll state is persisted on every step, so a restarted
//! process resumes mid-poll.

/// Opening polls and folding votes into navigation decisions.
pub mod coordinator;
/// Error types for shared-session voting.
pub mod error;
/// Persisted state of one open poll.
pub mod poll;

/// Re-export coordinator types.
pub use coordinator::{MemoryPollStore, PollStore, VoteOutcome, VotingCoordinator};
/// Re-export error types.
pub use error::{VoteError, VoteResult};
/// Re-export poll state types.
pub use poll::{PollChoice, PollDetails, PollState};
