//! Opening polls and folding votes into navigation decisions.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::Mutex;
use tracing::{debug, info};

use fabula_core::{AttributeMap, FragmentId, PlayerId, SessionId, Story};
use fabula_script::{apply_on_click, evaluate_for_display};

use crate::error::{VoteError, VoteResult};
use crate::poll::{PollChoice, PollDetails, PollState};

/// Poll persistence keyed by session.
#[async_trait]
pub trait PollStore: Send + Sync {
    /// Load the open poll of a session, if any.
    async fn load_poll(&self, session: SessionId) -> VoteResult<Option<PollState>>;

    /// Persist the open poll of a session.
    async fn save_poll(&self, session: SessionId, poll: &PollState) -> VoteResult<()>;

    /// Remove the open poll of a session.
    async fn clear_poll(&self, session: SessionId) -> VoteResult<()>;
}

/// In-memory poll store used by tests and the CLI.
#[derive(Default)]
pub struct MemoryPollStore {
    polls: Mutex<HashMap<SessionId, PollState>>,
}

impl MemoryPollStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PollStore for MemoryPollStore {
    async fn load_poll(&self, session: SessionId) -> VoteResult<Option<PollState>> {
        Ok(self.polls.lock().await.get(&session).cloned())
    }

    async fn save_poll(&self, session: SessionId, poll: &PollState) -> VoteResult<()> {
        self.polls.lock().await.insert(session, poll.clone());
        Ok(())
    }

    async fn clear_poll(&self, session: SessionId) -> VoteResult<()> {
        self.polls.lock().await.remove(&session);
        Ok(())
    }
}

/// What a cast vote led to.
#[derive(Debug, Clone, PartialEq)]
pub enum VoteOutcome {
    /// The vote was recorded; no choice reached the threshold yet.
    Recorded {
        /// Vote counts per choice, in choice order.
        tally: Vec<usize>,
    },
    /// A choice reached the threshold and its effects passed.
    Resolved {
        /// The winning choice index.
        index: usize,
        /// The fragment to navigate to.
        target: FragmentId,
        /// The group's attributes after the winning effects applied.
        attrs: AttributeMap,
        /// Notification lines from the applied effects.
        notifications: Vec<String>,
    },
    /// A choice reached the threshold but a check in its effects failed:
    /// the poll is closed and the group stays where it was.
    Rejected {
        /// Notification lines, empty when the failing check was hidden.
        notifications: Vec<String>,
    },
}

/// Tallies group votes and resolves them against the evaluator contract.
///
/// The store copy of the poll is authoritative: every access reloads,
/// every mutation persists before the outcome is reported, so a restarted
/// process picks up mid-poll.
pub struct VotingCoordinator {
    store: Arc<dyn PollStore>,
    rng: StdRng,
}

impl VotingCoordinator {
    /// Create a coordinator over a poll store.
    pub fn new(store: Arc<dyn PollStore>) -> Self {
        Self {
            store,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Use a fixed RNG seed, for reproducible draws.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Open a poll on a fragment for a shared session.
    ///
    /// Votable options are the currently visible, unlocked choices; fewer
    /// than two of them is [`VoteError::NotEnoughChoices`]. Replaces any
    /// earlier poll of the session.
    pub async fn open_poll(
        &self,
        session: SessionId,
        story: &Story,
        fragment_id: &FragmentId,
        attrs: AttributeMap,
    ) -> VoteResult<PollState> {
        let fragment = story.fragment(fragment_id)?;
        let choices: Vec<PollChoice> = fragment
            .choices
            .iter()
            .enumerate()
            .filter(|(_, choice)| {
                let vis = evaluate_for_display(&choice.effects, &attrs);
                vis.visible && !vis.is_locked()
            })
            .map(|(index, choice)| PollChoice {
                index,
                label: choice.text.clone(),
                target: choice.target.clone(),
                effects: choice.effects.clone(),
            })
            .collect();
        if choices.len() < 2 {
            return Err(VoteError::NotEnoughChoices);
        }

        let poll = PollState {
            story_id: story.meta.id.clone(),
            target_user: story.meta.owner,
            fragment_id: fragment_id.clone(),
            threshold: story.meta.vote_threshold,
            details: PollDetails {
                choices,
                ..Default::default()
            },
            attrs,
            opened_at: Utc::now(),
        };
        self.store.save_poll(session, &poll).await?;
        info!(%session, fragment = %fragment_id, options = poll.details.choices.len(), "poll opened");
        Ok(poll)
    }

    /// Record one vote and resolve the poll if a choice reached the
    /// threshold.
    pub async fn cast_vote(
        &mut self,
        session: SessionId,
        voter: PlayerId,
        index: usize,
    ) -> VoteResult<VoteOutcome> {
        let mut poll = self
            .store
            .load_poll(session)
            .await?
            .ok_or(VoteError::NoPoll(session))?;
        poll.reconcile();
        poll.record_vote(voter, index)?;
        self.store.save_poll(session, &poll).await?;
        debug!(%session, voter = %voter, index, "vote recorded");

        let Some(winner) = poll.winner() else {
            return Ok(VoteOutcome::Recorded { tally: poll.tally() });
        };

        let choice = &poll.details.choices[winner];
        let mut attrs = poll.attrs.clone();
        let outcome = apply_on_click(&choice.effects, &mut attrs, &mut self.rng);
        self.store.clear_poll(session).await?;

        if outcome.may_proceed {
            info!(%session, index = winner, target = %choice.target, "poll resolved");
            Ok(VoteOutcome::Resolved {
                index: winner,
                target: choice.target.clone(),
                attrs,
                notifications: outcome.notifications,
            })
        } else {
            info!(%session, index = winner, "winning choice rejected by a check");
            Ok(VoteOutcome::Rejected {
                notifications: outcome.notifications,
            })
        }
    }

    /// The session's open poll, reconciled, if any.
    pub async fn current_poll(&self, session: SessionId) -> VoteResult<Option<PollState>> {
        let mut poll = self.store.load_poll(session).await?;
        if let Some(poll) = poll.as_mut() {
            poll.reconcile();
        }
        Ok(poll)
    }

    /// Drop the session's open poll without resolving it.
    pub async fn cancel_poll(&self, session: SessionId) -> VoteResult<()> {
        self.store.clear_poll(session).await
    }
}
