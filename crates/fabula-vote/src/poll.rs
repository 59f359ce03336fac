//! Persisted state of one open poll.
//!
//! A poll is fully self-describing: everything needed to resume tallying
//! after a process restart is in [`PollState`], so a coordinator can be
//! rebuilt from storage alone. The serialized form follows the stored
//! poll-document layout (`current_fragment_id`, `required_votes_to_win`,
//! nested `poll_details`, `user_attributes`); vote maps use string keys
//! (some backends cannot store integer map keys), and deserialization also
//! accepts the older dense-list vote shape.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fabula_core::{AttributeMap, Effect, FragmentId, PlayerId, StoryId};

use crate::error::{VoteError, VoteResult};

/// One votable option, denormalized from the fragment's choice list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollChoice {
    /// Index of this option in the fragment's choice list.
    #[serde(default)]
    pub index: usize,
    /// Display label.
    pub label: String,
    /// Where the choice leads.
    pub target: FragmentId,
    /// Effects applied when this choice wins.
    #[serde(default)]
    pub effects: Vec<Effect>,
}

/// The `poll_details` sub-document: options and tallies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PollDetails {
    /// The votable options, in choice order.
    #[serde(rename = "choices_data")]
    pub choices: Vec<PollChoice>,
    /// Voters per option index.
    #[serde(with = "votes_serde", default)]
    pub votes: BTreeMap<usize, BTreeSet<PlayerId>>,
    /// Everyone who has voted, for the one-vote-per-player rule.
    #[serde(default)]
    pub voted_users: BTreeSet<PlayerId>,
}

/// The persisted state of one open poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollState {
    /// The story being played.
    pub story_id: StoryId,
    /// The player whose story and progress the shared session drives.
    pub target_user: PlayerId,
    /// The fragment the poll was opened on.
    #[serde(rename = "current_fragment_id")]
    pub fragment_id: FragmentId,
    /// Votes required on a single option to resolve.
    #[serde(rename = "required_votes_to_win")]
    pub threshold: u32,
    /// Options and tallies.
    #[serde(rename = "poll_details")]
    pub details: PollDetails,
    /// The group's attribute map at poll-open time.
    #[serde(rename = "user_attributes", default)]
    pub attrs: AttributeMap,
    /// When the poll was opened.
    #[serde(default = "Utc::now")]
    pub opened_at: DateTime<Utc>,
}

impl PollState {
    /// Record one vote.
    ///
    /// Rejects an out-of-range index and a repeat voter; state is
    /// unchanged on error.
    pub fn record_vote(&mut self, voter: PlayerId, index: usize) -> VoteResult<()> {
        if index >= self.details.choices.len() {
            return Err(VoteError::InvalidChoice(index));
        }
        if self.details.voted_users.contains(&voter) {
            return Err(VoteError::AlreadyVoted(voter));
        }
        self.details.votes.entry(index).or_default().insert(voter);
        self.details.voted_users.insert(voter);
        Ok(())
    }

    /// Vote counts per option, in option order.
    pub fn tally(&self) -> Vec<usize> {
        (0..self.details.choices.len())
            .map(|i| self.details.votes.get(&i).map_or(0, BTreeSet::len))
            .collect()
    }

    /// The first option index whose votes reached the threshold.
    pub fn winner(&self) -> Option<usize> {
        let threshold = self.threshold as usize;
        (0..self.details.choices.len())
            .find(|i| self.details.votes.get(i).is_some_and(|v| v.len() >= threshold))
    }

    /// Repair state loaded from storage.
    ///
    /// Drops votes on option indexes that no longer exist and
    /// `voted_users` entries with no matching vote.
    pub fn reconcile(&mut self) {
        let choices = self.details.choices.len();
        self.details
            .votes
            .retain(|index, voters| *index < choices && !voters.is_empty());
        let votes = &self.details.votes;
        self.details
            .voted_users
            .retain(|user| votes.values().any(|voters| voters.contains(user)));
    }
}

mod votes_serde {
    use std::collections::{BTreeMap, BTreeSet};

    use serde::de::{Deserializer, Error as _};
    use serde::ser::Serializer;
    use serde::{Deserialize, Serialize};

    use fabula_core::PlayerId;

    pub fn serialize<S: Serializer>(
        votes: &BTreeMap<usize, BTreeSet<PlayerId>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let keyed: BTreeMap<String, &BTreeSet<PlayerId>> = votes
            .iter()
            .map(|(index, voters)| (index.to_string(), voters))
            .collect();
        keyed.serialize(serializer)
    }

    /// Stored shapes seen in the wild: a string-keyed sparse map, or the
    /// older dense list indexed by position.
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Sparse(BTreeMap<String, BTreeSet<PlayerId>>),
        Dense(Vec<BTreeSet<PlayerId>>),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<usize, BTreeSet<PlayerId>>, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Sparse(map) => map
                .into_iter()
                .map(|(key, voters)| {
                    key.parse::<usize>()
                        .map(|index| (index, voters))
                        .map_err(|_| D::Error::custom(format!("non-numeric vote key \"{key}\"")))
                })
                .collect(),
            Repr::Dense(list) => Ok(list
                .into_iter()
                .enumerate()
                .filter(|(_, voters)| !voters.is_empty())
                .collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll() -> PollState {
        PollState {
            story_id: StoryId::new("demo"),
            target_user: PlayerId(1),
            fragment_id: FragmentId::root(),
            threshold: 2,
            details: PollDetails {
                choices: vec![
                    PollChoice {
                        index: 0,
                        label: "Left".to_string(),
                        target: FragmentId::new("left").unwrap(),
                        effects: vec![],
                    },
                    PollChoice {
                        index: 1,
                        label: "Right".to_string(),
                        target: FragmentId::new("right").unwrap(),
                        effects: vec![],
                    },
                ],
                votes: BTreeMap::new(),
                voted_users: BTreeSet::new(),
            },
            attrs: AttributeMap::new(),
            opened_at: Utc::now(),
        }
    }

    #[test]
    fn one_vote_per_player() {
        let mut poll = poll();
        poll.record_vote(PlayerId(10), 0).unwrap();
        let err = poll.record_vote(PlayerId(10), 1).unwrap_err();
        assert!(matches!(err, VoteError::AlreadyVoted(PlayerId(10))));
        assert_eq!(poll.tally(), vec![1, 0]);
    }

    #[test]
    fn out_of_range_vote_is_rejected() {
        let mut poll = poll();
        assert!(matches!(
            poll.record_vote(PlayerId(10), 5),
            Err(VoteError::InvalidChoice(5))
        ));
        assert!(poll.details.voted_users.is_empty());
    }

    #[test]
    fn winner_requires_threshold_on_one_choice() {
        let mut poll = poll();
        poll.threshold = 3;
        poll.record_vote(PlayerId(1), 0).unwrap();
        poll.record_vote(PlayerId(2), 0).unwrap();
        poll.record_vote(PlayerId(3), 1).unwrap();
        // Three votes total, but no single choice has three.
        assert_eq!(poll.winner(), None);

        poll.record_vote(PlayerId(4), 0).unwrap();
        assert_eq!(poll.winner(), Some(0));
    }

    #[test]
    fn serialized_form_uses_document_keys() {
        let mut poll = poll();
        poll.record_vote(PlayerId(10), 1).unwrap();

        let json = serde_json::to_value(&poll).unwrap();
        assert!(json.get("target_user").is_some());
        assert!(json.get("current_fragment_id").is_some());
        assert!(json.get("required_votes_to_win").is_some());
        assert!(json["user_attributes"].is_object());
        assert!(json["poll_details"]["choices_data"].is_array());
        // Vote keys are strings, not numbers.
        assert!(json["poll_details"]["votes"].get("1").is_some());
        assert!(json["poll_details"]["votes"].get(1).is_none());

        let back: PollState = serde_json::from_value(json).unwrap();
        assert_eq!(back, poll);
    }

    #[test]
    fn rehydrates_a_stored_poll_document() {
        let raw = r#"{
            "story_id": "demo",
            "target_user": 1,
            "current_fragment_id": "main_1",
            "required_votes_to_win": 2,
            "poll_details": {
                "choices_data": [
                    {"label": "Left", "target": "left"},
                    {"index": 1, "label": "Right", "target": "right"}
                ],
                "votes": {"1": [10]},
                "voted_users": [10]
            },
            "user_attributes": {"hp": 3}
        }"#;
        let poll: PollState = serde_json::from_str(raw).unwrap();
        assert_eq!(poll.target_user, PlayerId(1));
        assert!(poll.fragment_id.is_root());
        assert_eq!(poll.tally(), vec![0, 1]);
        assert_eq!(poll.attrs.get("hp"), Some(3));
    }

    #[test]
    fn accepts_legacy_dense_vote_list() {
        let raw = r#"{
            "story_id": "demo",
            "target_user": 1,
            "current_fragment_id": "main_1",
            "required_votes_to_win": 2,
            "poll_details": {
                "choices_data": [
                    {"label": "Left", "target": "left"},
                    {"label": "Right", "target": "right"}
                ],
                "votes": [[], [10, 11]],
                "voted_users": [10, 11]
            }
        }"#;
        let poll: PollState = serde_json::from_str(raw).unwrap();
        assert_eq!(poll.tally(), vec![0, 2]);
        assert_eq!(poll.winner(), Some(1));
    }

    #[test]
    fn reconcile_drops_orphans() {
        let mut poll = poll();
        poll.record_vote(PlayerId(10), 1).unwrap();
        // Simulate a stored poll whose fragment lost a choice and whose
        // voted set has an entry without a vote.
        poll.details.votes.entry(9).or_default().insert(PlayerId(11));
        poll.details.voted_users.insert(PlayerId(12));

        poll.reconcile();
        assert_eq!(poll.tally(), vec![0, 1]);
        assert_eq!(
            poll.details.voted_users.iter().copied().collect::<Vec<_>>(),
            vec![PlayerId(10)]
        );
    }
}
