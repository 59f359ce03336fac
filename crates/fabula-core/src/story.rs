//! The story graph that owns all fragments.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::fragment::{Choice, Fragment};
use crate::id::{FragmentId, PlayerId, StoryId};

/// Maximum fragment text length, in characters (platform message ceiling).
pub const MAX_FRAGMENT_TEXT_LEN: usize = 4096;

/// Metadata about the story itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryMeta {
    /// The story id within the owner's library.
    pub id: StoryId,
    /// Human-readable title.
    pub title: String,
    /// The owning player.
    pub owner: PlayerId,
    /// Players allowed to edit alongside the owner.
    #[serde(default)]
    pub co_editors: Vec<PlayerId>,
    /// Whether playback reaching an absent fragment invokes the generation
    /// service instead of surfacing a dead link.
    #[serde(default)]
    pub auto_generate: bool,
    /// Votes required to resolve a shared-session poll.
    #[serde(default = "default_vote_threshold")]
    pub vote_threshold: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

fn default_vote_threshold() -> u32 {
    2
}

impl StoryMeta {
    /// Create metadata for a new story.
    pub fn new(id: StoryId, title: impl Into<String>, owner: PlayerId) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: title.into(),
            owner,
            co_editors: Vec::new(),
            auto_generate: false,
            vote_threshold: default_vote_threshold(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A story: metadata plus the fragment graph.
///
/// Fragments live in an id-indexed arena; choice targets are plain ids
/// resolved lazily, so forward references and cycles are fine. Every story
/// has exactly one protected root fragment (`main_1`) that can be neither
/// renamed nor deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
    /// Story metadata.
    pub meta: StoryMeta,
    fragments: HashMap<FragmentId, Fragment>,
}

impl Story {
    /// Create a new story seeded with an empty root fragment.
    pub fn new(meta: StoryMeta) -> Self {
        let root = FragmentId::root();
        let mut fragments = HashMap::new();
        fragments.insert(root.clone(), Fragment::new(root, String::new()));
        Self { meta, fragments }
    }

    /// Reassemble a story from persisted parts, seeding the root fragment
    /// if the document lacks one.
    pub fn from_parts(meta: StoryMeta, fragments: HashMap<FragmentId, Fragment>) -> Self {
        let mut story = Self { meta, fragments };
        let root = FragmentId::root();
        story
            .fragments
            .entry(root.clone())
            .or_insert_with(|| Fragment::new(root, String::new()));
        story
    }

    /// The protected root fragment.
    pub fn root(&self) -> &Fragment {
        // The constructor seeds the root and no operation removes it.
        self.fragments
            .get(&FragmentId::root())
            .unwrap_or_else(|| unreachable!("story invariant: root fragment always present"))
    }

    /// Get a fragment by id.
    pub fn get(&self, id: &FragmentId) -> Option<&Fragment> {
        self.fragments.get(id)
    }

    /// Get a fragment by id, or a not-found error.
    pub fn fragment(&self, id: &FragmentId) -> CoreResult<&Fragment> {
        self.fragments
            .get(id)
            .ok_or_else(|| CoreError::FragmentNotFound(id.clone()))
    }

    fn fragment_mut(&mut self, id: &FragmentId) -> CoreResult<&mut Fragment> {
        self.fragments
            .get_mut(id)
            .ok_or_else(|| CoreError::FragmentNotFound(id.clone()))
    }

    /// Whether a fragment with this id exists.
    pub fn contains(&self, id: &FragmentId) -> bool {
        self.fragments.contains_key(id)
    }

    /// Iterate over all fragments in arbitrary order.
    pub fn fragments(&self) -> impl Iterator<Item = &Fragment> {
        self.fragments.values()
    }

    /// Number of fragments.
    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    /// Whether a player may edit this story (owner or co-editor).
    pub fn can_edit(&self, player: PlayerId) -> bool {
        self.meta.owner == player || self.meta.co_editors.contains(&player)
    }

    /// Refuse the operation unless the player may edit this story.
    pub fn require_edit(&self, player: PlayerId) -> CoreResult<()> {
        if self.can_edit(player) {
            Ok(())
        } else {
            Err(CoreError::PermissionDenied(player))
        }
    }

    fn touch(&mut self) {
        self.meta.updated_at = Utc::now();
    }

    // -----------------------------------------------------------------------
    // Fragment operations
    // -----------------------------------------------------------------------

    /// Add a fragment. The id must be unused.
    pub fn add_fragment(&mut self, fragment: Fragment) -> CoreResult<()> {
        if self.fragments.contains_key(&fragment.id) {
            return Err(CoreError::DuplicateFragment(fragment.id.clone()));
        }
        self.fragments.insert(fragment.id.clone(), fragment);
        self.touch();
        Ok(())
    }

    /// Replace a fragment's narrative text.
    pub fn set_text(&mut self, id: &FragmentId, text: impl Into<String>) -> CoreResult<()> {
        let text = text.into();
        let text = text.trim().to_string();
        if text.chars().count() > MAX_FRAGMENT_TEXT_LEN {
            return Err(CoreError::TextTooLong {
                limit: MAX_FRAGMENT_TEXT_LEN,
            });
        }
        self.fragment_mut(id)?.text = text;
        self.touch();
        Ok(())
    }

    /// Rename a fragment and retarget every choice that points at it.
    ///
    /// The root fragment cannot be renamed, and the new name must be unused.
    pub fn rename_fragment(&mut self, old: &FragmentId, new: FragmentId) -> CoreResult<()> {
        if old.is_root() {
            return Err(CoreError::ProtectedRoot);
        }
        if !self.fragments.contains_key(old) {
            return Err(CoreError::FragmentNotFound(old.clone()));
        }
        if old != &new && self.fragments.contains_key(&new) {
            return Err(CoreError::DuplicateFragment(new));
        }

        let mut fragment = self
            .fragments
            .remove(old)
            .unwrap_or_else(|| unreachable!("presence checked above"));
        fragment.id = new.clone();
        self.fragments.insert(new.clone(), fragment);

        for fragment in self.fragments.values_mut() {
            for choice in &mut fragment.choices {
                if choice.target == *old {
                    choice.target = new.clone();
                }
            }
        }
        self.touch();
        Ok(())
    }

    /// Remove a set of fragments, then drop every surviving choice whose
    /// target died. Refuses to remove the root fragment.
    pub fn remove_fragments(&mut self, ids: &HashSet<FragmentId>) -> CoreResult<()> {
        if ids.iter().any(FragmentId::is_root) {
            return Err(CoreError::ProtectedRoot);
        }
        for id in ids {
            self.fragments.remove(id);
        }
        for fragment in self.fragments.values_mut() {
            fragment.choices.retain(|c| !ids.contains(&c.target));
        }
        self.touch();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Choice operations
    // -----------------------------------------------------------------------

    /// Append a choice to a fragment. The target may be a forward reference;
    /// this never creates the target fragment. Returns the new choice index.
    pub fn add_choice(&mut self, id: &FragmentId, choice: Choice) -> CoreResult<usize> {
        let fragment = self.fragment_mut(id)?;
        fragment.choices.push(choice);
        let index = fragment.choices.len() - 1;
        self.touch();
        Ok(index)
    }

    /// Apply a partial update to a choice.
    pub fn update_choice(
        &mut self,
        id: &FragmentId,
        index: usize,
        update: ChoiceUpdate,
    ) -> CoreResult<()> {
        let fragment_id = id.clone();
        let fragment = self.fragment_mut(id)?;
        let choice = fragment
            .choices
            .get_mut(index)
            .ok_or(CoreError::ChoiceNotFound {
                fragment: fragment_id,
                index,
            })?;
        if let Some(text) = update.text {
            choice.text = text;
        }
        if let Some(source) = update.source {
            choice.source = Some(source);
        }
        if let Some(target) = update.target {
            choice.target = target;
        }
        if let Some(effects) = update.effects {
            choice.effects = effects;
        }
        self.touch();
        Ok(())
    }

    /// Remove a choice by index, returning it.
    pub fn remove_choice(&mut self, id: &FragmentId, index: usize) -> CoreResult<Choice> {
        let fragment_id = id.clone();
        let fragment = self.fragment_mut(id)?;
        if index >= fragment.choices.len() {
            return Err(CoreError::ChoiceNotFound {
                fragment: fragment_id,
                index,
            });
        }
        let choice = fragment.choices.remove(index);
        self.touch();
        Ok(choice)
    }

    /// Move a choice from one position to another within its fragment.
    pub fn move_choice(&mut self, id: &FragmentId, from: usize, to: usize) -> CoreResult<()> {
        let fragment_id = id.clone();
        let fragment = self.fragment_mut(id)?;
        let len = fragment.choices.len();
        if from >= len || to >= len {
            return Err(CoreError::ChoiceNotFound {
                fragment: fragment_id,
                index: from.max(to),
            });
        }
        let choice = fragment.choices.remove(from);
        fragment.choices.insert(to, choice);
        self.touch();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Graph traversal
    // -----------------------------------------------------------------------

    /// Breadth-first closure over `choice.target` edges starting at `from`.
    ///
    /// Always includes `from` itself, follows only edges to fragments that
    /// exist, and terminates on cycles via a visited set.
    pub fn find_descendants(&self, from: &FragmentId) -> HashSet<FragmentId> {
        let mut visited: HashSet<FragmentId> = HashSet::new();
        let mut queue: VecDeque<FragmentId> = VecDeque::new();
        visited.insert(from.clone());
        queue.push_back(from.clone());

        while let Some(id) = queue.pop_front() {
            let Some(fragment) = self.fragments.get(&id) else {
                continue;
            };
            for choice in &fragment.choices {
                if self.fragments.contains_key(&choice.target)
                    && visited.insert(choice.target.clone())
                {
                    queue.push_back(choice.target.clone());
                }
            }
        }
        visited
    }

    /// Ids of fragments holding at least one choice targeting `target`.
    pub fn referencing_fragments(&self, target: &FragmentId) -> Vec<FragmentId> {
        let mut ids: Vec<FragmentId> = self
            .fragments
            .values()
            .filter(|f| f.choices.iter().any(|c| &c.target == target))
            .map(|f| f.id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Every `(fragment, choice index, target)` whose target does not exist.
    pub fn dangling_targets(&self) -> Vec<(FragmentId, usize, FragmentId)> {
        let mut dangling: Vec<(FragmentId, usize, FragmentId)> = self
            .fragments
            .values()
            .flat_map(|f| {
                f.choices.iter().enumerate().filter_map(|(i, c)| {
                    (!self.fragments.contains_key(&c.target))
                        .then(|| (f.id.clone(), i, c.target.clone()))
                })
            })
            .collect();
        dangling.sort();
        dangling
    }
}

/// A partial update applied to one choice, addressed by `(fragment, index)`.
#[derive(Debug, Clone, Default)]
pub struct ChoiceUpdate {
    /// New display text, if any.
    pub text: Option<String>,
    /// New raw authored text, if any.
    pub source: Option<String>,
    /// New target, if any.
    pub target: Option<FragmentId>,
    /// New effect list, if any.
    pub effects: Option<Vec<crate::effect::Effect>>,
}
