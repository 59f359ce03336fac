//! Persistence and generation ports.
//!
//! The engine never talks to a database directly; it goes through these
//! async traits. Failures are transient [`PlayError::Store`] /
//! [`PlayError::Generation`] values: the operation aborts, in-memory state
//! is unchanged, and retrying is the caller's responsibility.
//!
//! [`PlayError::Store`]: crate::error::PlayError::Store
//! [`PlayError::Generation`]: crate::error::PlayError::Generation

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use fabula_core::{AttributeMap, Fragment, FragmentId, PlayerId, Story, StoryId};

use crate::error::PlayResult;

/// Saved playback position for one (story, player) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// The fragment the player is currently on.
    pub fragment_id: FragmentId,
    /// The player's attribute map. Stored loosely by some backends, so
    /// deserialization is defensive (see [`AttributeMap`]).
    #[serde(default, rename = "current_effects")]
    pub attrs: AttributeMap,
}

impl Progress {
    /// Fresh progress at the story root with empty attributes.
    pub fn at_root() -> Self {
        Self {
            fragment_id: FragmentId::root(),
            attrs: AttributeMap::new(),
        }
    }
}

/// Story documents keyed by `(owner, story)`.
#[async_trait]
pub trait StoryStore: Send + Sync {
    /// Load a story document.
    async fn load_story(&self, owner: PlayerId, story: &StoryId) -> PlayResult<Option<Story>>;

    /// Persist a story document.
    async fn save_story(&self, owner: PlayerId, story: &Story) -> PlayResult<()>;
}

/// Playback progress keyed by `(story, player)`.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Load a player's progress in a story.
    async fn load_progress(
        &self,
        story: &StoryId,
        player: PlayerId,
    ) -> PlayResult<Option<Progress>>;

    /// Persist a player's progress.
    async fn save_progress(
        &self,
        story: &StoryId,
        player: PlayerId,
        progress: &Progress,
    ) -> PlayResult<()>;

    /// Remove a player's progress (explicit reset).
    async fn clear_progress(&self, story: &StoryId, player: PlayerId) -> PlayResult<()>;
}

/// The generative service that authors missing fragments on demand.
#[async_trait]
pub trait FragmentGenerator: Send + Sync {
    /// Produce one or more fragments for a playback request that reached
    /// the absent `fragment`. The first returned fragment must carry the
    /// requested id.
    async fn generate(
        &self,
        owner: PlayerId,
        story: &StoryId,
        fragment: &FragmentId,
    ) -> PlayResult<Vec<Fragment>>;
}

/// In-memory store used by tests and the CLI.
#[derive(Default)]
pub struct MemoryStore {
    stories: Mutex<HashMap<(PlayerId, StoryId), Story>>,
    progress: Mutex<HashMap<(StoryId, PlayerId), Progress>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a story document.
    pub async fn insert_story(&self, owner: PlayerId, story: Story) {
        self.stories
            .lock()
            .await
            .insert((owner, story.meta.id.clone()), story);
    }
}

#[async_trait]
impl StoryStore for MemoryStore {
    async fn load_story(&self, owner: PlayerId, story: &StoryId) -> PlayResult<Option<Story>> {
        Ok(self.stories.lock().await.get(&(owner, story.clone())).cloned())
    }

    async fn save_story(&self, owner: PlayerId, story: &Story) -> PlayResult<()> {
        self.stories
            .lock()
            .await
            .insert((owner, story.meta.id.clone()), story.clone());
        Ok(())
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn load_progress(
        &self,
        story: &StoryId,
        player: PlayerId,
    ) -> PlayResult<Option<Progress>> {
        Ok(self
            .progress
            .lock()
            .await
            .get(&(story.clone(), player))
            .cloned())
    }

    async fn save_progress(
        &self,
        story: &StoryId,
        player: PlayerId,
        progress: &Progress,
    ) -> PlayResult<()> {
        self.progress
            .lock()
            .await
            .insert((story.clone(), player), progress.clone());
        Ok(())
    }

    async fn clear_progress(&self, story: &StoryId, player: PlayerId) -> PlayResult<()> {
        self.progress.lock().await.remove(&(story.clone(), player));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabula_core::StoryMeta;

    fn story() -> Story {
        Story::new(StoryMeta::new(StoryId::new("demo"), "Demo", PlayerId(1)))
    }

    #[tokio::test]
    async fn story_round_trip() {
        let store = MemoryStore::new();
        let owner = PlayerId(1);
        store.insert_story(owner, story()).await;

        let loaded = store
            .load_story(owner, &StoryId::new("demo"))
            .await
            .unwrap();
        assert!(loaded.is_some());
        assert!(
            store
                .load_story(PlayerId(2), &StoryId::new("demo"))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn progress_round_trip_and_clear() {
        let store = MemoryStore::new();
        let sid = StoryId::new("demo");
        let player = PlayerId(7);

        assert!(store.load_progress(&sid, player).await.unwrap().is_none());

        let mut progress = Progress::at_root();
        progress.attrs.set("hp", 10);
        store.save_progress(&sid, player, &progress).await.unwrap();

        let loaded = store.load_progress(&sid, player).await.unwrap().unwrap();
        assert_eq!(loaded, progress);

        store.clear_progress(&sid, player).await.unwrap();
        assert!(store.load_progress(&sid, player).await.unwrap().is_none());
    }

    #[test]
    fn progress_deserializes_legacy_shape() {
        // Stores keep attrs under "current_effects" with loose value types.
        let raw = r#"{"fragment_id": "main_1", "current_effects": {"hp": "12", "bad": null}}"#;
        let progress: Progress = serde_json::from_str(raw).unwrap();
        assert!(progress.fragment_id.is_root());
        assert_eq!(progress.attrs.get("hp"), Some(12));
        assert_eq!(progress.attrs.len(), 1);
    }
}
