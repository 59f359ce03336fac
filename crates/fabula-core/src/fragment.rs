//! Fragments, choices, and media references.

use serde::{Deserialize, Serialize};

use crate::effect::Effect;
use crate::id::FragmentId;

/// Text given to a fragment created by forward reference, before the author
/// (or the generation service) fills it in.
pub const EMPTY_FRAGMENT_TEXT: &str = "(empty)";

/// Kind of an attached media reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// A still image.
    Photo,
    /// A video clip.
    Video,
    /// An audio clip or voice message.
    Audio,
    /// Any other attached file.
    Document,
}

/// An opaque, typed reference to platform-hosted media.
///
/// The engine never dereferences these; only the rendering layer does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    /// What kind of media this is.
    pub kind: MediaKind,
    /// Platform file identifier.
    pub file_id: String,
}

impl MediaRef {
    /// Create a media reference.
    pub fn new(kind: MediaKind, file_id: impl Into<String>) -> Self {
        Self {
            kind,
            file_id: file_id.into(),
        }
    }
}

/// A labeled edge between fragments, optionally carrying effects.
///
/// The target may be a forward reference to a fragment that does not exist
/// yet; it must resolve by playback (auto-generated, or surfaced as a dead
/// link).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    /// Display text, with effect blocks already stripped.
    pub text: String,
    /// Raw authored text, kept only for re-editing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Target fragment id.
    pub target: FragmentId,
    /// Ordered effects applied when this choice is taken.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<Effect>,
}

impl Choice {
    /// Create a choice with no effects.
    pub fn new(text: impl Into<String>, target: FragmentId) -> Self {
        Self {
            text: text.into(),
            source: None,
            target,
            effects: Vec::new(),
        }
    }

    /// Attach effects.
    pub fn with_effects(mut self, effects: Vec<Effect>) -> Self {
        self.effects = effects;
        self
    }

    /// Keep the raw authored text for later re-editing.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Auto-advance directive: a display text that is a bare positive number
    /// means no button and an automatic transition after that many seconds.
    pub fn auto_advance(&self) -> Option<u64> {
        self.text.trim().parse::<u64>().ok().filter(|n| *n > 0)
    }
}

/// A node of the story graph; one unit of narrative content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// Unique fragment id within the story.
    pub id: FragmentId,
    /// Narrative text. May embed `%stat%` display placeholders and
    /// `[+N]` / `[=N]` timed-reveal markers.
    pub text: String,
    /// Attached media, shown alongside the text.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<MediaRef>,
    /// Ordered outgoing choices.
    #[serde(default)]
    pub choices: Vec<Choice>,
}

impl Fragment {
    /// Create a fragment with the given text and no choices.
    pub fn new(id: FragmentId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            media: Vec::new(),
            choices: Vec::new(),
        }
    }

    /// Create an empty placeholder fragment, as produced by a forward
    /// reference from another fragment's choice.
    pub fn placeholder(id: FragmentId) -> Self {
        Self::new(id, EMPTY_FRAGMENT_TEXT)
    }

    /// Add a choice.
    pub fn with_choice(mut self, choice: Choice) -> Self {
        self.choices.push(choice);
        self
    }

    /// Add a media reference.
    pub fn with_media(mut self, media: MediaRef) -> Self {
        self.media.push(media);
        self
    }

    /// Whether this fragment ends the story (no outgoing choices).
    pub fn is_terminal(&self) -> bool {
        self.choices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> FragmentId {
        FragmentId::new(name).unwrap()
    }

    #[test]
    fn choice_builder() {
        let choice = Choice::new("Go left", id("Left_1"))
            .with_source("Go left {{hp:-5}}")
            .with_effects(vec![Effect::Modify {
                stat: "hp".to_string(),
                delta: -5,
                hide: false,
            }]);
        assert_eq!(choice.text, "Go left");
        assert_eq!(choice.target, id("Left_1"));
        assert_eq!(choice.effects.len(), 1);
        assert!(choice.source.is_some());
    }

    #[test]
    fn auto_advance_detection() {
        assert_eq!(Choice::new("5", id("Next")).auto_advance(), Some(5));
        assert_eq!(Choice::new(" 12 ", id("Next")).auto_advance(), Some(12));
        assert_eq!(Choice::new("0", id("Next")).auto_advance(), None);
        assert_eq!(Choice::new("-3", id("Next")).auto_advance(), None);
        assert_eq!(Choice::new("Go on", id("Next")).auto_advance(), None);
        assert_eq!(Choice::new("5 minutes", id("Next")).auto_advance(), None);
    }

    #[test]
    fn fragment_builder() {
        let fragment = Fragment::new(id("Forest"), "You enter a dark forest.")
            .with_media(MediaRef::new(MediaKind::Photo, "file123"))
            .with_choice(Choice::new("Run", id("Clearing")));
        assert!(!fragment.is_terminal());
        assert_eq!(fragment.media.len(), 1);
    }

    #[test]
    fn placeholder_is_terminal() {
        let fragment = Fragment::placeholder(id("Later"));
        assert!(fragment.is_terminal());
        assert_eq!(fragment.text, EMPTY_FRAGMENT_TEXT);
    }

    #[test]
    fn serde_skips_empty_fields() {
        let fragment = Fragment::new(id("Forest"), "Trees.");
        let json = serde_json::to_string(&fragment).unwrap();
        assert!(!json.contains("media"));
        assert!(!json.contains("source"));
    }
}
