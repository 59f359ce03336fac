//! Identifiers for stories, fragments, players, and sessions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Maximum length of a fragment id, in characters.
pub const MAX_FRAGMENT_ID_LEN: usize = 17;

/// The id of the protected root fragment of every story.
pub const ROOT_FRAGMENT: &str = "main_1";

/// Identifier of a fragment within a story.
///
/// Fragment ids are author-chosen names, validated on creation: Latin or
/// Cyrillic letters, digits, and at most one underscore which must be
/// followed only by trailing digits (for example `GoLeft_6`). The name
/// `main_1` is reserved for the root fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FragmentId(String);

impl FragmentId {
    /// Validate and wrap a fragment name.
    pub fn new(name: impl Into<String>) -> CoreResult<Self> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    /// The protected root fragment id.
    pub fn root() -> Self {
        Self(ROOT_FRAGMENT.to_string())
    }

    /// Whether this is the protected root fragment.
    pub fn is_root(&self) -> bool {
        self.0 == ROOT_FRAGMENT
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check a fragment name against the authoring rules.
    pub fn validate(name: &str) -> CoreResult<()> {
        let reject = |reason: &str| {
            Err(CoreError::InvalidFragmentId {
                name: name.to_string(),
                reason: reason.to_string(),
            })
        };

        if name.is_empty() {
            return reject("name is empty");
        }
        if name != ROOT_FRAGMENT && name.starts_with(ROOT_FRAGMENT) {
            return reject("the main_1 prefix is reserved for the root fragment");
        }
        if name.chars().count() > MAX_FRAGMENT_ID_LEN {
            return reject("name is longer than 17 characters");
        }
        if !name.chars().all(valid_id_char) {
            return reject("only Latin or Cyrillic letters, digits, and underscore are allowed");
        }

        let underscores = name.chars().filter(|c| *c == '_').count();
        if underscores > 1 {
            return reject("at most one underscore is allowed");
        }
        if underscores == 1 {
            // The single underscore must introduce a trailing digit suffix.
            let suffix = name.rsplit('_').next().unwrap_or("");
            if suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_digit()) {
                return reject("the underscore must be followed by trailing digits, like GoLeft_6");
            }
        }

        Ok(())
    }
}

fn valid_id_char(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric() || matches!(c, 'а'..='я' | 'А'..='Я' | 'ё' | 'Ё')
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a story within an owner's library.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoryId(String);

impl StoryId {
    /// Wrap a story id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Platform-assigned identifier of a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Platform-assigned identifier of a chat session.
///
/// Group sessions are negative on some platforms, so this is signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub i64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_names() {
        assert!(FragmentId::validate("Forest").is_ok());
        assert!(FragmentId::validate("GoLeft_6").is_ok());
        assert!(FragmentId::validate("Пещера_12").is_ok());
        assert!(FragmentId::validate(ROOT_FRAGMENT).is_ok());
    }

    #[test]
    fn rejects_empty_and_long_names() {
        assert!(FragmentId::validate("").is_err());
        assert!(FragmentId::validate("a").is_ok());
        assert!(FragmentId::validate(&"a".repeat(17)).is_ok());
        assert!(FragmentId::validate(&"a".repeat(18)).is_err());
    }

    #[test]
    fn length_limit_counts_characters_not_bytes() {
        // 17 Cyrillic letters are 34 bytes but still a valid name.
        assert!(FragmentId::validate(&"ж".repeat(17)).is_ok());
        assert!(FragmentId::validate(&"ж".repeat(18)).is_err());
    }

    #[test]
    fn rejects_bad_characters() {
        assert!(FragmentId::validate("has space").is_err());
        assert!(FragmentId::validate("dash-ed").is_err());
        assert!(FragmentId::validate("dot.ted").is_err());
    }

    #[test]
    fn underscore_rules() {
        assert!(FragmentId::validate("two_under_1").is_err());
        assert!(FragmentId::validate("tail_").is_err());
        assert!(FragmentId::validate("tail_x1").is_err());
        assert!(FragmentId::validate("tail_42").is_ok());
    }

    #[test]
    fn root_prefix_is_reserved() {
        assert!(FragmentId::validate("main_1").is_ok());
        assert!(FragmentId::validate("main_12").is_err());
        assert!(FragmentId::validate("main_1x").is_err());
    }

    #[test]
    fn root_helpers() {
        assert!(FragmentId::root().is_root());
        assert!(!FragmentId::new("Forest").unwrap().is_root());
    }
}
