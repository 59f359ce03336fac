//! Core types for Fabula: fragments, choices, effects, and the story graph.
//!
//! This crate defines the narrative graph model that the rest of the engine
//! operates on. A story is a set of [`Fragment`]s keyed by id, linked by
//! ordered [`Choice`] edges that may carry [`Effect`]s. Targets are stored as
//! plain ids and resolved lazily, so forward references and cycles are
//! representable without owning-pointer loops. The crate is independent of
//! playback — you can construct a [`Story`] programmatically or deserialize
//! one from JSON.

/// Per-player numeric attribute maps.
pub mod attrs;
/// Safe-deletion cascade planning over the story graph.
pub mod deletion;
/// Structured effects attached to choices.
pub mod effect;
/// Error types used throughout the crate.
pub mod error;
/// Fragments, choices, and media references.
pub mod fragment;
/// Identifiers for stories, fragments, players, and sessions.
pub mod id;
/// The story graph that owns all fragments.
pub mod story;

/// Re-export attribute map.
pub use attrs::AttributeMap;
/// Re-export deletion planning types.
pub use deletion::{DeletionPlan, plan_deletion};
/// Re-export effect types.
pub use effect::{CheckOp, Effect, RangeSign, WeightModifier};
/// Re-export error types.
pub use error::{CoreError, CoreResult};
/// Re-export fragment types.
pub use fragment::{Choice, Fragment, MediaKind, MediaRef};
/// Re-export identifier types.
pub use id::{FragmentId, PlayerId, SessionId, StoryId};
/// Re-export story types.
pub use story::{Story, StoryMeta};
