//! Playback engine for Fabula.
//!
//! Drives a player (or a voting group, via `fabula-vote`) through the story
//! graph: fragment-to-fragment navigation gated by effects, timed text
//! reveal, and cycle-guarded auto-advance. Each (player, story, session)
//! runs as an independent lightweight task; persistence and rendering are
//! reached only through the ports in [`store`] and [`tasks`].

/// Error types for the playback engine.
pub mod error;
/// The navigation state machine.
pub mod navigate;
/// Persistence and generation ports.
pub mod store;
/// Cancellable scheduled edits: timed reveal and auto-advance.
pub mod tasks;
/// Views handed to the rendering layer.
pub mod view;

/// Re-export error types.
pub use error::{PlayError, PlayResult};
/// Re-export the navigator.
pub use navigate::Navigator;
/// Re-export store ports.
pub use store::{FragmentGenerator, MemoryStore, Progress, ProgressStore, StoryStore};
/// Re-export session task types.
pub use tasks::{Renderer, SessionTasks};
/// Re-export view types.
pub use view::{AutoAdvance, ButtonView, FragmentView, NavEvent};
