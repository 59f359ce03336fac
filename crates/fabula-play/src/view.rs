//! Views handed to the rendering layer.
//!
//! The engine never renders anything itself; it assembles a [`FragmentView`]
//! and lets the platform layer (chat keyboard, terminal, web) draw it and
//! feed back [`NavEvent`]s.

use fabula_core::{FragmentId, MediaRef, PlayerId};

/// One selectable button on a fragment view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonView {
    /// Index into the fragment's choice list.
    pub index: usize,
    /// Display label.
    pub label: String,
    /// Unmet requirement annotation when the button is visible but locked.
    pub locked: Option<String>,
}

impl ButtonView {
    /// Whether the button can currently do anything.
    pub fn is_locked(&self) -> bool {
        self.locked.is_some()
    }
}

/// A pending automatic transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoAdvance {
    /// Seconds before the transition fires.
    pub delay_secs: u64,
    /// Index into the fragment's choice list.
    pub choice_index: usize,
    /// Where it leads.
    pub target: FragmentId,
}

/// Everything the rendering layer needs to display one fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentView {
    /// The fragment being shown.
    pub fragment_id: FragmentId,
    /// First displayed text, placeholders substituted. Later reveal steps
    /// are scheduled separately.
    pub text: String,
    /// Attached media.
    pub media: Vec<MediaRef>,
    /// Buttons in choice order (auto-advance choices get no button).
    pub buttons: Vec<ButtonView>,
    /// Whether a shared session should turn this view into a poll.
    pub is_poll: bool,
    /// True when the fragment has choices but none is currently visible.
    pub dead_end: bool,
    /// True when the fragment has no choices at all (story ending).
    pub terminal: bool,
    /// Notification lines from the click that led here.
    pub notifications: Vec<String>,
    /// Automatic transition to schedule, if any.
    pub auto_advance: Option<AutoAdvance>,
}

/// An input event from the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavEvent {
    /// The player pressed the button with this choice index.
    Select(usize),
    /// A scheduled auto-advance timer fired.
    AutoTimeout,
    /// A shared-session vote for a choice index.
    Vote {
        /// Who voted.
        voter: PlayerId,
        /// The chosen index.
        index: usize,
    },
}
