//! Effect mini-language for Fabula.
//!
//! Choice text may embed `{{...}}` directives that mutate or gate on a
//! player's attributes, for example `Go left {{hp:-5, strength:>3(hide)}}`.
//! This crate parses that mini-language into the structured [`Effect`]
//! form stored on choices, evaluates effect lists for display and on click,
//! and handles the related fragment-text features: timed-reveal markers and
//! `%stat%` display placeholders.
//!
//! [`Effect`]: fabula_core::Effect

/// Evaluation of effect lists against attribute maps.
pub mod eval;
/// Parsing of `{{...}}` effect blocks in choice text.
pub mod parse;
/// Timed-reveal steps and display placeholders in fragment text.
pub mod text;

/// Re-export evaluator types.
pub use eval::{ClickOutcome, Visibility, apply_on_click, evaluate_for_display, weighted_draw};
/// Re-export parser types.
pub use parse::{ParseError, Parsed, parse};
/// Re-export fragment-text types.
pub use text::{RevealMode, RevealStep, render_placeholders, reveal_steps};
