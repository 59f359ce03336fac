//! Timed-reveal steps and display placeholders in fragment text.
//!
//! Fragment text may contain reveal markers that split it into a schedule
//! of in-place edits: `[+N]` appends the following segment after N seconds,
//! `[=N]` replaces the displayed text with it. Text may also embed `%stat%`
//! placeholders substituted with the player's current attribute value at
//! display time.

use fabula_core::AttributeMap;

/// How a reveal step edits the displayed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealMode {
    /// Append the step's text below what is already shown.
    Append,
    /// Replace the displayed text entirely.
    Replace,
}

/// One scheduled edit of displayed fragment text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealStep {
    /// Seconds to wait after the previous step.
    pub delay_secs: u64,
    /// How the text is applied.
    pub mode: RevealMode,
    /// The text segment for this step.
    pub text: String,
}

/// Parse fragment text into its ordered reveal schedule.
///
/// The first step always has delay 0 (the initial display, possibly empty
/// when the text opens with a marker). Later steps with empty segments are
/// dropped. Text without markers yields a single immediate step.
pub fn reveal_steps(text: &str) -> Vec<RevealStep> {
    let mut steps: Vec<RevealStep> = Vec::new();
    let mut pending: Option<(RevealMode, u64)> = None;
    let mut rest = text;

    loop {
        let marker = find_marker(rest);
        let segment = match marker {
            Some((start, ..)) => rest[..start].trim(),
            None => rest.trim(),
        };

        match pending {
            None => steps.push(RevealStep {
                delay_secs: 0,
                mode: RevealMode::Replace,
                text: segment.to_string(),
            }),
            Some((mode, delay_secs)) if !segment.is_empty() => steps.push(RevealStep {
                delay_secs,
                mode,
                text: segment.to_string(),
            }),
            Some(_) => {}
        }

        match marker {
            Some((_, end, mode, secs)) => {
                pending = Some((mode, secs));
                rest = &rest[end..];
            }
            None => break,
        }
    }
    steps
}

/// Find the next reveal marker: `(start, end_exclusive, mode, seconds)`.
fn find_marker(text: &str) -> Option<(usize, usize, RevealMode, u64)> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i + 3 < bytes.len() {
        if bytes[i] == b'[' {
            let mode = match bytes[i + 1] {
                b'+' => Some(RevealMode::Append),
                b'=' => Some(RevealMode::Replace),
                _ => None,
            };
            if let Some(mode) = mode {
                let mut j = i + 2;
                while j < bytes.len() && bytes[j].is_ascii_digit() {
                    j += 1;
                }
                if j > i + 2
                    && j < bytes.len()
                    && bytes[j] == b']'
                    && let Ok(secs) = text[i + 2..j].parse::<u64>()
                {
                    return Some((i, j + 1, mode, secs));
                }
            }
        }
        i += 1;
    }
    None
}

/// Substitute `%stat%` placeholders with current attribute values.
///
/// A missing attribute renders as `0`. Anything between `%` signs that is
/// not a plain attribute name is left untouched.
pub fn render_placeholders(text: &str, attrs: &AttributeMap) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('%') {
            Some(end) if end > 0 && after[..end].chars().all(placeholder_char) => {
                out.push_str(&attrs.value_or_zero(&after[..end]).to_string());
                rest = &after[end + 1..];
            }
            _ => {
                out.push('%');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn placeholder_char(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}
