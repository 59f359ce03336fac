//! Parsing of `{{...}}` effect blocks in choice text.
//!
//! Parsing is pure and never fails as a whole: malformed items become
//! [`ParseError`] entries and the rest of the text still parses. Callers
//! re-prompt the author when `errors` is non-empty.

use fabula_core::{CheckOp, Effect, RangeSign, WeightModifier};

/// The result of parsing authored choice text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parsed {
    /// The text with every effect block stripped and whitespace normalized.
    pub clean_text: String,
    /// Structured effects, in authored order.
    pub effects: Vec<Effect>,
    /// One entry per malformed item.
    pub errors: Vec<ParseError>,
}

/// A single malformed effect item.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("\"{item}\": {reason}")]
pub struct ParseError {
    /// The offending item text.
    pub item: String,
    /// Why it was rejected.
    pub reason: String,
}

impl ParseError {
    fn new(item: &str, reason: impl Into<String>) -> Self {
        Self {
            item: item.to_string(),
            reason: reason.into(),
        }
    }
}

/// Parse authored choice text into display text plus structured effects.
///
/// Scans `{{...}}` blocks, splits each block on top-level commas (commas
/// inside `[...]` or `(...)` do not split), and classifies every
/// `stat:value` item. A bare phrase without `:` is shorthand for value `1`.
pub fn parse(text: &str) -> Parsed {
    let mut clean = String::new();
    let mut effects = Vec::new();
    let mut errors = Vec::new();

    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        clean.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                parse_block(&after[..end], &mut effects, &mut errors);
                rest = &after[end + 2..];
            }
            None => {
                errors.push(ParseError::new(&rest[start..], "unterminated {{ block"));
                rest = "";
            }
        }
    }
    clean.push_str(rest);

    Parsed {
        clean_text: normalize_spaces(&clean),
        effects,
        errors,
    }
}

fn normalize_spaces(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_block(body: &str, effects: &mut Vec<Effect>, errors: &mut Vec<ParseError>) {
    for item in split_top_level(body) {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        match parse_item(item) {
            Ok(effect) => effects.push(effect),
            Err(reason) => errors.push(ParseError::new(item, reason)),
        }
    }
}

/// Split on commas not nested inside `[...]` or `(...)`.
fn split_top_level(body: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut depth: u32 = 0;
    for c in body.chars() {
        match c {
            '[' | '(' => {
                depth += 1;
                current.push(c);
            }
            ']' | ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                items.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    items.push(current);
    items
}

fn parse_item(item: &str) -> Result<Effect, String> {
    // A trailing `(hide)` applies to whatever the item turns out to be.
    let (item, hide) = match item.strip_suffix("(hide)") {
        Some(stripped) => (stripped.trim_end(), true),
        None => (item, false),
    };

    let (stat, value) = match item.split_once(':') {
        Some((stat, value)) => (stat.trim(), value.trim()),
        // Bare phrase: shorthand for setting the attribute to 1.
        None => (item.trim(), "1"),
    };

    if stat.is_empty() {
        return Err("missing attribute name".to_string());
    }
    if stat.contains(['{', '}', '[', ']', '(', ')']) {
        return Err("attribute name contains brackets".to_string());
    }
    let stat = stat.to_string();

    // Check: `>n`, `<n`, `=n`.
    if let Some(op) = match value.chars().next() {
        Some('>') => Some(CheckOp::Gt),
        Some('<') => Some(CheckOp::Lt),
        Some('=') => Some(CheckOp::Eq),
        _ => None,
    } {
        let number = value[1..].trim();
        let value = number
            .parse::<i64>()
            .map_err(|_| format!("\"{number}\" is not a number"))?;
        return Ok(Effect::Check {
            stat,
            op,
            value,
            hide,
        });
    }

    // Signed: either a bracketed range draw or a plain modify.
    if let Some(sign) = match value.chars().next() {
        Some('+') => Some(RangeSign::Plus),
        Some('-') => Some(RangeSign::Minus),
        _ => None,
    } {
        let body = value[1..].trim();
        if body.starts_with('[') {
            let (min, max, modifiers) = parse_bracketed_range(body)?;
            return Ok(Effect::ModifyRange {
                stat,
                sign,
                min,
                max,
                modifiers,
                hide,
            });
        }
        let delta = value
            .parse::<i64>()
            .map_err(|_| format!("\"{value}\" is not a number"))?;
        return Ok(Effect::Modify { stat, delta, hide });
    }

    // Plain range `a-b`.
    if let Some((min, max)) = parse_plain_range(value) {
        let (min, max) = ordered(min, max)?;
        return Ok(Effect::SetRange {
            stat,
            min,
            max,
            modifiers: Vec::new(),
            hide,
        });
    }

    // Bare unsigned scalar.
    if value.chars().all(|c| c.is_ascii_digit()) && !value.is_empty() {
        let value = value
            .parse::<i64>()
            .map_err(|_| format!("\"{value}\" is too large"))?;
        return Ok(Effect::Set { stat, value, hide });
    }

    Err(format!("\"{value}\" is not a recognized value"))
}

/// `[a-b]` or `[a-b|v1:p1;v2:p2]`.
fn parse_bracketed_range(body: &str) -> Result<(i64, i64, Vec<WeightModifier>), String> {
    let inner = body
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or("unterminated [ range")?;

    let (range, mods) = match inner.split_once('|') {
        Some((range, mods)) => (range.trim(), Some(mods.trim())),
        None => (inner.trim(), None),
    };

    let (min, max) =
        parse_plain_range(range).ok_or_else(|| format!("\"{range}\" is not a range"))?;
    let (min, max) = ordered(min, max)?;

    let mut modifiers = Vec::new();
    if let Some(mods) = mods {
        for part in mods.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (value, prob) = part
                .split_once(':')
                .ok_or_else(|| format!("\"{part}\" is not a value:prob modifier"))?;
            let value = value
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("\"{value}\" is not a number"))?;
            let prob = prob
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("\"{prob}\" is not a number"))?;
            modifiers.push(WeightModifier { value, prob });
        }
    }
    Ok((min, max, modifiers))
}

fn parse_plain_range(value: &str) -> Option<(i64, i64)> {
    let (a, b) = value.split_once('-')?;
    let (a, b) = (a.trim(), b.trim());
    if a.is_empty() || b.is_empty() {
        return None;
    }
    if !a.chars().all(|c| c.is_ascii_digit()) || !b.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((a.parse().ok()?, b.parse().ok()?))
}

fn ordered(min: i64, max: i64) -> Result<(i64, i64), String> {
    if min > max {
        Err(format!("range start {min} exceeds end {max}"))
    } else {
        Ok((min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn plain_text_passes_through() {
        let parsed = parse("Go left");
        assert_eq!(parsed.clean_text, "Go left");
        assert!(parsed.effects.is_empty());
        assert!(parsed.errors.is_empty());
    }

    #[test]
    fn modify_effect() {
        let parsed = parse("Fight the bear {{hp:-5}}");
        assert_eq!(parsed.clean_text, "Fight the bear");
        assert_eq!(
            parsed.effects,
            vec![Effect::Modify {
                stat: "hp".to_string(),
                delta: -5,
                hide: false,
            }]
        );
    }

    #[test]
    fn set_and_check_effects() {
        let parsed = parse("Enter {{gold:10, strength:>3}}");
        assert_eq!(parsed.clean_text, "Enter");
        assert_eq!(
            parsed.effects,
            vec![
                Effect::Set {
                    stat: "gold".to_string(),
                    value: 10,
                    hide: false,
                },
                Effect::Check {
                    stat: "strength".to_string(),
                    op: CheckOp::Gt,
                    value: 3,
                    hide: false,
                },
            ]
        );
    }

    #[test]
    fn bare_phrase_sets_one() {
        let parsed = parse("{{visited}}");
        assert_eq!(
            parsed.effects,
            vec![Effect::Set {
                stat: "visited".to_string(),
                value: 1,
                hide: false,
            }]
        );
    }

    #[test]
    fn hide_suffix() {
        let parsed = parse("{{key:>0(hide), luck:2(hide)}}");
        assert!(parsed.errors.is_empty());
        assert!(parsed.effects.iter().all(Effect::is_hidden));
    }

    #[test]
    fn plain_range() {
        let parsed = parse("{{gold:3-10}}");
        assert_eq!(
            parsed.effects,
            vec![Effect::SetRange {
                stat: "gold".to_string(),
                min: 3,
                max: 10,
                modifiers: vec![],
                hide: false,
            }]
        );
    }

    #[test]
    fn bracketed_range_with_modifiers() {
        let parsed = parse("{{gold:+[3-10|7:100;9:-50]}}");
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        assert_eq!(
            parsed.effects,
            vec![Effect::ModifyRange {
                stat: "gold".to_string(),
                sign: RangeSign::Plus,
                min: 3,
                max: 10,
                modifiers: vec![
                    WeightModifier {
                        value: 7,
                        prob: 100
                    },
                    WeightModifier {
                        value: 9,
                        prob: -50
                    },
                ],
                hide: false,
            }]
        );
    }

    #[test]
    fn negative_bracketed_range() {
        let parsed = parse("{{hp:-[1-6]}}");
        assert_eq!(
            parsed.effects,
            vec![Effect::ModifyRange {
                stat: "hp".to_string(),
                sign: RangeSign::Minus,
                min: 1,
                max: 6,
                modifiers: vec![],
                hide: false,
            }]
        );
    }

    #[test]
    fn malformed_items_become_errors_without_aborting() {
        let parsed = parse("{{hp:+2, :5, luck:abc, gold:9-3}}");
        assert_eq!(parsed.effects.len(), 1);
        assert_eq!(parsed.errors.len(), 3);
        assert!(parsed.errors[0].reason.contains("missing attribute name"));
        assert!(parsed.errors[2].reason.contains("exceeds"));
    }

    #[test]
    fn unterminated_block_is_an_error() {
        let parsed = parse("Go {{hp:-5");
        assert_eq!(parsed.clean_text, "Go");
        assert_eq!(parsed.errors.len(), 1);
        assert!(parsed.errors[0].reason.contains("unterminated"));
    }

    #[test]
    fn multiple_blocks() {
        let parsed = parse("A {{x:1}} and {{y:-2}} B");
        assert_eq!(parsed.clean_text, "A and B");
        assert_eq!(parsed.effects.len(), 2);
    }

    #[test]
    fn clean_text_reparse_is_empty() {
        let parsed = parse("Go {{hp:-5, gold:3-10}} on");
        let again = parse(&parsed.clean_text);
        assert!(again.effects.is_empty());
        assert!(again.errors.is_empty());
        assert_eq!(again.clean_text, parsed.clean_text);
    }

    #[test]
    fn check_with_negative_number() {
        let parsed = parse("{{karma:>-5}}");
        assert_eq!(
            parsed.effects,
            vec![Effect::Check {
                stat: "karma".to_string(),
                op: CheckOp::Gt,
                value: -5,
                hide: false,
            }]
        );
    }

    proptest! {
        #[test]
        fn stripping_is_idempotent(text in ".{0,200}") {
            let parsed = parse(&text);
            let again = parse(&parsed.clean_text);
            prop_assert!(again.effects.is_empty());
            prop_assert!(again.errors.is_empty());
            prop_assert_eq!(again.clean_text, parsed.clean_text);
        }
    }
}
