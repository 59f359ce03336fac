//! Structured effects attached to choices.
//!
//! Effects are authored inside `{{...}}` blocks in choice text and parsed
//! once at authoring time (by `fabula-script`); only the structured form is
//! stored on the choice. Within one choice, effects apply strictly in order,
//! and a failing check halts the remaining effects of that click.

use serde::{Deserialize, Serialize};

/// Comparison operator of a [`Effect::Check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOp {
    /// Current value must be strictly greater.
    Gt,
    /// Current value must be strictly less.
    Lt,
    /// Current value must be equal.
    Eq,
}

impl CheckOp {
    /// The authored symbol for this operator.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Eq => "=",
        }
    }

    /// Whether `current` satisfies the comparison against `value`.
    pub fn holds(self, current: i64, value: i64) -> bool {
        match self {
            Self::Gt => current > value,
            Self::Lt => current < value,
            Self::Eq => current == value,
        }
    }
}

/// Direction of a range-modify draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeSign {
    /// The drawn amount is added.
    Plus,
    /// The drawn amount is subtracted.
    Minus,
}

/// A weight adjustment for one exact value of a range draw.
///
/// Every integer in the range starts with weight 1; a modifier multiplies
/// the weight of its exact value by `1 + prob/100`, clamped at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightModifier {
    /// The exact value whose weight is adjusted.
    pub value: i64,
    /// Percentage adjustment; `100` doubles the weight, `-100` removes it.
    pub prob: i64,
}

/// A single attribute mutation or gating condition attached to a choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Effect {
    /// Set the attribute to a fixed value (authored as a bare unsigned int).
    Set {
        /// Attribute name.
        stat: String,
        /// The value to set.
        value: i64,
        /// Suppress the notification line for this effect.
        hide: bool,
    },
    /// Adjust the attribute by a fixed amount (authored with explicit sign).
    Modify {
        /// Attribute name.
        stat: String,
        /// Signed adjustment; a missing attribute counts as 0.
        delta: i64,
        /// Suppress the notification line for this effect.
        hide: bool,
    },
    /// Gate on the current attribute value (authored `>n`, `<n`, or `=n`).
    Check {
        /// Attribute name.
        stat: String,
        /// Comparison operator.
        op: CheckOp,
        /// Value compared against.
        value: i64,
        /// If true, a failing check makes the whole choice invisible; if
        /// false, the choice stays visible but inert with an annotation.
        hide: bool,
    },
    /// Set the attribute from a weighted draw in `[min, max]` (authored `a-b`).
    SetRange {
        /// Attribute name.
        stat: String,
        /// Inclusive lower bound.
        min: i64,
        /// Inclusive upper bound.
        max: i64,
        /// Weight adjustments for the draw.
        modifiers: Vec<WeightModifier>,
        /// Suppress the notification line for this effect.
        hide: bool,
    },
    /// Adjust the attribute by a weighted draw (authored `+[a-b]` / `-[a-b]`).
    ModifyRange {
        /// Attribute name.
        stat: String,
        /// Whether the drawn amount is added or subtracted.
        sign: RangeSign,
        /// Inclusive lower bound of the draw.
        min: i64,
        /// Inclusive upper bound of the draw.
        max: i64,
        /// Weight adjustments for the draw.
        modifiers: Vec<WeightModifier>,
        /// Suppress the notification line for this effect.
        hide: bool,
    },
}

impl Effect {
    /// The attribute this effect reads or writes.
    pub fn stat(&self) -> &str {
        match self {
            Self::Set { stat, .. }
            | Self::Modify { stat, .. }
            | Self::Check { stat, .. }
            | Self::SetRange { stat, .. }
            | Self::ModifyRange { stat, .. } => stat,
        }
    }

    /// Whether this effect is marked `(hide)`.
    pub fn is_hidden(&self) -> bool {
        match self {
            Self::Set { hide, .. }
            | Self::Modify { hide, .. }
            | Self::Check { hide, .. }
            | Self::SetRange { hide, .. }
            | Self::ModifyRange { hide, .. } => *hide,
        }
    }

    /// Whether this effect is a gating check.
    pub fn is_check(&self) -> bool {
        matches!(self, Self::Check { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_op_holds() {
        assert!(CheckOp::Gt.holds(5, 3));
        assert!(!CheckOp::Gt.holds(3, 3));
        assert!(CheckOp::Lt.holds(2, 3));
        assert!(CheckOp::Eq.holds(3, 3));
        assert!(!CheckOp::Eq.holds(4, 3));
    }

    #[test]
    fn accessors() {
        let e = Effect::Check {
            stat: "strength".to_string(),
            op: CheckOp::Gt,
            value: 3,
            hide: true,
        };
        assert_eq!(e.stat(), "strength");
        assert!(e.is_hidden());
        assert!(e.is_check());

        let e = Effect::Modify {
            stat: "hp".to_string(),
            delta: -5,
            hide: false,
        };
        assert!(!e.is_check());
        assert!(!e.is_hidden());
    }

    #[test]
    fn serde_round_trip() {
        let e = Effect::ModifyRange {
            stat: "gold".to_string(),
            sign: RangeSign::Plus,
            min: 3,
            max: 10,
            modifiers: vec![WeightModifier { value: 7, prob: 100 }],
            hide: false,
        };
        let json = serde_json::to_string(&e).unwrap();
        let back: Effect = serde_json::from_str(&json).unwrap();
        assert_eq!(e, back);
    }
}
