//! Evaluation of effect lists against attribute maps.
//!
//! Two contracts, per the engine's click model:
//!
//! - [`evaluate_for_display`] is read-only and decides whether a choice is
//!   shown, and with what requirement annotation.
//! - [`apply_on_click`] mutates the attribute map when the choice is taken.
//!
//! Effects apply strictly left-to-right over one mutable snapshot: a check
//! placed after a modify sees the already-modified value. A failing check
//! halts only the remaining effects of the current click.

use rand::Rng;

use fabula_core::{AttributeMap, Effect, RangeSign, WeightModifier};

/// Display outcome for one choice's effect list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visibility {
    /// Whether the choice is shown at all.
    pub visible: bool,
    /// Human-readable unmet requirements; empty when the choice is free to
    /// take (or invisible).
    pub requirement: String,
}

impl Visibility {
    /// A freely takeable choice.
    pub fn open() -> Self {
        Self {
            visible: true,
            requirement: String::new(),
        }
    }

    /// Whether the choice is visible but currently locked.
    pub fn is_locked(&self) -> bool {
        self.visible && !self.requirement.is_empty()
    }
}

/// Decide visibility and requirement annotation for a choice, read-only.
///
/// A failing hidden check short-circuits to invisible with no annotation;
/// failing non-hidden checks accumulate a requirement string while the
/// choice stays visible but locked. Non-check effects never gate display.
pub fn evaluate_for_display(effects: &[Effect], attrs: &AttributeMap) -> Visibility {
    let mut unmet: Vec<String> = Vec::new();
    for effect in effects {
        if let Effect::Check {
            stat,
            op,
            value,
            hide,
        } = effect
        {
            if op.holds(attrs.value_or_zero(stat), *value) {
                continue;
            }
            if *hide {
                return Visibility {
                    visible: false,
                    requirement: String::new(),
                };
            }
            unmet.push(format!("{stat}{}{value}", op.symbol()));
        }
    }
    Visibility {
        visible: true,
        requirement: unmet.join(", "),
    }
}

/// Outcome of applying a choice's effects on click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickOutcome {
    /// Whether navigation may proceed to the choice target.
    pub may_proceed: bool,
    /// Notification lines for non-hidden effects that ran (and, for a
    /// failing non-hidden check, the unmet requirement).
    pub notifications: Vec<String>,
    /// True when the stop came from a hidden check, meaning the caller
    /// should not explain why.
    pub hidden_stop: bool,
}

/// Apply an effect list to the attribute map, in order.
///
/// Mutates `attrs` progressively; a failing check aborts only the remaining
/// effects of this click, leaving earlier mutations in place.
pub fn apply_on_click<R: Rng + ?Sized>(
    effects: &[Effect],
    attrs: &mut AttributeMap,
    rng: &mut R,
) -> ClickOutcome {
    let mut notifications = Vec::new();

    for effect in effects {
        match effect {
            Effect::Set { stat, value, hide } => {
                attrs.set(stat.clone(), *value);
                if !hide {
                    notifications.push(format!("{stat} = {value}"));
                }
            }
            Effect::Modify { stat, delta, hide } => {
                attrs.add(stat.clone(), *delta);
                if !hide {
                    notifications.push(format!("{stat} {delta:+}"));
                }
            }
            Effect::SetRange {
                stat,
                min,
                max,
                modifiers,
                hide,
            } => {
                let drawn = weighted_draw(*min, *max, modifiers, rng);
                attrs.set(stat.clone(), drawn);
                if !hide {
                    notifications.push(format!("{stat} = {drawn}"));
                }
            }
            Effect::ModifyRange {
                stat,
                sign,
                min,
                max,
                modifiers,
                hide,
            } => {
                let drawn = weighted_draw(*min, *max, modifiers, rng);
                let delta = match sign {
                    RangeSign::Plus => drawn,
                    RangeSign::Minus => -drawn,
                };
                attrs.add(stat.clone(), delta);
                if !hide {
                    notifications.push(format!("{stat} {delta:+}"));
                }
            }
            Effect::Check {
                stat,
                op,
                value,
                hide,
            } => {
                if op.holds(attrs.value_or_zero(stat), *value) {
                    continue;
                }
                if !hide {
                    notifications.push(format!("requires {stat}{}{value}", op.symbol()));
                }
                return ClickOutcome {
                    may_proceed: false,
                    notifications,
                    hidden_stop: *hide,
                };
            }
        }
    }

    ClickOutcome {
        may_proceed: true,
        notifications,
        hidden_stop: false,
    }
}

/// Draw an integer from `[min, max]` with per-value weight adjustments.
///
/// Every integer starts with weight 1. Each modifier multiplies the weight
/// of its exact value by `1 + prob/100`, clamped at zero. If all weights
/// collapse to zero, the draw falls back to uniform.
pub fn weighted_draw<R: Rng + ?Sized>(
    min: i64,
    max: i64,
    modifiers: &[WeightModifier],
    rng: &mut R,
) -> i64 {
    if min >= max {
        return min;
    }

    let weights: Vec<f64> = (min..=max)
        .map(|v| {
            let mut weight = 1.0f64;
            for m in modifiers {
                if m.value == v {
                    weight *= (1.0 + m.prob as f64 / 100.0).max(0.0);
                }
            }
            weight
        })
        .collect();

    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return rng.random_range(min..=max);
    }

    let mut point = rng.random_range(0.0..total);
    for (offset, weight) in weights.iter().enumerate() {
        if point < *weight {
            return min + offset as i64;
        }
        point -= weight;
    }
    max
}
