use std::collections::HashMap;

use super::super::domain::{Criterion, CriterionId, DecisionOption, OptionId, VALUE_MAX, VALUE_MIN};
use super::config::MissingEvaluationPolicy;

/// Raw measurements for one option, before rounding and bucketing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct OptionSignals {
    /// `Σ weight · value`, gaps filled per policy.
    pub(crate) weighted_total: f64,
    /// `Σ weight` over every criterion.
    pub(crate) total_weight: f64,
    /// Share of total weight backed by a recorded value.
    pub(crate) coverage: f64,
    /// Weighted standard deviation of recorded values on a 0..1 scale.
    pub(crate) dispersion: f64,
}

pub(crate) type ValueTable<'a> = HashMap<(&'a OptionId, &'a CriterionId), f64>;

pub(crate) fn option_signals<'a>(
    option: &'a DecisionOption,
    criteria: &'a [Criterion],
    values: &ValueTable<'a>,
    policy: MissingEvaluationPolicy,
) -> OptionSignals {
    let fill = policy.fill_value().unwrap_or(VALUE_MIN);
    let span = VALUE_MAX - VALUE_MIN;

    let mut total_weight = 0.0;
    let mut covered_weight = 0.0;
    let mut weighted_total = 0.0;
    let mut recorded: Vec<(f64, f64)> = Vec::with_capacity(criteria.len());

    for criterion in criteria {
        let weight = f64::from(criterion.weight.get());
        total_weight += weight;

        let value = match values.get(&(&option.id, &criterion.id)) {
            Some(value) => {
                covered_weight += weight;
                recorded.push((weight, (value - VALUE_MIN) / span));
                *value
            }
            None => fill,
        };
        weighted_total += weight * value;
    }

    if total_weight <= 0.0 {
        return OptionSignals {
            weighted_total: 0.0,
            total_weight: 0.0,
            coverage: 0.0,
            dispersion: 0.0,
        };
    }

    OptionSignals {
        weighted_total,
        total_weight,
        coverage: covered_weight / total_weight,
        dispersion: weighted_deviation(&recorded, covered_weight),
    }
}

fn weighted_deviation(recorded: &[(f64, f64)], covered_weight: f64) -> f64 {
    if covered_weight <= 0.0 {
        return 0.0;
    }

    let mean = recorded
        .iter()
        .map(|(weight, value)| weight * value)
        .sum::<f64>()
        / covered_weight;
    let variance = recorded
        .iter()
        .map(|(weight, value)| weight * (value - mean).powi(2))
        .sum::<f64>()
        / covered_weight;

    variance.sqrt()
}

/// Score on 0..=100, one decimal place. Normalized by total weight, so the
/// number of criteria has no bearing on the scale.
pub(crate) fn score_from(signals: &OptionSignals) -> f64 {
    if signals.total_weight <= 0.0 {
        return 0.0;
    }
    let span = VALUE_MAX - VALUE_MIN;
    let lifted = signals.weighted_total - signals.total_weight * VALUE_MIN;
    let percent = lifted * 100.0 / (signals.total_weight * span);
    round_tenth(percent.clamp(0.0, 100.0))
}

/// Confidence on 0..=100: coverage discounted by disagreement between criteria.
pub(crate) fn confidence_from(signals: &OptionSignals) -> u8 {
    let consistency = (1.0 - 2.0 * signals.dispersion).clamp(0.0, 1.0);
    let confidence = 100.0 * signals.coverage * (0.5 + 0.5 * consistency);
    confidence.round().clamp(0.0, 100.0) as u8
}

pub(crate) fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
