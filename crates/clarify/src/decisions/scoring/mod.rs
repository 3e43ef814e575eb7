//! Weighted multi-criteria scoring.
//!
//! Each option's score is its weight-normalized total on a 0–100 scale, so adding
//! criteria never changes the scale itself. Confidence falls with missing values
//! and with disagreement between criteria; risk is bucketed from both. The engine
//! reads no clock and no randomness: the same input always yields the same result.

mod config;
mod policy;
mod rules;

pub use config::{MissingEvaluationPolicy, ScoringConfig};

use super::domain::{AnalysisResult, Criterion, DecisionOption, Evaluation, OptionScore};
use rules::ValueTable;
use tracing::debug;

/// Borrowed view over everything the engine needs from one decision.
#[derive(Debug, Clone, Copy)]
pub struct ScoringInput<'a> {
    pub options: &'a [DecisionOption],
    pub criteria: &'a [Criterion],
    pub evaluations: &'a [Evaluation],
}

/// Stateless scorer applying one [`ScoringConfig`].
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn analyze(&self, input: ScoringInput<'_>) -> Result<AnalysisResult, ScoringError> {
        if input.options.is_empty() {
            return Err(ScoringError::NoOptions);
        }
        if input.criteria.is_empty() {
            return Err(ScoringError::NoCriteria);
        }

        let mut options: Vec<&DecisionOption> = input.options.iter().collect();
        options.sort_by_key(|option| option.created_at);

        let values: ValueTable<'_> = input
            .evaluations
            .iter()
            .map(|evaluation| {
                (
                    (&evaluation.option_id, &evaluation.criterion_id),
                    evaluation.value,
                )
            })
            .collect();

        let policy = self.config.missing_evaluations;
        if policy == MissingEvaluationPolicy::Reject {
            let missing = options
                .iter()
                .flat_map(|option| {
                    input
                        .criteria
                        .iter()
                        .map(move |criterion| (&option.id, &criterion.id))
                })
                .filter(|pair| !values.contains_key(pair))
                .count();
            if missing > 0 {
                return Err(ScoringError::IncompleteEvaluations { missing });
            }
        }

        let results: Vec<OptionScore> = options
            .iter()
            .map(|option| {
                let signals = rules::option_signals(option, input.criteria, &values, policy);
                let confidence = rules::confidence_from(&signals);
                OptionScore {
                    option_id: option.id.clone(),
                    name: option.name.clone(),
                    score: rules::score_from(&signals),
                    risk: policy::classify_risk(confidence, &signals),
                    confidence,
                    weighted_total: rules::round_tenth(signals.weighted_total),
                }
            })
            .collect();

        let recommended = policy::recommended_index(&results)
            .map(|index| results[index].clone())
            .ok_or(ScoringError::NoOptions)?;

        debug!(
            options = results.len(),
            criteria = input.criteria.len(),
            policy = policy.label(),
            recommended = %recommended.name,
            "analysis computed"
        );

        Ok(AnalysisResult {
            recommended,
            results,
        })
    }
}

/// Domain failures that block an analysis. Distinct from transport problems so
/// callers can tell the user what to fix.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoringError {
    #[error("add at least one option before running an analysis")]
    NoOptions,
    #[error("add at least one criterion before running an analysis")]
    NoCriteria,
    #[error("{missing} option/criterion pair(s) have no evaluation yet")]
    IncompleteEvaluations { missing: usize },
}

impl ScoringError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NoOptions => "no_options",
            Self::NoCriteria => "no_criteria",
            Self::IncompleteEvaluations { .. } => "incomplete_evaluations",
        }
    }
}
