//! AI-generated criteria and evaluations.
//!
//! Generated output is untrusted data. [`SuggestionValidator`] checks every
//! reference and range against the decision before anything is stored; the
//! client runs it before calling apply and the service runs it again.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::domain::{
    same_name, validate_value, Criterion, DecisionOption, Evaluation, OptionId, Weight,
};

/// Payload for `POST /ai/suggest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRequest {
    pub decision_title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub options: Vec<String>,
}

/// Criterion proposed by the generator. The weight is kept raw until validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedCriterion {
    pub name: String,
    pub weight: f64,
}

/// Evaluation proposed by the generator, referencing option and criterion by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedEvaluation {
    pub option: String,
    pub criterion: String,
    pub value: f64,
}

/// Structured generator output, also the body of `POST /decisions/:id/apply-ai`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiSuggestion {
    #[serde(default)]
    pub criteria: Vec<SuggestedCriterion>,
    #[serde(default)]
    pub evaluations: Vec<SuggestedEvaluation>,
}

impl AiSuggestion {
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty() && self.evaluations.is_empty()
    }
}

/// Response body of `POST /ai/suggest`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionResponse {
    pub generated: AiSuggestion,
}

/// Stored state after a suggestion has been applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedSuggestion {
    pub criteria: Vec<Criterion>,
    pub evaluations: Vec<Evaluation>,
}

/// Suggestion whose references and ranges have been checked.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSuggestion {
    pub criteria: Vec<(String, Weight)>,
    pub evaluations: Vec<ResolvedEvaluation>,
}

/// Evaluation with its option resolved to an id. The criterion stays a name
/// because it may be created by the same suggestion.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEvaluation {
    pub option_id: OptionId,
    pub criterion: String,
    pub value: f64,
}

/// Checks generator output against one decision's options and criteria.
pub struct SuggestionValidator<'a> {
    options: &'a [DecisionOption],
    criteria: &'a [Criterion],
}

impl<'a> SuggestionValidator<'a> {
    pub fn new(options: &'a [DecisionOption], criteria: &'a [Criterion]) -> Self {
        Self { options, criteria }
    }

    pub fn validate(&self, suggestion: &AiSuggestion) -> Result<ValidatedSuggestion, SuggestionError> {
        if suggestion.is_empty() {
            return Err(SuggestionError::Empty);
        }

        let mut criteria = Vec::with_capacity(suggestion.criteria.len());
        let mut seen_criteria: HashSet<String> = HashSet::new();
        for proposed in &suggestion.criteria {
            let name = proposed.name.trim();
            if name.is_empty() {
                return Err(SuggestionError::BlankCriterionName);
            }
            if !seen_criteria.insert(name.to_ascii_lowercase()) {
                return Err(SuggestionError::DuplicateCriterion(name.to_string()));
            }
            criteria.push((name.to_string(), suggested_weight(name, proposed.weight)?));
        }

        let mut evaluations = Vec::with_capacity(suggestion.evaluations.len());
        let mut seen_pairs: HashSet<(String, String)> = HashSet::new();
        for proposed in &suggestion.evaluations {
            let option = self
                .options
                .iter()
                .find(|option| same_name(&option.name, &proposed.option))
                .ok_or_else(|| SuggestionError::UnknownOption(proposed.option.trim().to_string()))?;

            let criterion = proposed.criterion.trim();
            let known_criterion = seen_criteria.contains(&criterion.to_ascii_lowercase())
                || self
                    .criteria
                    .iter()
                    .any(|existing| same_name(&existing.name, criterion));
            if !known_criterion {
                return Err(SuggestionError::UnknownCriterion(criterion.to_string()));
            }

            let value = validate_value(proposed.value).map_err(|_| SuggestionError::ValueOutOfRange {
                option: option.name.clone(),
                criterion: criterion.to_string(),
                value: proposed.value,
            })?;

            if !seen_pairs.insert((option.id.0.clone(), criterion.to_ascii_lowercase())) {
                return Err(SuggestionError::DuplicateEvaluation {
                    option: option.name.clone(),
                    criterion: criterion.to_string(),
                });
            }

            evaluations.push(ResolvedEvaluation {
                option_id: option.id.clone(),
                criterion: criterion.to_string(),
                value,
            });
        }

        Ok(ValidatedSuggestion {
            criteria,
            evaluations,
        })
    }
}

fn suggested_weight(criterion: &str, raw: f64) -> Result<Weight, SuggestionError> {
    let out_of_range = || SuggestionError::WeightOutOfRange {
        criterion: criterion.to_string(),
        weight: raw,
    };
    if !raw.is_finite() || raw.fract() != 0.0 {
        return Err(out_of_range());
    }
    Weight::new(raw as i64).map_err(|_| out_of_range())
}

/// Produces criteria and evaluations for a decision.
pub trait SuggestionGenerator: Send + Sync {
    fn generate(&self, request: &SuggestionRequest) -> Result<AiSuggestion, SuggestionError>;
}

/// Reasons generated output is refused.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SuggestionError {
    #[error("add at least one option before requesting suggestions")]
    NoOptions,
    #[error("the suggestion contains no criteria and no evaluations")]
    Empty,
    #[error("a suggested criterion has no name")]
    BlankCriterionName,
    #[error("criterion '{0}' is suggested more than once")]
    DuplicateCriterion(String),
    #[error("criterion '{criterion}' has weight {weight}, expected a whole number in 1..=5")]
    WeightOutOfRange { criterion: String, weight: f64 },
    #[error("suggestion references unknown option '{0}'")]
    UnknownOption(String),
    #[error("suggestion references unknown criterion '{0}'")]
    UnknownCriterion(String),
    #[error("value {value} for '{option}' on '{criterion}' is outside 0..=10")]
    ValueOutOfRange {
        option: String,
        criterion: String,
        value: f64,
    },
    #[error("'{option}' is evaluated on '{criterion}' more than once")]
    DuplicateEvaluation { option: String, criterion: String },
    #[error("suggestion generator failed: {0}")]
    Generator(String),
}

impl SuggestionError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NoOptions => "no_options",
            Self::Empty => "empty_suggestion",
            Self::BlankCriterionName => "blank_criterion_name",
            Self::DuplicateCriterion(_) => "duplicate_criterion",
            Self::WeightOutOfRange { .. } => "weight_out_of_range",
            Self::UnknownOption(_) => "unknown_option",
            Self::UnknownCriterion(_) => "unknown_criterion",
            Self::ValueOutOfRange { .. } => "value_out_of_range",
            Self::DuplicateEvaluation { .. } => "duplicate_evaluation",
            Self::Generator(_) => "generator_failed",
        }
    }
}
