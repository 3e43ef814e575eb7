use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::UserId;

/// Lowest value on the evaluation scale.
pub const VALUE_MIN: f64 = 0.0;
/// Highest value on the evaluation scale.
pub const VALUE_MAX: f64 = 10.0;
/// Lowest accepted criterion weight.
pub const WEIGHT_MIN: u8 = 1;
/// Highest accepted criterion weight.
pub const WEIGHT_MAX: u8 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DecisionId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OptionId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CriterionId(pub String);

impl fmt::Display for DecisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A question the owner is trying to settle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub id: DecisionId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub owner_id: UserId,
}

/// One of the choices being compared. Named `DecisionOption` to stay clear of
/// `std::option::Option`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionOption {
    pub id: OptionId,
    pub decision_id: DecisionId,
    pub name: String,
    #[serde(default)]
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Relative importance multiplier in `WEIGHT_MIN..=WEIGHT_MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Weight(u8);

impl Weight {
    pub fn new(value: i64) -> Result<Self, DecisionInputError> {
        if (i64::from(WEIGHT_MIN)..=i64::from(WEIGHT_MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(DecisionInputError::WeightOutOfRange(value))
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Weight {
    type Error = DecisionInputError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Weight> for u8 {
    fn from(value: Weight) -> Self {
        value.0
    }
}

/// A factor every option is judged against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    pub id: CriterionId,
    pub decision_id: DecisionId,
    pub name: String,
    pub weight: Weight,
}

/// Judgment of one option against one criterion on the `VALUE_MIN..=VALUE_MAX` scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub option_id: OptionId,
    pub criterion_id: CriterionId,
    pub value: f64,
}

pub fn validate_value(value: f64) -> Result<f64, DecisionInputError> {
    if value.is_finite() && (VALUE_MIN..=VALUE_MAX).contains(&value) {
        Ok(value)
    } else {
        Err(DecisionInputError::ValueOutOfRange(value))
    }
}

/// Names match case-insensitively once surrounding whitespace is dropped.
pub fn same_name(left: &str, right: &str) -> bool {
    left.trim().eq_ignore_ascii_case(right.trim())
}

/// Payload for `POST /decisions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDecision {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Payload for `POST /decisions/:id/options`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOption {
    pub name: String,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Payload for `POST /decisions/:id/criteria`. The weight stays raw until validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCriterion {
    pub name: String,
    pub weight: i64,
}

/// Response for `GET /decisions/:id`: evaluations and results are deliberately absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionDetail {
    pub decision: Decision,
    pub options: Vec<DecisionOption>,
    pub criteria: Vec<Criterion>,
}

/// Response for `GET /decisions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionList {
    pub decisions: Vec<Decision>,
}

/// Qualitative risk bucket attached to each scored option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Scored view of one option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionScore {
    pub option_id: OptionId,
    pub name: String,
    pub score: f64,
    pub risk: RiskLevel,
    pub confidence: u8,
    pub weighted_total: f64,
}

/// Output of one analysis run. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub recommended: OptionScore,
    pub results: Vec<OptionScore>,
}

/// Rejected user input for decisions, options, criteria, and evaluations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecisionInputError {
    #[error("decision title is required")]
    EmptyTitle,
    #[error("option name is required")]
    EmptyOptionName,
    #[error("criterion name is required")]
    EmptyCriterionName,
    #[error("an option named '{0}' already exists")]
    DuplicateOption(String),
    #[error("a criterion named '{0}' already exists")]
    DuplicateCriterion(String),
    #[error("weight {0} is outside 1..=5")]
    WeightOutOfRange(i64),
    #[error("value {0} is outside 0..=10")]
    ValueOutOfRange(f64),
    #[error("option {0} does not belong to this decision")]
    UnknownOption(String),
    #[error("criterion {0} does not belong to this decision")]
    UnknownCriterion(String),
}

impl DecisionInputError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EmptyTitle => "empty_title",
            Self::EmptyOptionName => "empty_option_name",
            Self::EmptyCriterionName => "empty_criterion_name",
            Self::DuplicateOption(_) => "duplicate_option",
            Self::DuplicateCriterion(_) => "duplicate_criterion",
            Self::WeightOutOfRange(_) => "weight_out_of_range",
            Self::ValueOutOfRange(_) => "value_out_of_range",
            Self::UnknownOption(_) => "unknown_option",
            Self::UnknownCriterion(_) => "unknown_criterion",
        }
    }
}

/// Trims a free-text field and drops it when nothing is left.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}
