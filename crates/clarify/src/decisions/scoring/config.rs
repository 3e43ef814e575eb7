use serde::{Deserialize, Serialize};

use super::super::domain::{VALUE_MAX, VALUE_MIN};

/// How an (option, criterion) pair without a recorded value is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingEvaluationPolicy {
    /// Count the gap as the middle of the scale.
    #[default]
    Midpoint,
    /// Count the gap as the bottom of the scale.
    Zero,
    /// Refuse to score until every pair is evaluated.
    Reject,
}

impl MissingEvaluationPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "midpoint" | "mid" => Some(Self::Midpoint),
            "zero" => Some(Self::Zero),
            "reject" | "strict" => Some(Self::Reject),
            _ => None,
        }
    }

    /// Value substituted for a gap, or `None` when gaps are not allowed.
    pub fn fill_value(self) -> Option<f64> {
        match self {
            Self::Midpoint => Some((VALUE_MIN + VALUE_MAX) / 2.0),
            Self::Zero => Some(VALUE_MIN),
            Self::Reject => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Midpoint => "midpoint",
            Self::Zero => "zero",
            Self::Reject => "reject",
        }
    }
}

/// Engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub missing_evaluations: MissingEvaluationPolicy,
}
