//! Decisions, their options and weighted criteria, AI suggestions, and the
//! scoring engine that turns evaluations into a recommendation.

pub mod domain;
pub mod matrix;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod suggestion;

#[cfg(test)]
mod tests;

pub use domain::{
    AnalysisResult, Criterion, CriterionId, Decision, DecisionDetail, DecisionId,
    DecisionInputError, DecisionList, DecisionOption, Evaluation, NewCriterion, NewDecision,
    NewOption, OptionId, OptionScore, RiskLevel, Weight, VALUE_MAX, VALUE_MIN, WEIGHT_MAX,
    WEIGHT_MIN,
};
pub use matrix::{DecisionMatrix, MatrixImportError, MatrixImporter};
pub use repository::{DecisionRecord, DecisionRepository};
pub use router::{decision_router, DecisionApi};
pub use scoring::{MissingEvaluationPolicy, ScoringConfig, ScoringEngine, ScoringError, ScoringInput};
pub use service::{DecisionService, DecisionServiceError};
pub use suggestion::{
    AiSuggestion, AppliedSuggestion, SuggestedCriterion, SuggestedEvaluation, SuggestionError,
    SuggestionGenerator, SuggestionRequest, SuggestionResponse, SuggestionValidator,
    ValidatedSuggestion,
};
