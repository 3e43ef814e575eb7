use serde::{Deserialize, Serialize};

use super::domain::{
    same_name, Criterion, CriterionId, Decision, DecisionDetail, DecisionId, DecisionOption,
    Evaluation, OptionId,
};
use super::scoring::ScoringInput;
use crate::auth::UserId;
use crate::error::RepositoryError;

/// Repository record holding a decision together with everything it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub decision: Decision,
    pub options: Vec<DecisionOption>,
    pub criteria: Vec<Criterion>,
    pub evaluations: Vec<Evaluation>,
}

impl DecisionRecord {
    pub fn new(decision: Decision) -> Self {
        Self {
            decision,
            options: Vec::new(),
            criteria: Vec::new(),
            evaluations: Vec::new(),
        }
    }

    pub fn detail(&self) -> DecisionDetail {
        DecisionDetail {
            decision: self.decision.clone(),
            options: self.options.clone(),
            criteria: self.criteria.clone(),
        }
    }

    pub fn scoring_input(&self) -> ScoringInput<'_> {
        ScoringInput {
            options: &self.options,
            criteria: &self.criteria,
            evaluations: &self.evaluations,
        }
    }

    pub fn option_named(&self, name: &str) -> Option<&DecisionOption> {
        self.options.iter().find(|option| same_name(&option.name, name))
    }

    pub fn criterion_named(&self, name: &str) -> Option<&Criterion> {
        self.criteria
            .iter()
            .find(|criterion| same_name(&criterion.name, name))
    }

    pub fn has_option(&self, id: &OptionId) -> bool {
        self.options.iter().any(|option| &option.id == id)
    }

    pub fn has_criterion(&self, id: &CriterionId) -> bool {
        self.criteria.iter().any(|criterion| &criterion.id == id)
    }

    /// Stores the evaluation, replacing any earlier value for the same pair.
    pub fn upsert_evaluation(&mut self, evaluation: Evaluation) {
        match self.evaluations.iter_mut().find(|existing| {
            existing.option_id == evaluation.option_id
                && existing.criterion_id == evaluation.criterion_id
        }) {
            Some(existing) => existing.value = evaluation.value,
            None => self.evaluations.push(evaluation),
        }
    }

    pub fn evaluation_for(&self, option: &OptionId, criterion: &CriterionId) -> Option<f64> {
        self.evaluations
            .iter()
            .find(|evaluation| &evaluation.option_id == option && &evaluation.criterion_id == criterion)
            .map(|evaluation| evaluation.value)
    }
}

/// Storage abstraction so the service can be exercised in isolation.
///
/// `update` replaces the whole aggregate; callers serialize writes per decision.
/// `owned_by` returns records oldest first.
pub trait DecisionRepository: Send + Sync {
    fn insert(&self, record: DecisionRecord) -> Result<DecisionRecord, RepositoryError>;
    fn update(&self, record: DecisionRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &DecisionId) -> Result<Option<DecisionRecord>, RepositoryError>;
    fn owned_by(&self, owner: &UserId) -> Result<Vec<DecisionRecord>, RepositoryError>;
}
