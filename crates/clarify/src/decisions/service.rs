use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tracing::{debug, info};

use super::domain::{
    non_blank, same_name, validate_value, AnalysisResult, Criterion, CriterionId, Decision,
    DecisionDetail, DecisionId, DecisionInputError, DecisionOption, Evaluation, NewCriterion,
    NewDecision, NewOption, OptionId, Weight,
};
use super::repository::{DecisionRecord, DecisionRepository};
use super::scoring::{ScoringConfig, ScoringEngine, ScoringError};
use super::suggestion::{AiSuggestion, AppliedSuggestion, SuggestionError, SuggestionValidator};
use crate::auth::UserId;
use crate::error::{ApiError, RepositoryError};

static DECISION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static OPTION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static CRITERION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_decision_id() -> DecisionId {
    let id = DECISION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    DecisionId(format!("dec-{id:06}"))
}

fn next_option_id() -> OptionId {
    let id = OPTION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    OptionId(format!("opt-{id:06}"))
}

fn next_criterion_id() -> CriterionId {
    let id = CRITERION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    CriterionId(format!("crit-{id:06}"))
}

/// One mutex per decision so fetch, mutate, and update never interleave.
#[derive(Default)]
struct DecisionLocks {
    inner: Mutex<HashMap<DecisionId, Arc<Mutex<()>>>>,
}

impl DecisionLocks {
    fn handle(&self, id: &DecisionId) -> Arc<Mutex<()>> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(id.clone())
            .or_default()
            .clone()
    }

    /// Drops the caller's handle and evicts the entry once no one else holds it.
    fn release(&self, id: &DecisionId, handle: Arc<Mutex<()>>) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        drop(handle);
        if inner
            .get(id)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            inner.remove(id);
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Service composing the decision repository with the scoring engine.
///
/// Every operation is scoped to the caller; a decision owned by someone else
/// is reported as not found.
pub struct DecisionService<R> {
    repository: Arc<R>,
    engine: Arc<ScoringEngine>,
    locks: DecisionLocks,
}

impl<R> DecisionService<R>
where
    R: DecisionRepository + 'static,
{
    pub fn new(repository: Arc<R>, config: ScoringConfig) -> Self {
        Self {
            repository,
            engine: Arc::new(ScoringEngine::new(config)),
            locks: DecisionLocks::default(),
        }
    }

    pub fn scoring_config(&self) -> &ScoringConfig {
        self.engine.config()
    }

    /// Every decision the owner created, oldest first.
    pub fn list(&self, owner: &UserId) -> Result<Vec<Decision>, DecisionServiceError> {
        let records = self.repository.owned_by(owner)?;
        Ok(records.into_iter().map(|record| record.decision).collect())
    }

    pub fn create(
        &self,
        owner: &UserId,
        request: NewDecision,
    ) -> Result<Decision, DecisionServiceError> {
        let title = request.title.trim().to_string();
        if title.is_empty() {
            return Err(DecisionInputError::EmptyTitle.into());
        }

        let decision = Decision {
            id: next_decision_id(),
            title,
            description: non_blank(request.description),
            created_at: Utc::now(),
            owner_id: owner.clone(),
        };

        let stored = self.repository.insert(DecisionRecord::new(decision))?;
        info!(decision_id = %stored.decision.id, owner = %owner.0, "decision created");
        Ok(stored.decision)
    }

    pub fn get(
        &self,
        owner: &UserId,
        id: &DecisionId,
    ) -> Result<DecisionDetail, DecisionServiceError> {
        Ok(self.owned_record(owner, id)?.detail())
    }

    pub fn add_option(
        &self,
        owner: &UserId,
        id: &DecisionId,
        request: NewOption,
    ) -> Result<DecisionOption, DecisionServiceError> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(DecisionInputError::EmptyOptionName.into());
        }

        self.mutate(owner, id, |record| {
            if record.option_named(&name).is_some() {
                return Err(DecisionInputError::DuplicateOption(name.clone()).into());
            }
            let option = DecisionOption {
                id: next_option_id(),
                decision_id: record.decision.id.clone(),
                name: name.clone(),
                summary: non_blank(request.summary),
                created_at: Utc::now(),
            };
            record.options.push(option.clone());
            Ok(option)
        })
    }

    pub fn add_criterion(
        &self,
        owner: &UserId,
        id: &DecisionId,
        request: NewCriterion,
    ) -> Result<Criterion, DecisionServiceError> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(DecisionInputError::EmptyCriterionName.into());
        }
        let weight = Weight::new(request.weight)?;

        self.mutate(owner, id, |record| {
            if record.criterion_named(&name).is_some() {
                return Err(DecisionInputError::DuplicateCriterion(name.clone()).into());
            }
            let criterion = Criterion {
                id: next_criterion_id(),
                decision_id: record.decision.id.clone(),
                name: name.clone(),
                weight,
            };
            record.criteria.push(criterion.clone());
            Ok(criterion)
        })
    }

    /// Stores a manual evaluation, replacing any earlier value for the pair.
    pub fn record_evaluation(
        &self,
        owner: &UserId,
        id: &DecisionId,
        evaluation: Evaluation,
    ) -> Result<Evaluation, DecisionServiceError> {
        let value = validate_value(evaluation.value)?;

        self.mutate(owner, id, |record| {
            if !record.has_option(&evaluation.option_id) {
                return Err(
                    DecisionInputError::UnknownOption(evaluation.option_id.0.clone()).into(),
                );
            }
            if !record.has_criterion(&evaluation.criterion_id) {
                return Err(
                    DecisionInputError::UnknownCriterion(evaluation.criterion_id.0.clone()).into(),
                );
            }
            let stored = Evaluation {
                option_id: evaluation.option_id.clone(),
                criterion_id: evaluation.criterion_id.clone(),
                value,
            };
            record.upsert_evaluation(stored.clone());
            Ok(stored)
        })
    }

    /// Validates generated output against the stored decision, then upserts
    /// criteria by name and evaluations by pair. Nothing is written when
    /// validation fails.
    pub fn apply_suggestion(
        &self,
        owner: &UserId,
        id: &DecisionId,
        suggestion: &AiSuggestion,
    ) -> Result<AppliedSuggestion, DecisionServiceError> {
        self.mutate(owner, id, |record| {
            let validated = SuggestionValidator::new(&record.options, &record.criteria)
                .validate(suggestion)?;

            for (name, weight) in validated.criteria {
                match record
                    .criteria
                    .iter_mut()
                    .find(|existing| same_name(&existing.name, &name))
                {
                    Some(existing) => existing.weight = weight,
                    None => record.criteria.push(Criterion {
                        id: next_criterion_id(),
                        decision_id: record.decision.id.clone(),
                        name,
                        weight,
                    }),
                }
            }

            for resolved in validated.evaluations {
                let criterion_id = record
                    .criterion_named(&resolved.criterion)
                    .map(|criterion| criterion.id.clone())
                    .ok_or_else(|| SuggestionError::UnknownCriterion(resolved.criterion.clone()))?;
                record.upsert_evaluation(Evaluation {
                    option_id: resolved.option_id,
                    criterion_id,
                    value: resolved.value,
                });
            }

            debug!(
                decision_id = %record.decision.id,
                criteria = record.criteria.len(),
                evaluations = record.evaluations.len(),
                "suggestion applied"
            );

            Ok(AppliedSuggestion {
                criteria: record.criteria.clone(),
                evaluations: record.evaluations.clone(),
            })
        })
    }

    /// Scores one snapshot of the decision. Nothing is persisted.
    pub fn analyze(
        &self,
        owner: &UserId,
        id: &DecisionId,
    ) -> Result<AnalysisResult, DecisionServiceError> {
        let record = self.owned_record(owner, id)?;
        let result = self.engine.analyze(record.scoring_input())?;
        info!(
            decision_id = %id,
            recommended = %result.recommended.option_id.0,
            score = result.recommended.score,
            "analysis completed"
        );
        Ok(result)
    }

    fn owned_record(
        &self,
        owner: &UserId,
        id: &DecisionId,
    ) -> Result<DecisionRecord, DecisionServiceError> {
        match self.repository.fetch(id)? {
            Some(record) if &record.decision.owner_id == owner => Ok(record),
            _ => Err(DecisionServiceError::NotFound(id.clone())),
        }
    }

    fn mutate<T>(
        &self,
        owner: &UserId,
        id: &DecisionId,
        change: impl FnOnce(&mut DecisionRecord) -> Result<T, DecisionServiceError>,
    ) -> Result<T, DecisionServiceError> {
        let lock = self.locks.handle(id);
        let outcome = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.owned_record(owner, id).and_then(|mut record| {
                let output = change(&mut record)?;
                self.repository.update(record)?;
                Ok(output)
            })
        };
        self.locks.release(id, lock);
        outcome
    }

    #[cfg(test)]
    pub(crate) fn tracked_locks(&self) -> usize {
        self.locks.tracked()
    }
}

/// Error raised by the decision service.
#[derive(Debug, thiserror::Error)]
pub enum DecisionServiceError {
    #[error(transparent)]
    Input(#[from] DecisionInputError),
    #[error(transparent)]
    Suggestion(#[from] SuggestionError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error("decision {0} not found")]
    NotFound(DecisionId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<DecisionServiceError> for ApiError {
    fn from(value: DecisionServiceError) -> Self {
        match value {
            DecisionServiceError::Input(err) => ApiError::validation(err.code(), err.to_string()),
            DecisionServiceError::Suggestion(SuggestionError::NoOptions) => {
                ApiError::domain("no_options", SuggestionError::NoOptions.to_string())
            }
            DecisionServiceError::Suggestion(SuggestionError::Generator(message)) => {
                ApiError::internal(format!("suggestion generator failed: {message}"))
            }
            DecisionServiceError::Suggestion(err) => {
                ApiError::validation(err.code(), err.to_string())
            }
            DecisionServiceError::Scoring(err) => ApiError::domain(err.code(), err.to_string()),
            DecisionServiceError::NotFound(_) => ApiError::not_found(value.to_string()),
            DecisionServiceError::Repository(err) => err.into(),
        }
    }
}
