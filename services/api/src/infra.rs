use clarify::auth::{AuthService, UserId, UserRecord, UserRepository};
use clarify::decisions::domain::same_name;
use clarify::decisions::{
    AiSuggestion, DecisionApi, DecisionId, DecisionRecord, DecisionRepository,
    DecisionService, ScoringConfig, SuggestedCriterion, SuggestedEvaluation, SuggestionError,
    SuggestionGenerator, SuggestionRequest,
};
use clarify::error::RepositoryError;
use metrics_exporter_prometheus::PrometheusHandle;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryDecisionRepository {
    records: Arc<Mutex<HashMap<DecisionId, DecisionRecord>>>,
}

impl DecisionRepository for InMemoryDecisionRepository {
    fn insert(&self, record: DecisionRecord) -> Result<DecisionRecord, RepositoryError> {
        let mut guard = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.contains_key(&record.decision.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.decision.id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: DecisionRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.contains_key(&record.decision.id) {
            guard.insert(record.decision.id.clone(), record);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &DecisionId) -> Result<Option<DecisionRecord>, RepositoryError> {
        let guard = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.get(id).cloned())
    }

    fn owned_by(&self, owner: &UserId) -> Result<Vec<DecisionRecord>, RepositoryError> {
        let guard = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let mut owned: Vec<DecisionRecord> = guard
            .values()
            .filter(|record| &record.decision.owner_id == owner)
            .cloned()
            .collect();
        owned.sort_by(|left, right| {
            left.decision
                .created_at
                .cmp(&right.decision.created_at)
                .then_with(|| left.decision.id.cmp(&right.decision.id))
        });
        Ok(owned)
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryUserRepository {
    records: Arc<Mutex<HashMap<UserId, UserRecord>>>,
}

impl UserRepository for InMemoryUserRepository {
    fn insert(&self, record: UserRecord) -> Result<UserRecord, RepositoryError> {
        let mut guard = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        if guard
            .values()
            .any(|existing| existing.user.email == record.user.email)
        {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.user.id.clone(), record.clone());
        Ok(record)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError> {
        let guard = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard
            .values()
            .find(|record| record.user.email == email)
            .cloned())
    }

    fn fetch(&self, id: &UserId) -> Result<Option<UserRecord>, RepositoryError> {
        let guard = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.get(id).cloned())
    }
}

/// Criteria proposed for every decision, with their weights.
const TEMPLATE_CRITERIA: [(&str, f64); 4] = [
    ("Cost", 5.0),
    ("Quality", 4.0),
    ("Long-term value", 3.0),
    ("Effort", 2.0),
];

/// Offline stand-in for a language-model backend. Proposes a fixed set of
/// criteria and derives each value from a digest of the decision title, the
/// option, and the criterion, so the same request always yields the same
/// suggestion.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct TemplateSuggestionGenerator;

impl TemplateSuggestionGenerator {
    fn value_for(title: &str, option: &str, criterion: &str) -> f64 {
        let mut hasher = Sha256::new();
        hasher.update(title.trim().to_lowercase().as_bytes());
        hasher.update(b"|");
        hasher.update(option.trim().to_lowercase().as_bytes());
        hasher.update(b"|");
        hasher.update(criterion.to_lowercase().as_bytes());
        let digest = hasher.finalize();
        let bucket = u16::from_be_bytes([digest[0], digest[1]]) % 101;
        f64::from(bucket) / 10.0
    }
}

impl SuggestionGenerator for TemplateSuggestionGenerator {
    fn generate(&self, request: &SuggestionRequest) -> Result<AiSuggestion, SuggestionError> {
        let mut options: Vec<&str> = Vec::new();
        for name in request.options.iter().map(|name| name.trim()) {
            if !name.is_empty() && !options.iter().any(|seen| same_name(seen, name)) {
                options.push(name);
            }
        }
        if options.is_empty() {
            return Err(SuggestionError::NoOptions);
        }

        let criteria = TEMPLATE_CRITERIA
            .iter()
            .map(|(name, weight)| SuggestedCriterion {
                name: (*name).to_string(),
                weight: *weight,
            })
            .collect();

        let evaluations = options
            .iter()
            .flat_map(|option| {
                TEMPLATE_CRITERIA
                    .iter()
                    .map(move |(criterion, _)| SuggestedEvaluation {
                        option: (*option).to_string(),
                        criterion: (*criterion).to_string(),
                        value: Self::value_for(&request.decision_title, option, criterion),
                    })
            })
            .collect();

        Ok(AiSuggestion {
            criteria,
            evaluations,
        })
    }
}

pub(crate) type ServiceApi = DecisionApi<InMemoryDecisionRepository, InMemoryUserRepository>;

/// Wires the in-memory repositories and the template generator into the
/// state shared by the auth and decision routes.
pub(crate) fn in_memory_api(scoring: ScoringConfig) -> ServiceApi {
    let auth = Arc::new(AuthService::new(Arc::new(
        InMemoryUserRepository::default(),
    )));
    let decisions = Arc::new(DecisionService::new(
        Arc::new(InMemoryDecisionRepository::default()),
        scoring,
    ));
    DecisionApi {
        decisions,
        auth,
        generator: Arc::new(TemplateSuggestionGenerator),
    }
}
