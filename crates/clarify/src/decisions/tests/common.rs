use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::auth::{
    auth_router, AuthService, AuthSession, Registration, UserId, UserRecord, UserRepository,
};
use crate::decisions::domain::{
    Criterion, CriterionId, DecisionId, DecisionOption, Evaluation, OptionId, Weight,
};
use crate::decisions::repository::{DecisionRecord, DecisionRepository};
use crate::decisions::suggestion::{
    AiSuggestion, SuggestedCriterion, SuggestedEvaluation, SuggestionError, SuggestionGenerator,
    SuggestionRequest,
};
use crate::decisions::{decision_router, DecisionApi, DecisionService, ScoringConfig};
use crate::error::RepositoryError;

pub(super) fn owner() -> UserId {
    UserId("usr-test-owner".to_string())
}

pub(super) fn stranger() -> UserId {
    UserId("usr-test-stranger".to_string())
}

pub(super) fn at(offset_seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + offset_seconds, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn option(id: &str, name: &str, offset_seconds: i64) -> DecisionOption {
    DecisionOption {
        id: OptionId(id.to_string()),
        decision_id: DecisionId("dec-fixture".to_string()),
        name: name.to_string(),
        summary: None,
        created_at: at(offset_seconds),
    }
}

pub(super) fn criterion(id: &str, name: &str, weight: i64) -> Criterion {
    Criterion {
        id: CriterionId(id.to_string()),
        decision_id: DecisionId("dec-fixture".to_string()),
        name: name.to_string(),
        weight: Weight::new(weight).expect("weight in range"),
    }
}

pub(super) fn evaluation(option: &str, criterion: &str, value: f64) -> Evaluation {
    Evaluation {
        option_id: OptionId(option.to_string()),
        criterion_id: CriterionId(criterion.to_string()),
        value,
    }
}

/// Sedan {Price 8, Comfort 6} against SUV {Price 4, Comfort 9}, Price weighted 5
/// and Comfort 3.
pub(super) fn car_matrix() -> (Vec<DecisionOption>, Vec<Criterion>, Vec<Evaluation>) {
    let options = vec![option("opt-sedan", "Sedan", 0), option("opt-suv", "SUV", 1)];
    let criteria = vec![
        criterion("crit-price", "Price", 5),
        criterion("crit-comfort", "Comfort", 3),
    ];
    let evaluations = vec![
        evaluation("opt-sedan", "crit-price", 8.0),
        evaluation("opt-sedan", "crit-comfort", 6.0),
        evaluation("opt-suv", "crit-price", 4.0),
        evaluation("opt-suv", "crit-comfort", 9.0),
    ];
    (options, criteria, evaluations)
}

pub(super) fn car_suggestion() -> AiSuggestion {
    AiSuggestion {
        criteria: vec![
            SuggestedCriterion {
                name: "Price".to_string(),
                weight: 5.0,
            },
            SuggestedCriterion {
                name: "Comfort".to_string(),
                weight: 3.0,
            },
        ],
        evaluations: vec![
            suggested("Sedan", "Price", 8.0),
            suggested("Sedan", "Comfort", 6.0),
            suggested("SUV", "Price", 4.0),
            suggested("SUV", "Comfort", 9.0),
        ],
    }
}

pub(super) fn suggested(option: &str, criterion: &str, value: f64) -> SuggestedEvaluation {
    SuggestedEvaluation {
        option: option.to_string(),
        criterion: criterion.to_string(),
        value,
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryDecisions {
    pub(super) records: Arc<Mutex<Vec<DecisionRecord>>>,
}

impl DecisionRepository for MemoryDecisions {
    fn insert(&self, record: DecisionRecord) -> Result<DecisionRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard
            .iter()
            .any(|existing| existing.decision.id == record.decision.id)
        {
            return Err(RepositoryError::Conflict);
        }
        guard.push(record.clone());
        Ok(record)
    }

    fn update(&self, record: DecisionRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let slot = guard
            .iter_mut()
            .find(|existing| existing.decision.id == record.decision.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = record;
        Ok(())
    }

    fn fetch(&self, id: &DecisionId) -> Result<Option<DecisionRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.iter().find(|record| &record.decision.id == id).cloned())
    }

    fn owned_by(&self, owner: &UserId) -> Result<Vec<DecisionRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut owned: Vec<_> = guard
            .iter()
            .filter(|record| &record.decision.owner_id == owner)
            .cloned()
            .collect();
        owned.sort_by_key(|record| record.decision.created_at);
        Ok(owned)
    }
}

pub(super) struct UnavailableDecisions;

impl DecisionRepository for UnavailableDecisions {
    fn insert(&self, _record: DecisionRecord) -> Result<DecisionRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _record: DecisionRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &DecisionId) -> Result<Option<DecisionRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn owned_by(&self, _owner: &UserId) -> Result<Vec<DecisionRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryUsers {
    records: Mutex<Vec<UserRecord>>,
}

impl UserRepository for MemoryUsers {
    fn insert(&self, record: UserRecord) -> Result<UserRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("user mutex poisoned");
        if guard
            .iter()
            .any(|existing| existing.user.email == record.user.email)
        {
            return Err(RepositoryError::Conflict);
        }
        guard.push(record.clone());
        Ok(record)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError> {
        let guard = self.records.lock().expect("user mutex poisoned");
        Ok(guard.iter().find(|record| record.user.email == email).cloned())
    }

    fn fetch(&self, id: &UserId) -> Result<Option<UserRecord>, RepositoryError> {
        let guard = self.records.lock().expect("user mutex poisoned");
        Ok(guard.iter().find(|record| &record.user.id == id).cloned())
    }
}

/// Generator that always answers with the car suggestion.
pub(super) struct FixedGenerator;

impl SuggestionGenerator for FixedGenerator {
    fn generate(&self, _request: &SuggestionRequest) -> Result<AiSuggestion, SuggestionError> {
        Ok(car_suggestion())
    }
}

pub(super) fn build_service() -> (DecisionService<MemoryDecisions>, MemoryDecisions) {
    let repository = MemoryDecisions::default();
    let service = DecisionService::new(Arc::new(repository.clone()), ScoringConfig::default());
    (service, repository)
}

pub(super) struct TestApi {
    pub(super) router: axum::Router,
    pub(super) auth: Arc<AuthService<MemoryUsers>>,
}

impl TestApi {
    pub(super) fn register(&self, email: &str) -> AuthSession {
        self.auth
            .register(Registration {
                name: "Test User".to_string(),
                email: email.to_string(),
                password: "correct horse".to_string(),
            })
            .expect("registration succeeds")
    }
}

pub(super) fn build_api() -> TestApi {
    let auth = Arc::new(AuthService::new(Arc::new(MemoryUsers::default())));
    let decisions = Arc::new(DecisionService::new(
        Arc::new(MemoryDecisions::default()),
        ScoringConfig::default(),
    ));
    let router = auth_router(Arc::clone(&auth)).merge(decision_router(DecisionApi {
        decisions,
        auth: Arc::clone(&auth),
        generator: Arc::new(FixedGenerator),
    }));
    TestApi { router, auth }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
