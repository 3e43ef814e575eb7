use std::io::Cursor;
use std::sync::{Arc, Mutex};

use clarify::auth::{
    auth_router, AuthService, AuthSession, UserId, UserRecord, UserRepository,
};
use clarify::client::{ApiClient, ClientConfig, ClientError, DecisionWorkspace, SessionStore};
use clarify::decisions::{
    decision_router, AiSuggestion, DecisionApi, DecisionId, DecisionRecord, DecisionRepository,
    DecisionService, MatrixImporter, RiskLevel, ScoringConfig, ScoringEngine, SuggestedCriterion,
    SuggestedEvaluation, SuggestionError, SuggestionGenerator, SuggestionRequest,
};
use clarify::error::{ErrorKind, RepositoryError};

#[derive(Default)]
struct Decisions {
    records: Mutex<Vec<DecisionRecord>>,
}

impl DecisionRepository for Decisions {
    fn insert(&self, record: DecisionRecord) -> Result<DecisionRecord, RepositoryError> {
        self.records
            .lock()
            .expect("decision mutex poisoned")
            .push(record.clone());
        Ok(record)
    }

    fn update(&self, record: DecisionRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("decision mutex poisoned");
        let slot = guard
            .iter_mut()
            .find(|existing| existing.decision.id == record.decision.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = record;
        Ok(())
    }

    fn fetch(&self, id: &DecisionId) -> Result<Option<DecisionRecord>, RepositoryError> {
        let guard = self.records.lock().expect("decision mutex poisoned");
        Ok(guard.iter().find(|record| &record.decision.id == id).cloned())
    }

    fn owned_by(&self, owner: &UserId) -> Result<Vec<DecisionRecord>, RepositoryError> {
        let guard = self.records.lock().expect("decision mutex poisoned");
        Ok(guard
            .iter()
            .filter(|record| &record.decision.owner_id == owner)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct Users {
    records: Mutex<Vec<UserRecord>>,
}

impl UserRepository for Users {
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

/// Rates every option 7 on a single "Fit" criterion.
struct FlatGenerator;

impl SuggestionGenerator for FlatGenerator {
    fn generate(&self, request: &SuggestionRequest) -> Result<AiSuggestion, SuggestionError> {
        Ok(AiSuggestion {
            criteria: vec![SuggestedCriterion {
                name: "Fit".to_string(),
                weight: 2.0,
            }],
            evaluations: request
                .options
                .iter()
                .map(|option| SuggestedEvaluation {
                    option: option.clone(),
                    criterion: "Fit".to_string(),
                    value: 7.0,
                })
                .collect(),
        })
    }
}

async fn spawn_api() -> String {
    let auth = Arc::new(AuthService::new(Arc::new(Users::default())));
    let api = DecisionApi {
        decisions: Arc::new(DecisionService::new(
            Arc::new(Decisions::default()),
            ScoringConfig::default(),
        )),
        auth: Arc::clone(&auth),
        generator: Arc::new(FlatGenerator),
    };
    let router =
        axum::Router::new().nest("/api", auth_router(auth).merge(decision_router(api)));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server runs");
    });
    format!("http://{addr}/api")
}

async fn signed_in_client(base_url: &str, email: &str) -> (ApiClient, SessionStore) {
    let session = SessionStore::new();
    let api = ApiClient::new(
        ClientConfig::default().with_base_url(base_url),
        Arc::new(session.clone()),
    )
    .expect("client builds");
    let auth = api
        .register("Test User", email, "correct horse battery")
        .await
        .expect("registered");
    session.set_auth(auth);
    (api, session)
}

#[tokio::test]
async fn car_decision_is_scored_over_http() {
    let base_url = spawn_api().await;
    let (api, _session) = signed_in_client(&base_url, "ada@example.com").await;

    let decision = api
        .create_decision("Buy a car", None)
        .await
        .expect("created");
    let mut workspace = DecisionWorkspace::open(api.clone(), &decision.id)
        .await
        .expect("opened");

    let sedan = workspace.add_option("Sedan", None).await.expect("sedan");
    let suv = workspace.add_option("SUV", None).await.expect("suv");
    let price = workspace.add_criterion("Price", 5).await.expect("price");
    let comfort = workspace.add_criterion("Comfort", 3).await.expect("comfort");
    for (option, criterion, value) in [
        (&sedan.id, &price.id, 8.0),
        (&sedan.id, &comfort.id, 6.0),
        (&suv.id, &price.id, 4.0),
        (&suv.id, &comfort.id, 9.0),
    ] {
        workspace
            .record_evaluation(option, criterion, value)
            .await
            .expect("evaluation stored");
    }
    assert_eq!(workspace.detail().options.len(), 2);

    let result = workspace.analyze().await.expect("analysis").clone();
    assert_eq!(result.recommended.name, "Sedan");
    assert_eq!(result.results[0].weighted_total, 58.0);
    assert_eq!(result.results[0].score, 72.5);
    assert_eq!(result.results[0].confidence, 90);
    assert_eq!(result.results[0].risk, RiskLevel::Low);
    assert_eq!(result.results[1].score, 58.8);
    assert_eq!(result.results[1].confidence, 76);
    assert_eq!(result.results[1].risk, RiskLevel::Medium);

    workspace
        .add_criterion("Safety", 1)
        .await
        .expect("safety added");
    assert!(workspace.analysis().is_none());
    let result = workspace.analyze().await.expect("analysis");
    assert_eq!(result.results[0].score, 70.0);
    assert_eq!(result.results[1].score, 57.8);
    assert_eq!(result.results[0].confidence, 80);

    let err = workspace
        .add_criterion("price", 2)
        .await
        .expect_err("duplicate criterion");
    assert_eq!(err.code(), Some("duplicate_criterion"));
}

#[tokio::test]
async fn ai_flow_fills_an_empty_decision() {
    let base_url = spawn_api().await;
    let (api, _session) = signed_in_client(&base_url, "grace@example.com").await;

    let decision = api
        .create_decision("Pick a framework", Some("New service"))
        .await
        .expect("created");
    let mut workspace = DecisionWorkspace::open(api, &decision.id)
        .await
        .expect("opened");

    let err = workspace.generate_with_ai().await.expect_err("no options yet");
    assert_eq!(err.kind(), ErrorKind::Domain);
    assert_eq!(err.code(), Some("no_options"));

    workspace.add_option("Axum", None).await.expect("option");
    workspace.add_option("Actix", None).await.expect("option");

    let result = workspace.generate_with_ai().await.expect("flow completes");
    assert_eq!(result.results.len(), 2);
    assert_eq!(result.results[0].score, 70.0);
    assert_eq!(result.recommended.name, "Axum");

    assert_eq!(workspace.detail().criteria.len(), 1);
    assert_eq!(workspace.detail().criteria[0].name, "Fit");
}

#[tokio::test]
async fn decisions_stay_private_and_logout_revokes_the_token() {
    let base_url = spawn_api().await;
    let (owner, owner_session) = signed_in_client(&base_url, "owner@example.com").await;
    let (other, _other_session) = signed_in_client(&base_url, "other@example.com").await;

    let decision = owner
        .create_decision("Private", None)
        .await
        .expect("created");

    let err = other
        .get_decision(&decision.id)
        .await
        .expect_err("hidden from other users");
    assert!(matches!(
        err,
        ClientError::Validation {
            status: Some(404),
            ..
        }
    ));
    assert!(other.list_decisions().await.expect("listed").is_empty());

    let token = owner_session.token().expect("token");
    owner.logout().await.expect("logged out");

    let stale = SessionStore::new();
    stale.set_auth(AuthSession {
        user: owner_session.user().expect("user"),
        token,
    });
    let replay = ApiClient::new(
        ClientConfig::default().with_base_url(&base_url),
        Arc::new(stale.clone()),
    )
    .expect("client builds");
    let err = replay.list_decisions().await.expect_err("token revoked");
    assert_eq!(err.kind(), ErrorKind::Auth);
    assert!(!stale.is_authenticated());
}

#[test]
fn matrix_import_matches_the_service_ranking() {
    let csv = "Option,Criterion,Weight,Value\n\
               Sedan,Price,5,8\n\
               Sedan,Comfort,3,6\n\
               Sedan,Safety,1,\n\
               SUV,Price,5,4\n\
               SUV,Comfort,3,9\n\
               SUV,Safety,1,\n";
    let matrix = MatrixImporter::from_reader(Cursor::new(csv)).expect("imports");
    assert_eq!(matrix.options.len(), 2);
    assert_eq!(matrix.criteria.len(), 3);
    assert_eq!(matrix.evaluations.len(), 4);

    let result = ScoringEngine::default()
        .analyze(matrix.scoring_input())
        .expect("scored");
    assert_eq!(result.recommended.name, "Sedan");
    assert_eq!(result.results[0].score, 70.0);
    assert_eq!(result.results[1].score, 57.8);
}
