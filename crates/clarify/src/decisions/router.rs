use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use tracing::warn;

use super::domain::{
    AnalysisResult, Criterion, Decision, DecisionDetail, DecisionId, DecisionList,
    DecisionOption, Evaluation, NewCriterion, NewDecision, NewOption,
};
use super::repository::DecisionRepository;
use super::service::{DecisionService, DecisionServiceError};
use super::suggestion::{
    AiSuggestion, AppliedSuggestion, SuggestionError, SuggestionGenerator, SuggestionRequest,
    SuggestionResponse,
};
use crate::auth::router::require_user;
use crate::auth::{AuthService, UserRepository};
use crate::error::ApiError;

/// Shared state behind the decision routes.
pub struct DecisionApi<R, U> {
    pub decisions: Arc<DecisionService<R>>,
    pub auth: Arc<AuthService<U>>,
    pub generator: Arc<dyn SuggestionGenerator>,
}

impl<R, U> Clone for DecisionApi<R, U> {
    fn clone(&self) -> Self {
        Self {
            decisions: Arc::clone(&self.decisions),
            auth: Arc::clone(&self.auth),
            generator: Arc::clone(&self.generator),
        }
    }
}

/// Router builder exposing decision management, AI suggestions, and analysis.
/// Every route requires a bearer token.
pub fn decision_router<R, U>(state: DecisionApi<R, U>) -> Router
where
    R: DecisionRepository + 'static,
    U: UserRepository + 'static,
{
    Router::new()
        .route(
            "/decisions",
            get(list_handler::<R, U>).post(create_handler::<R, U>),
        )
        .route("/decisions/:decision_id", get(detail_handler::<R, U>))
        .route(
            "/decisions/:decision_id/options",
            post(add_option_handler::<R, U>),
        )
        .route(
            "/decisions/:decision_id/criteria",
            post(add_criterion_handler::<R, U>),
        )
        .route(
            "/decisions/:decision_id/evaluations",
            put(record_evaluation_handler::<R, U>),
        )
        .route(
            "/decisions/:decision_id/apply-ai",
            post(apply_ai_handler::<R, U>),
        )
        .route(
            "/decisions/:decision_id/analyze",
            post(analyze_handler::<R, U>),
        )
        .route("/ai/suggest", post(suggest_handler::<R, U>))
        .with_state(state)
}

pub(crate) async fn list_handler<R, U>(
    State(state): State<DecisionApi<R, U>>,
    headers: HeaderMap,
) -> Result<Json<DecisionList>, ApiError>
where
    R: DecisionRepository + 'static,
    U: UserRepository + 'static,
{
    let user = require_user(&state.auth, &headers)?;
    let decisions = state.decisions.list(&user.id)?;
    Ok(Json(DecisionList { decisions }))
}

pub(crate) async fn create_handler<R, U>(
    State(state): State<DecisionApi<R, U>>,
    headers: HeaderMap,
    body: Result<Json<NewDecision>, JsonRejection>,
) -> Result<(StatusCode, Json<Decision>), ApiError>
where
    R: DecisionRepository + 'static,
    U: UserRepository + 'static,
{
    let user = require_user(&state.auth, &headers)?;
    let Json(request) = body?;
    let decision = state.decisions.create(&user.id, request)?;
    Ok((StatusCode::CREATED, Json(decision)))
}

pub(crate) async fn detail_handler<R, U>(
    State(state): State<DecisionApi<R, U>>,
    headers: HeaderMap,
    Path(decision_id): Path<String>,
) -> Result<Json<DecisionDetail>, ApiError>
where
    R: DecisionRepository + 'static,
    U: UserRepository + 'static,
{
    let user = require_user(&state.auth, &headers)?;
    let detail = state.decisions.get(&user.id, &DecisionId(decision_id))?;
    Ok(Json(detail))
}

pub(crate) async fn add_option_handler<R, U>(
    State(state): State<DecisionApi<R, U>>,
    headers: HeaderMap,
    Path(decision_id): Path<String>,
    body: Result<Json<NewOption>, JsonRejection>,
) -> Result<(StatusCode, Json<DecisionOption>), ApiError>
where
    R: DecisionRepository + 'static,
    U: UserRepository + 'static,
{
    let user = require_user(&state.auth, &headers)?;
    let Json(request) = body?;
    let option = state
        .decisions
        .add_option(&user.id, &DecisionId(decision_id), request)?;
    Ok((StatusCode::CREATED, Json(option)))
}

pub(crate) async fn add_criterion_handler<R, U>(
    State(state): State<DecisionApi<R, U>>,
    headers: HeaderMap,
    Path(decision_id): Path<String>,
    body: Result<Json<NewCriterion>, JsonRejection>,
) -> Result<(StatusCode, Json<Criterion>), ApiError>
where
    R: DecisionRepository + 'static,
    U: UserRepository + 'static,
{
    let user = require_user(&state.auth, &headers)?;
    let Json(request) = body?;
    let criterion = state
        .decisions
        .add_criterion(&user.id, &DecisionId(decision_id), request)?;
    Ok((StatusCode::CREATED, Json(criterion)))
}

pub(crate) async fn record_evaluation_handler<R, U>(
    State(state): State<DecisionApi<R, U>>,
    headers: HeaderMap,
    Path(decision_id): Path<String>,
    body: Result<Json<Evaluation>, JsonRejection>,
) -> Result<Json<Evaluation>, ApiError>
where
    R: DecisionRepository + 'static,
    U: UserRepository + 'static,
{
    let user = require_user(&state.auth, &headers)?;
    let Json(evaluation) = body?;
    let stored = state
        .decisions
        .record_evaluation(&user.id, &DecisionId(decision_id), evaluation)?;
    Ok(Json(stored))
}

pub(crate) async fn apply_ai_handler<R, U>(
    State(state): State<DecisionApi<R, U>>,
    headers: HeaderMap,
    Path(decision_id): Path<String>,
    body: Result<Json<AiSuggestion>, JsonRejection>,
) -> Result<Json<AppliedSuggestion>, ApiError>
where
    R: DecisionRepository + 'static,
    U: UserRepository + 'static,
{
    let user = require_user(&state.auth, &headers)?;
    let Json(suggestion) = body?;
    let decision_id = DecisionId(decision_id);
    let applied = state
        .decisions
        .apply_suggestion(&user.id, &decision_id, &suggestion)
        .map_err(|err| {
            if let DecisionServiceError::Suggestion(reason) = &err {
                warn!(
                    decision_id = %decision_id,
                    code = reason.code(),
                    "rejected generated suggestion"
                );
            }
            err
        })?;
    Ok(Json(applied))
}

pub(crate) async fn analyze_handler<R, U>(
    State(state): State<DecisionApi<R, U>>,
    headers: HeaderMap,
    Path(decision_id): Path<String>,
) -> Result<Json<AnalysisResult>, ApiError>
where
    R: DecisionRepository + 'static,
    U: UserRepository + 'static,
{
    let user = require_user(&state.auth, &headers)?;
    let result = state.decisions.analyze(&user.id, &DecisionId(decision_id))?;
    Ok(Json(result))
}

pub(crate) async fn suggest_handler<R, U>(
    State(state): State<DecisionApi<R, U>>,
    headers: HeaderMap,
    body: Result<Json<SuggestionRequest>, JsonRejection>,
) -> Result<Json<SuggestionResponse>, ApiError>
where
    R: DecisionRepository + 'static,
    U: UserRepository + 'static,
{
    require_user(&state.auth, &headers)?;
    let Json(request) = body?;
    if request.options.iter().all(|name| name.trim().is_empty()) {
        return Err(DecisionServiceError::from(SuggestionError::NoOptions).into());
    }
    let generated = state
        .generator
        .generate(&request)
        .map_err(DecisionServiceError::from)?;
    Ok(Json(SuggestionResponse { generated }))
}
