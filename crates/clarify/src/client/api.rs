use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use super::config::{AuthFailurePolicy, ClientConfig};
use super::error::ClientError;
use super::inflight::{InFlight, InFlightGuard};
use super::session::TokenProvider;
use crate::auth::AuthSession;
use crate::decisions::domain::{non_blank, validate_value};
use crate::decisions::{
    AiSuggestion, AnalysisResult, AppliedSuggestion, Criterion, CriterionId, Decision,
    DecisionDetail, DecisionId, DecisionInputError, DecisionList, DecisionOption, Evaluation,
    OptionId, SuggestionError, SuggestionRequest, SuggestionResponse, Weight,
};
use crate::error::{ErrorBody, ErrorKind};

/// Thin async client for the decision API.
///
/// One call is one request: nothing is cached and nothing is retried. Input
/// that can be checked locally is rejected before a request is sent, and
/// mutating calls refuse to run while an identical call is still pending.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    config: ClientConfig,
    tokens: Arc<dyn TokenProvider>,
    in_flight: InFlight,
}

impl ApiClient {
    pub fn new(config: ClientConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| ClientError::Network {
                message: format!("failed to create HTTP client: {err}"),
            })?;

        Ok(Self {
            http,
            config,
            tokens,
            in_flight: InFlight::default(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, ClientError> {
        if name.trim().is_empty() || email.trim().is_empty() {
            return Err(ClientError::local(
                "invalid_registration",
                "name and email are required",
            ));
        }
        let body = json!({"name": name.trim(), "email": email.trim(), "password": password});
        self.call(Method::POST, "/auth/register", Some(&body)).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, ClientError> {
        let body = json!({"email": email.trim(), "password": password});
        self.call(Method::POST, "/auth/login", Some(&body)).await
    }

    /// Revokes the current token on the server. The caller clears its session.
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.dispatch(Method::POST, "/auth/logout", None::<&()>)
            .await
            .map(drop)
    }

    /// Every decision the signed-in user owns, oldest first.
    pub async fn list_decisions(&self) -> Result<Vec<Decision>, ClientError> {
        let list: DecisionList = self.call(Method::GET, "/decisions", None::<&()>).await?;
        Ok(list.decisions)
    }

    pub async fn create_decision(
        &self,
        title: &str,
        description: Option<&str>,
    ) -> Result<Decision, ClientError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(DecisionInputError::EmptyTitle.into());
        }
        let body = json!({
            "title": title,
            "description": non_blank(description.map(str::to_string)),
        });
        self.call(Method::POST, "/decisions", Some(&body)).await
    }

    /// Decision with its options and criteria. Evaluations and results are
    /// not part of this view.
    pub async fn get_decision(&self, id: &DecisionId) -> Result<DecisionDetail, ClientError> {
        self.call(Method::GET, &format!("/decisions/{}", id.0), None::<&()>)
            .await
    }

    pub async fn add_option(
        &self,
        decision: &DecisionId,
        name: &str,
        summary: Option<&str>,
    ) -> Result<DecisionOption, ClientError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DecisionInputError::EmptyOptionName.into());
        }
        let body = json!({
            "name": name,
            "summary": non_blank(summary.map(str::to_string)),
        });
        self.call(
            Method::POST,
            &format!("/decisions/{}/options", decision.0),
            Some(&body),
        )
        .await
    }

    pub async fn add_criterion(
        &self,
        decision: &DecisionId,
        name: &str,
        weight: i64,
    ) -> Result<Criterion, ClientError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DecisionInputError::EmptyCriterionName.into());
        }
        let weight = Weight::new(weight)?;
        let body = json!({"name": name, "weight": weight.get()});
        self.call(
            Method::POST,
            &format!("/decisions/{}/criteria", decision.0),
            Some(&body),
        )
        .await
    }

    pub async fn record_evaluation(
        &self,
        decision: &DecisionId,
        option: &OptionId,
        criterion: &CriterionId,
        value: f64,
    ) -> Result<Evaluation, ClientError> {
        let evaluation = Evaluation {
            option_id: option.clone(),
            criterion_id: criterion.clone(),
            value: validate_value(value)?,
        };
        self.call(
            Method::PUT,
            &format!("/decisions/{}/evaluations", decision.0),
            Some(&evaluation),
        )
        .await
    }

    /// Asks the generator for criteria and evaluations. The output is
    /// returned unvalidated; see [`SuggestionValidator`](crate::decisions::SuggestionValidator).
    pub async fn suggest(&self, request: &SuggestionRequest) -> Result<AiSuggestion, ClientError> {
        if request.options.iter().all(|name| name.trim().is_empty()) {
            return Err(SuggestionError::NoOptions.into());
        }
        let response: SuggestionResponse =
            self.call(Method::POST, "/ai/suggest", Some(request)).await?;
        Ok(response.generated)
    }

    pub async fn apply_ai_suggestion(
        &self,
        decision: &DecisionId,
        suggestion: &AiSuggestion,
    ) -> Result<AppliedSuggestion, ClientError> {
        if suggestion.is_empty() {
            return Err(SuggestionError::Empty.into());
        }
        self.call(
            Method::POST,
            &format!("/decisions/{}/apply-ai", decision.0),
            Some(suggestion),
        )
        .await
    }

    pub async fn run_analysis(&self, decision: &DecisionId) -> Result<AnalysisResult, ClientError> {
        self.call(
            Method::POST,
            &format!("/decisions/{}/analyze", decision.0),
            None::<&()>,
        )
        .await
    }

    async fn call<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let (response, _slot) = self.dispatch(method, path, body).await?;
        response
            .json::<T>()
            .await
            .map_err(|err| ClientError::UnexpectedResponse {
                message: format!("invalid response body from {path}: {err}"),
            })
    }

    /// Sends the request and maps error statuses. The returned guard holds the
    /// in-flight slot of a mutating call until the caller has read the body.
    async fn dispatch<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<(Response, Option<InFlightGuard>), ClientError>
    where
        B: Serialize + ?Sized,
    {
        let slot = if method == Method::GET {
            None
        } else {
            Some(self.in_flight.acquire(format!("{method} {path}"))?)
        };

        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        let token = self.tokens.token();

        let mut request = self.http.request(method.clone(), &url);
        if let Some(token) = token.as_deref() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!(%method, path, authenticated = token.is_some(), "sending request");
        let response = request.send().await.map_err(|err| {
            if err.is_timeout() {
                ClientError::Timeout {
                    timeout_ms: self.config.timeout_ms,
                }
            } else {
                ClientError::Network {
                    message: err.to_string(),
                }
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok((response, slot));
        }

        let text = response.text().await.unwrap_or_default();
        let error = self.status_error(status, &text, token.as_deref());
        warn!(%method, path, status = status.as_u16(), kind = %error.kind(), "request failed");
        Err(error)
    }

    fn status_error(&self, status: StatusCode, text: &str, sent_token: Option<&str>) -> ClientError {
        let body = serde_json::from_str::<ErrorBody>(text).ok();
        let message = body
            .as_ref()
            .map(|body| body.message.clone())
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| fallback_message(status, text));
        let code = body.as_ref().and_then(|body| body.code.clone());

        if status == StatusCode::UNAUTHORIZED {
            if let Some(rejected) = sent_token {
                if self.config.auth_failure == AuthFailurePolicy::ClearSession {
                    self.tokens.invalidate(rejected);
                }
            }
            return ClientError::Auth { message };
        }
        if status.is_server_error() {
            return ClientError::Server {
                status: status.as_u16(),
                message,
            };
        }
        if body.as_ref().and_then(|body| body.kind) == Some(ErrorKind::Domain) {
            return ClientError::Domain {
                code: code.unwrap_or_else(|| "domain".to_string()),
                message,
            };
        }
        if status.is_client_error() {
            return ClientError::Validation {
                status: Some(status.as_u16()),
                code,
                message,
            };
        }
        ClientError::UnexpectedResponse {
            message: format!("status {status}: {message}"),
        }
    }
}

fn fallback_message(status: StatusCode, text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        text.to_string()
    }
}
