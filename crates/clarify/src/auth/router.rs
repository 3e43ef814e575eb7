use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};

use super::domain::{AuthSession, Credentials, Registration, User};
use super::repository::UserRepository;
use super::service::{AuthError, AuthService};
use crate::error::ApiError;

/// Router builder exposing registration, login, and logout.
pub fn auth_router<U>(service: Arc<AuthService<U>>) -> Router
where
    U: UserRepository + 'static,
{
    Router::new()
        .route("/auth/register", post(register_handler::<U>))
        .route("/auth/login", post(login_handler::<U>))
        .route("/auth/logout", post(logout_handler::<U>))
        .with_state(service)
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Resolves the caller of a protected route or produces the 401 response.
pub(crate) fn require_user<U>(service: &AuthService<U>, headers: &HeaderMap) -> Result<User, ApiError>
where
    U: UserRepository + 'static,
{
    let token = bearer_token(headers).ok_or(AuthError::InvalidToken)?;
    Ok(service.authenticate(token)?)
}

pub(crate) async fn register_handler<U>(
    State(service): State<Arc<AuthService<U>>>,
    body: Result<Json<Registration>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthSession>), ApiError>
where
    U: UserRepository + 'static,
{
    let Json(registration) = body?;
    let session = service.register(registration)?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub(crate) async fn login_handler<U>(
    State(service): State<Arc<AuthService<U>>>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<AuthSession>, ApiError>
where
    U: UserRepository + 'static,
{
    let Json(credentials) = body?;
    Ok(Json(service.login(credentials)?))
}

pub(crate) async fn logout_handler<U>(
    State(service): State<Arc<AuthService<U>>>,
    headers: HeaderMap,
) -> Response
where
    U: UserRepository + 'static,
{
    if let Some(token) = bearer_token(&headers) {
        service.logout(token);
    }
    StatusCode::NO_CONTENT.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_parses_scheme_case_insensitively() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("bearer abc123"),
        );
        assert_eq!(bearer_token(&headers), Some("abc123"));
    }

    #[test]
    fn bearer_token_rejects_other_schemes_and_blanks() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
