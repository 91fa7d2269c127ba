//! API middleware
//!
//! Shared application state, the JSON error body, and session resolution
//! from the `token` cookie.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::User;
use crate::services::{MutationError, MutationService};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "token";

/// One year, the session cookie lifetime
pub const SESSION_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 365;

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: crate::db::DynDatabasePool,
    pub mutations: Arc<MutationService>,
}

/// User resolved from the session cookie
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "SERVICE_UNAVAILABLE" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

impl From<MutationError> for ApiError {
    fn from(err: MutationError) -> Self {
        let message = err.to_string();
        match err {
            MutationError::UserNotFound(email) => {
                ApiError::with_details("NOT_FOUND", message, serde_json::json!({ "email": email }))
            }
            MutationError::ItemNotFound(id) => {
                ApiError::with_details("NOT_FOUND", message, serde_json::json!({ "id": id }))
            }
            MutationError::InvalidPassword => ApiError::unauthorized(message),
            MutationError::PasswordMismatch
            | MutationError::InvalidResetToken
            | MutationError::Validation(_) => ApiError::validation_error(message),
            MutationError::UserExists(_) => ApiError::conflict(message),
            MutationError::Internal(e) => {
                tracing::error!("Mutation failed: {:#}", e);
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

/// Extract the session token from the cookie header, falling back to a
/// bearer token
fn extract_session_token(request: &Request) -> Option<String> {
    if let Some(cookie_header) = request.headers().get(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                if let Some(token) = cookie
                    .trim()
                    .strip_prefix(SESSION_COOKIE)
                    .and_then(|rest| rest.strip_prefix('='))
                {
                    if !token.is_empty() {
                        return Some(token.to_string());
                    }
                }
            }
        }
    }

    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Attach the session user to the request when a valid token is present.
///
/// Missing or invalid tokens are ignored.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_session_token(&request) {
        match state.mutations.current_user(&token).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(AuthenticatedUser(user));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Session lookup failed: {}", e),
        }
    }
    next.run(request).await
}

/// `Set-Cookie` value carrying a session token
pub fn session_cookie(token: &str) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, SESSION_MAX_AGE_SECS
    )
}

/// `Set-Cookie` value that removes the session cookie
pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with(name: header::HeaderName, value: &str) -> Request {
        axum::http::Request::builder()
            .header(name, value)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_extract_token_from_cookie() {
        let request = request_with(header::COOKIE, "theme=dark; token=abc.def.ghi");
        assert_eq!(extract_session_token(&request).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_extract_ignores_similarly_named_cookie() {
        let request = request_with(header::COOKIE, "tokenizer=1; other=2");
        assert_eq!(extract_session_token(&request), None);
    }

    #[test]
    fn test_extract_token_from_bearer() {
        let request = request_with(header::AUTHORIZATION, "Bearer xyz");
        assert_eq!(extract_session_token(&request).as_deref(), Some("xyz"));
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("abc");
        assert!(cookie.starts_with("token=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=31536000"));

        assert!(clear_session_cookie().contains("Max-Age=0"));
    }

    #[test]
    fn test_mutation_errors_map_to_status() {
        let cases = [
            (MutationError::UserNotFound("a@b.c".into()), StatusCode::NOT_FOUND),
            (MutationError::ItemNotFound(3), StatusCode::NOT_FOUND),
            (MutationError::InvalidPassword, StatusCode::UNAUTHORIZED),
            (MutationError::PasswordMismatch, StatusCode::BAD_REQUEST),
            (MutationError::InvalidResetToken, StatusCode::BAD_REQUEST),
            (MutationError::UserExists("a@b.c".into()), StatusCode::CONFLICT),
            (
                MutationError::Internal(anyhow::anyhow!("db down")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), status);
        }
    }

    #[test]
    fn test_invalid_reset_token_message() {
        let api: ApiError = MutationError::InvalidResetToken.into();
        assert_eq!(api.error.message, "This token is either expired or invalid");
        assert_eq!(api.error.code, "VALIDATION_ERROR");
    }
}
