//! Authentication API endpoints
//!
//! - POST /api/v1/auth/signup - Create an account and sign in
//! - POST /api/v1/auth/signin - Sign in
//! - POST /api/v1/auth/signout - Drop the session cookie
//! - POST /api/v1/auth/request-reset - Mail a password reset link
//! - POST /api/v1/auth/reset-password - Redeem a reset token
//! - GET /api/v1/auth/me - Current user, or null

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{
    clear_session_cookie, session_cookie, ApiError, AppState, AuthenticatedUser,
};
use crate::models::{ResetPasswordInput, SigninInput, SignupInput, User};
use crate::services::{AuthPayload, Message};

/// Request body for a reset request
#[derive(Debug, Deserialize)]
pub struct RequestResetRequest {
    pub email: String,
}

/// Build the auth router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/signin", post(signin))
        .route("/signout", post(signout))
        .route("/request-reset", post(request_reset))
        .route("/reset-password", post(reset_password))
        .route("/me", get(me))
}

fn cookie_headers(cookie: &str) -> Result<HeaderMap, ApiError> {
    let value = HeaderValue::from_str(cookie)
        .map_err(|e| ApiError::internal_error(format!("Invalid cookie header: {}", e)))?;
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, value);
    Ok(headers)
}

fn signed_in(payload: AuthPayload) -> Result<(HeaderMap, Json<User>), ApiError> {
    let headers = cookie_headers(&session_cookie(&payload.token))?;
    Ok((headers, Json(payload.user)))
}

/// POST /api/v1/auth/signup
async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupInput>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = state.mutations.signup(body).await?;
    Ok((StatusCode::CREATED, signed_in(payload)?))
}

/// POST /api/v1/auth/signin
async fn signin(
    State(state): State<AppState>,
    Json(body): Json<SigninInput>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = state.mutations.signin(body).await?;
    signed_in(payload)
}

/// POST /api/v1/auth/signout
async fn signout(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let headers = cookie_headers(&clear_session_cookie())?;
    Ok((headers, Json(state.mutations.signout())))
}

/// POST /api/v1/auth/request-reset
async fn request_reset(
    State(state): State<AppState>,
    Json(body): Json<RequestResetRequest>,
) -> Result<Json<Message>, ApiError> {
    let ack = state.mutations.request_reset(&body.email).await?;
    Ok(Json(ack))
}

/// POST /api/v1/auth/reset-password
async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordInput>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = state.mutations.reset_password(body).await?;
    signed_in(payload)
}

/// GET /api/v1/auth/me
async fn me(user: Option<Extension<AuthenticatedUser>>) -> Json<Option<User>> {
    Json(user.map(|Extension(AuthenticatedUser(user))| user))
}
