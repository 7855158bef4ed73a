//! Authentication API endpoints
//!
//! - POST /api/signup - Create an account with email and password
//! - POST /api/auth/login - Credential login, sets the session cookie
//! - POST /api/auth/logout - Drop the session and its cookie
//! - GET /api/auth/session - Current user or `null`
//! - GET /api/auth/signin/{provider} - Start OAuth sign-in
//! - GET /api/auth/callback/{provider} - Finish OAuth sign-in

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
    Json,
};
use serde::Deserialize;

use crate::api::common::{build_cookie, expired_cookie, read_cookie, set_cookie_headers};
use crate::api::middleware::{
    extract_session_token, ApiError, ApiJson, AppState, CurrentUser, SESSION_COOKIE,
};
use crate::api::responses::{AuthResponse, SessionResponse};
use crate::models::Session;
use crate::services::oauth::new_state;
use crate::services::user::{LoginInput, SignupInput};
use crate::services::OAuthError;

/// Cookie holding the OAuth `state` between redirect and callback
const OAUTH_STATE_COOKIE: &str = "oauth_state";
const OAUTH_STATE_PATH: &str = "/api/auth";
const OAUTH_STATE_MAX_AGE: i64 = 10 * 60;

/// Request body for sign-up
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Request body for credential login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Query parameters the provider sends back to the callback
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

fn session_cookie(state: &AppState, session: &Session) -> String {
    build_cookie(
        SESSION_COOKIE,
        &session.id,
        "/",
        state.config.session.max_age_seconds(),
        state.config.session.cookie_secure,
    )
}

/// POST /api/signup - Create a user
///
/// Does not sign the user in.
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .user_service
        .signup(SignupInput::new(body.name, body.email, body.password))
        .await?;

    Ok((StatusCode::OK, Json(user)))
}

/// POST /api/auth/login - Credential login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, session) = state
        .user_service
        .login(LoginInput::new(body.email, body.password))
        .await?;

    let headers = set_cookie_headers(&[session_cookie(&state, &session)])?;

    Ok((
        headers,
        Json(AuthResponse {
            user,
            token: session.id,
        }),
    ))
}

/// POST /api/auth/logout - Invalidate the presented session
///
/// Always answers 204, with or without a valid session.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = extract_session_token(&headers) {
        if let Err(e) = state.user_service.logout(&token).await {
            tracing::warn!("Failed to delete session on logout: {}", e);
        }
    }

    let response_headers = set_cookie_headers(&[expired_cookie(SESSION_COOKIE, "/")])?;
    Ok((StatusCode::NO_CONTENT, response_headers))
}

/// GET /api/auth/session - The signed-in user, or `{ "user": null }`
pub async fn session(CurrentUser(user): CurrentUser) -> Json<SessionResponse> {
    Json(SessionResponse { user })
}

/// GET /api/auth/signin/{provider} - Redirect to the provider's consent screen
pub async fn oauth_signin(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let provider = state.oauth.get(&provider)?;

    let oauth_state = new_state();
    let headers = set_cookie_headers(&[build_cookie(
        OAUTH_STATE_COOKIE,
        &oauth_state,
        OAUTH_STATE_PATH,
        OAUTH_STATE_MAX_AGE,
        state.config.session.cookie_secure,
    )])?;

    Ok((headers, Redirect::to(&provider.authorize_url(&oauth_state))))
}

/// GET /api/auth/callback/{provider} - Complete sign-in and start a session
pub async fn oauth_callback(
    State(state): State<AppState>,
    Path(provider_name): Path<String>,
    Query(query): Query<CallbackQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let provider = state.oauth.get(&provider_name)?;

    if let Some(error) = query.error {
        tracing::info!(provider = %provider_name, "OAuth sign-in declined: {}", error);
        return Err(ApiError::validation_error(format!("Sign-in failed: {}", error)));
    }

    let expected = read_cookie(&headers, OAUTH_STATE_COOKIE);
    match (expected.as_deref(), query.state.as_deref()) {
        (Some(expected), Some(actual)) if !expected.is_empty() && expected == actual => {}
        _ => return Err(OAuthError::StateMismatch.into()),
    }

    let code = query
        .code
        .ok_or_else(|| ApiError::validation_error("Missing authorization code"))?;

    let profile = provider.exchange_code(&code).await?;
    let (user, session) = state
        .user_service
        .sign_in_with_oauth(provider.name(), profile)
        .await?;
    tracing::info!(user_id = user.id, provider = %provider_name, "OAuth sign-in");

    let headers = set_cookie_headers(&[
        session_cookie(&state, &session),
        expired_cookie(OAUTH_STATE_COOKIE, OAUTH_STATE_PATH),
    ])?;

    Ok((
        headers,
        Redirect::to(&state.config.oauth.redirect_after_login),
    ))
}
