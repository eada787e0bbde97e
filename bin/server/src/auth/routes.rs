//! Authentication routes for login, callback, profile, and logout.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use iag_platform_access::{Identity, TokenError};
use oauth2::CsrfToken;
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use time::Duration as TimeDuration;
use tracing::{debug, info};

use super::{
    AppState,
    guard::CurrentIdentity,
    oauth::{ExchangeError, UserInfoError},
};

/// Auth state cookie name (for CSRF protection during the OAuth flow).
const STATE_COOKIE: &str = "oauth_state";

/// Random bytes in a CSRF state value.
const STATE_BYTES: u32 = 32;

/// Query parameters for the OAuth callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    state: Option<String>,
    code: Option<String>,
}

/// Body returned after a successful login.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Session token to present as `Authorization: Bearer <token>`.
    pub token: String,
    /// The identity the token was issued for.
    pub user: Identity,
}

/// Initiates the OAuth login flow by redirecting to the identity provider.
pub async fn login(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    let csrf = CsrfToken::new_random_len(STATE_BYTES);
    let auth_url = state.provider.authorization_url(csrf.secret());

    // Store the state in a cookie for validation on callback
    let cookie = Cookie::build((STATE_COOKIE, csrf.secret().clone()))
        .path("/")
        .http_only(true)
        .secure(state.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::minutes(5));

    (jar.add(cookie), Redirect::temporary(&auth_url))
}

/// Handles the OAuth callback after the user authenticates with the provider.
///
/// The state cookie is cleared whatever the outcome.
pub async fn callback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> (CookieJar, Result<Json<LoginResponse>, CallbackError>) {
    let expected_state = jar.get(STATE_COOKIE).map(|c| c.value().to_string());

    let remove_state = Cookie::build((STATE_COOKIE, ""))
        .path("/")
        .max_age(TimeDuration::ZERO);
    let jar = jar.add(remove_state);

    let result = complete_login(&state, query, expected_state).await;
    (jar, result.map(Json))
}

async fn complete_login(
    state: &AppState,
    query: CallbackQuery,
    expected_state: Option<String>,
) -> Result<LoginResponse, CallbackError> {
    let expected_state = expected_state
        .filter(|s| !s.is_empty())
        .ok_or(CallbackError::MissingState)?;
    if query.state.as_deref() != Some(expected_state.as_str()) {
        return Err(CallbackError::StateMismatch);
    }

    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or(CallbackError::MissingCode)?;

    let access_token = state
        .provider
        .exchange(&code)
        .await
        .map_err(CallbackError::Exchange)?;

    let identity = state
        .provider
        .fetch_identity(&access_token)
        .await
        .map_err(CallbackError::UserInfo)?;

    let token = state
        .codec
        .issue(&identity)
        .map_err(CallbackError::TokenIssue)?;

    info!(
        user_id = %identity.id(),
        provider = %identity.provider(),
        "login completed"
    );

    Ok(LoginResponse {
        token,
        user: identity,
    })
}

/// Returns the authenticated identity.
pub async fn profile(CurrentIdentity(identity): CurrentIdentity) -> Json<Identity> {
    Json(identity)
}

/// Acknowledges a logout. Tokens are stateless, so nothing is revoked.
pub async fn logout(CurrentIdentity(identity): CurrentIdentity) -> Json<Value> {
    debug!(user_id = %identity.id(), "logout");
    Json(json!({ "message": "Logged out successfully" }))
}

/// Callback errors.
#[derive(Debug)]
pub enum CallbackError {
    MissingState,
    StateMismatch,
    MissingCode,
    Exchange(Report<ExchangeError>),
    UserInfo(Report<UserInfoError>),
    TokenIssue(Report<TokenError>),
}

impl IntoResponse for CallbackError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::MissingState => (StatusCode::BAD_REQUEST, "State cookie not found"),
            Self::StateMismatch => (StatusCode::BAD_REQUEST, "Invalid state parameter"),
            Self::MissingCode => (StatusCode::BAD_REQUEST, "Authorization code not found"),
            Self::Exchange(report) => {
                tracing::error!("Token exchange failed: {}", report);
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to exchange code")
            }
            Self::UserInfo(report) => {
                tracing::error!("User info fetch failed: {}", report);
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to get user info")
            }
            Self::TokenIssue(report) => {
                tracing::error!("Token issuance failed: {}", report);
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to issue token")
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
