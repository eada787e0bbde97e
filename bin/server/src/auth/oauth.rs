//! OAuth 2.0 authorization-code exchange against the configured provider.
//!
//! The flow has three steps, each a single outbound call at most:
//! 1. Build the provider authorization URL carrying the CSRF state.
//! 2. Exchange the returned authorization code for an access token.
//! 3. Fetch user info with that token and normalize it to an [`Identity`].
//!
//! Nothing is retried; any failure aborts the login transaction.

use async_trait::async_trait;
use iag_platform_access::{ConfigError, Identity, OAuthSettings, Provider};
use oauth2::{
    AccessToken, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl,
    RequestTokenError, Scope, TokenResponse, TokenUrl, basic::BasicClient,
};
use rootcause::prelude::Report;
use serde_json::{Map, Value};
use std::fmt;
use tracing::{debug, instrument, warn};

/// The upstream identity provider as seen by the login routes.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns which provider shape user info is normalized from.
    fn provider(&self) -> Provider;

    /// Returns the URL to send the browser to, carrying `state`.
    fn authorization_url(&self, state: &str) -> String;

    /// Exchanges an authorization code for an access token.
    async fn exchange(&self, code: &str) -> Result<AccessToken, Report<ExchangeError>>;

    /// Fetches and normalizes the user info for an access token.
    async fn fetch_identity(&self, token: &AccessToken) -> Result<Identity, Report<UserInfoError>>;
}

/// Production [`IdentityProvider`] backed by `oauth2` and `reqwest`.
#[derive(Clone)]
pub struct OAuthClient {
    provider: Provider,
    client_id: ClientId,
    client_secret: ClientSecret,
    auth_url: AuthUrl,
    token_url: TokenUrl,
    redirect_url: RedirectUrl,
    scopes: Vec<String>,
    userinfo_url: String,
    http: reqwest::Client,
}

impl OAuthClient {
    /// Creates a client from resolved provider settings.
    ///
    /// # Errors
    ///
    /// Returns an error if an endpoint URL is invalid or the HTTP client
    /// cannot be built.
    pub fn new(settings: &OAuthSettings) -> Result<Self, ConfigError> {
        let endpoints = settings.endpoints();
        let auth_url = AuthUrl::new(endpoints.auth_url.clone())
            .map_err(|e| invalid_url("oauth.auth_url", e))?;
        let token_url = TokenUrl::new(endpoints.token_url.clone())
            .map_err(|e| invalid_url("oauth.token_url", e))?;
        let redirect_url = RedirectUrl::new(settings.redirect_url().to_string())
            .map_err(|e| invalid_url("oauth.redirect_url", e))?;
        reqwest::Url::parse(&endpoints.userinfo_url)
            .map_err(|e| invalid_url("oauth.userinfo_url", e))?;

        // Provider endpoints must answer directly; redirects are never followed.
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(settings.http_timeout())
            .build()
            .map_err(|e| ConfigError::InvalidSetting {
                setting: "oauth.http_timeout_seconds".to_string(),
                reason: format!("HTTP client error: {e}"),
            })?;

        Ok(Self {
            provider: settings.provider(),
            client_id: ClientId::new(settings.client_id().to_string()),
            client_secret: ClientSecret::new(settings.client_secret().to_string()),
            auth_url,
            token_url,
            redirect_url,
            scopes: settings.scopes().to_vec(),
            userinfo_url: endpoints.userinfo_url.clone(),
            http,
        })
    }
}

fn invalid_url(setting: &str, error: impl fmt::Display) -> ConfigError {
    ConfigError::InvalidSetting {
        setting: setting.to_string(),
        reason: format!("invalid URL: {error}"),
    }
}

#[async_trait]
impl IdentityProvider for OAuthClient {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn authorization_url(&self, state: &str) -> String {
        let state = state.to_string();
        let client = BasicClient::new(self.client_id.clone())
            .set_client_secret(self.client_secret.clone())
            .set_auth_uri(self.auth_url.clone())
            .set_redirect_uri(self.redirect_url.clone());

        let mut request = client.authorize_url(move || CsrfToken::new(state));
        for scope in &self.scopes {
            request = request.add_scope(Scope::new(scope.clone()));
        }
        let (url, _) = request.add_extra_param("access_type", "offline").url();
        url.to_string()
    }

    #[instrument(skip_all)]
    async fn exchange(&self, code: &str) -> Result<AccessToken, Report<ExchangeError>> {
        let client = BasicClient::new(self.client_id.clone())
            .set_client_secret(self.client_secret.clone())
            .set_token_uri(self.token_url.clone())
            .set_redirect_uri(self.redirect_url.clone());

        let response = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| match e {
                RequestTokenError::ServerResponse(response) => ExchangeError::Rejected {
                    reason: response.to_string(),
                },
                RequestTokenError::Request(e) => ExchangeError::Network {
                    reason: e.to_string(),
                },
                other => ExchangeError::InvalidResponse {
                    reason: other.to_string(),
                },
            })?;

        debug!(provider = %self.provider, "authorization code exchanged");
        Ok(response.access_token().clone())
    }

    #[instrument(skip_all)]
    async fn fetch_identity(&self, token: &AccessToken) -> Result<Identity, Report<UserInfoError>> {
        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(token.secret())
            .send()
            .await
            .map_err(|e| UserInfoError::Request {
                reason: e.to_string(),
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| UserInfoError::Request {
            reason: e.to_string(),
        })?;

        if !status.is_success() {
            warn!(
                provider = %self.provider,
                status = status.as_u16(),
                "user info request failed"
            );
            return Err(UserInfoError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            }
            .into());
        }

        let info: Map<String, Value> =
            serde_json::from_slice(&body).map_err(|e| UserInfoError::Malformed {
                reason: e.to_string(),
            })?;

        let identity = self.provider.normalize(&info);
        debug!(provider = %self.provider, user_id = %identity.id(), "user info fetched");
        Ok(identity)
    }
}

/// Errors from exchanging an authorization code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    /// The provider refused the code (invalid, expired or already used).
    Rejected { reason: String },
    /// The token endpoint could not be reached or timed out.
    Network { reason: String },
    /// The token endpoint answered with something unparseable.
    InvalidResponse { reason: String },
}

impl fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { reason } => write!(f, "provider rejected code: {reason}"),
            Self::Network { reason } => write!(f, "token endpoint unreachable: {reason}"),
            Self::InvalidResponse { reason } => write!(f, "invalid token response: {reason}"),
        }
    }
}

impl std::error::Error for ExchangeError {}

/// Errors from fetching user info.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInfoError {
    /// The user-info endpoint could not be reached or timed out.
    Request { reason: String },
    /// The user-info endpoint answered with a non-success status.
    Status { status: u16, body: String },
    /// The body is not a JSON object.
    Malformed { reason: String },
}

impl fmt::Display for UserInfoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request { reason } => write!(f, "user info request failed: {reason}"),
            Self::Status { status, body } => {
                write!(f, "user info endpoint returned {status}: {body}")
            }
            Self::Malformed { reason } => write!(f, "malformed user info: {reason}"),
        }
    }
}

impl std::error::Error for UserInfoError {}
