//! OAuth provider configuration and endpoint resolution.
//!
//! [`OAuthConfig`] is the raw, deserializable provider configuration.
//! [`OAuthConfig::resolve`] validates it and derives the provider's
//! endpoint URLs, producing an [`OAuthSettings`] ready for the exchange
//! client.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;
use crate::identity::Provider;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const AZURE_LOGIN_HOST: &str = "https://login.microsoftonline.com";
const AZURE_USERINFO_URL: &str = "https://graph.microsoft.com/v1.0/me";

/// Raw configuration for the upstream OAuth provider.
///
/// Fields with defaults can be omitted when loading from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// Provider name: "google", "okta" or "azure".
    #[serde(default = "default_provider")]
    provider: String,
    /// The OAuth2 client ID registered with the provider.
    #[serde(default)]
    client_id: String,
    /// The OAuth2 client secret.
    #[serde(default)]
    client_secret: String,
    /// The redirect URL for the OAuth2 callback.
    #[serde(default = "default_redirect_url")]
    redirect_url: String,
    /// OAuth2 scopes to request as a comma-separated string.
    #[serde(default = "default_scopes")]
    scopes: String,
    /// Okta org domain (e.g. "dev-123456.okta.com"). Required for Okta.
    #[serde(default)]
    okta_domain: Option<String>,
    /// Azure tenant ID. Defaults to "common".
    #[serde(default)]
    azure_tenant_id: Option<String>,
    /// Overrides the provider's authorization endpoint.
    #[serde(default)]
    auth_url: Option<String>,
    /// Overrides the provider's token endpoint.
    #[serde(default)]
    token_url: Option<String>,
    /// Overrides the provider's user-info endpoint.
    #[serde(default)]
    userinfo_url: Option<String>,
    /// Timeout for each outbound provider call, in seconds.
    #[serde(default = "default_http_timeout_seconds")]
    http_timeout_seconds: u64,
}

fn default_provider() -> String {
    "google".to_string()
}

fn default_redirect_url() -> String {
    "http://localhost:8080/auth/callback".to_string()
}

fn default_scopes() -> String {
    "openid,profile,email".to_string()
}

fn default_http_timeout_seconds() -> u64 {
    10
}

impl OAuthConfig {
    /// Creates a configuration builder with the required fields.
    #[must_use]
    pub fn builder(
        provider: Provider,
        client_id: String,
        client_secret: String,
        redirect_url: String,
    ) -> OAuthConfigBuilder {
        OAuthConfigBuilder::new(provider, client_id, client_secret, redirect_url)
    }

    /// Returns the raw provider name.
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Returns the OAuth2 scopes, parsed from the comma-separated string.
    #[must_use]
    pub fn scopes(&self) -> Vec<&str> {
        self.scopes
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Validates the configuration and derives the provider endpoints.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an unsupported provider, a missing
    /// client credential, a missing Okta domain, or a zero timeout.
    pub fn resolve(&self) -> Result<OAuthSettings, ConfigError> {
        let provider = match self.provider.trim().to_ascii_lowercase().as_str() {
            "google" => Provider::Google,
            "okta" => Provider::Okta,
            "azure" => Provider::Azure,
            _ => {
                return Err(ConfigError::UnsupportedProvider {
                    provider: self.provider.clone(),
                });
            }
        };

        require("oauth.client_id", &self.client_id)?;
        require("oauth.client_secret", &self.client_secret)?;
        require("oauth.redirect_url", &self.redirect_url)?;
        if self.http_timeout_seconds == 0 {
            return Err(ConfigError::InvalidSetting {
                setting: "oauth.http_timeout_seconds".to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let defaults = self.provider_endpoints(provider)?;
        let endpoints = ProviderEndpoints {
            auth_url: self.auth_url.clone().unwrap_or(defaults.auth_url),
            token_url: self.token_url.clone().unwrap_or(defaults.token_url),
            userinfo_url: self.userinfo_url.clone().unwrap_or(defaults.userinfo_url),
        };

        Ok(OAuthSettings {
            provider,
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            redirect_url: self.redirect_url.clone(),
            scopes: self.scopes().into_iter().map(str::to_string).collect(),
            endpoints,
            http_timeout: Duration::from_secs(self.http_timeout_seconds),
        })
    }

    fn provider_endpoints(&self, provider: Provider) -> Result<ProviderEndpoints, ConfigError> {
        match provider {
            Provider::Google => Ok(ProviderEndpoints {
                auth_url: GOOGLE_AUTH_URL.to_string(),
                token_url: GOOGLE_TOKEN_URL.to_string(),
                userinfo_url: GOOGLE_USERINFO_URL.to_string(),
            }),
            Provider::Okta => {
                let domain = self
                    .okta_domain
                    .as_deref()
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .ok_or_else(|| ConfigError::MissingSetting {
                        setting: "oauth.okta_domain".to_string(),
                    })?;
                Ok(ProviderEndpoints {
                    auth_url: format!("https://{domain}/oauth2/v1/authorize"),
                    token_url: format!("https://{domain}/oauth2/v1/token"),
                    userinfo_url: format!("https://{domain}/oauth2/v1/userinfo"),
                })
            }
            Provider::Azure => {
                let tenant = self
                    .azure_tenant_id
                    .as_deref()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .unwrap_or("common");
                Ok(ProviderEndpoints {
                    auth_url: format!("{AZURE_LOGIN_HOST}/{tenant}/oauth2/v2.0/authorize"),
                    token_url: format!("{AZURE_LOGIN_HOST}/{tenant}/oauth2/v2.0/token"),
                    userinfo_url: AZURE_USERINFO_URL.to_string(),
                })
            }
        }
    }
}

fn require(setting: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingSetting {
            setting: setting.to_string(),
        });
    }
    Ok(())
}

/// Builder for `OAuthConfig`.
#[derive(Debug)]
pub struct OAuthConfigBuilder {
    config: OAuthConfig,
    scopes: Vec<String>,
}

impl OAuthConfigBuilder {
    /// Creates a new builder with required fields.
    #[must_use]
    pub fn new(
        provider: Provider,
        client_id: String,
        client_secret: String,
        redirect_url: String,
    ) -> Self {
        Self {
            config: OAuthConfig {
                provider: provider.as_str().to_string(),
                client_id,
                client_secret,
                redirect_url,
                scopes: default_scopes(),
                okta_domain: None,
                azure_tenant_id: None,
                auth_url: None,
                token_url: None,
                userinfo_url: None,
                http_timeout_seconds: default_http_timeout_seconds(),
            },
            scopes: default_scopes().split(',').map(str::to_string).collect(),
        }
    }

    /// Sets the OAuth2 scopes to request.
    #[must_use]
    pub fn scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Sets the Okta org domain.
    #[must_use]
    pub fn okta_domain(mut self, domain: String) -> Self {
        self.config.okta_domain = Some(domain);
        self
    }

    /// Sets the Azure tenant ID.
    #[must_use]
    pub fn azure_tenant_id(mut self, tenant: String) -> Self {
        self.config.azure_tenant_id = Some(tenant);
        self
    }

    /// Overrides all three provider endpoints.
    #[must_use]
    pub fn endpoints(mut self, auth_url: String, token_url: String, userinfo_url: String) -> Self {
        self.config.auth_url = Some(auth_url);
        self.config.token_url = Some(token_url);
        self.config.userinfo_url = Some(userinfo_url);
        self
    }

    /// Sets the outbound call timeout.
    #[must_use]
    pub fn http_timeout_seconds(mut self, seconds: u64) -> Self {
        self.config.http_timeout_seconds = seconds;
        self
    }

    /// Builds the `OAuthConfig`.
    #[must_use]
    pub fn build(mut self) -> OAuthConfig {
        self.config.scopes = self.scopes.join(",");
        self.config
    }
}

/// Endpoint URLs of an OAuth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

/// Validated provider settings.
#[derive(Debug, Clone)]
pub struct OAuthSettings {
    provider: Provider,
    client_id: String,
    client_secret: String,
    redirect_url: String,
    scopes: Vec<String>,
    endpoints: ProviderEndpoints,
    http_timeout: Duration,
}

impl OAuthSettings {
    /// Returns the provider.
    #[must_use]
    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Returns the OAuth2 client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the OAuth2 client secret.
    #[must_use]
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Returns the redirect URL.
    #[must_use]
    pub fn redirect_url(&self) -> &str {
        &self.redirect_url
    }

    /// Returns the scopes to request.
    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Returns the resolved endpoints.
    #[must_use]
    pub fn endpoints(&self) -> &ProviderEndpoints {
        &self.endpoints
    }

    /// Returns the timeout for each outbound call.
    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        self.http_timeout
    }
}
