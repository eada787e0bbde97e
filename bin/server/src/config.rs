//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables. Nested
//! settings use `__` as the separator, e.g. `OAUTH__CLIENT_ID`.
//!
//! See [`OAuthConfig`] for provider configuration.

use iag_platform_access::{ConfigError, OAuthConfig, OAuthSettings, TokenCodec};
use jsonwebtoken::Algorithm;
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::str::FromStr;

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Whether role and permission checks run on the `/api` routes.
    /// When disabled those routes only require authentication.
    #[serde(default = "default_enable_rbac")]
    pub enable_rbac: bool,

    /// Whether to set the Secure flag on cookies (requires HTTPS).
    /// Defaults to true for production safety; set to false for local HTTP development.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,

    /// OAuth provider configuration.
    pub oauth: OAuthConfig,

    /// Session token configuration.
    #[serde(default)]
    pub token: TokenConfig,
}

/// Session token configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    /// HMAC signing secret.
    #[serde(default)]
    pub secret: String,

    /// Token lifetime in hours.
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: i64,

    /// Signing algorithm: HS256, HS384 or HS512.
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_enable_rbac() -> bool {
    true
}

fn default_secure_cookies() -> bool {
    true
}

fn default_ttl_hours() -> i64 {
    24
}

fn default_algorithm() -> String {
    "HS256".to_string()
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            ttl_hours: default_ttl_hours(),
            algorithm: default_algorithm(),
        }
    }
}

impl TokenConfig {
    /// Builds the token codec.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret is empty, the lifetime is not
    /// positive, or the algorithm is not an HMAC algorithm.
    pub fn codec(&self) -> Result<TokenCodec, ConfigError> {
        if self.ttl_hours <= 0 {
            return Err(ConfigError::InvalidSetting {
                setting: "token.ttl_hours".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        let ttl = chrono::Duration::try_hours(self.ttl_hours)
            .ok_or_else(|| ConfigError::InvalidSetting {
                setting: "token.ttl_hours".to_string(),
                reason: "out of range".to_string(),
            })?;
        let algorithm = Algorithm::from_str(self.algorithm.trim())
            .map_err(|_| ConfigError::InvalidSetting {
                setting: "token.algorithm".to_string(),
                reason: format!("unknown algorithm '{}'", self.algorithm),
            })?;

        TokenCodec::new(self.secret.as_bytes(), ttl)?.with_algorithm(algorithm)
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::load(config::Environment::default())
    }

    /// Loads configuration from an explicit set of variables instead of the
    /// process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, config::ConfigError> {
        Self::load(config::Environment::default().source(Some(vars)))
    }

    fn load(environment: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(environment.separator("__").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Validates the OAuth configuration and resolves provider endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error for an unsupported provider or a missing setting.
    pub fn resolve(&self) -> Result<OAuthSettings, ConfigError> {
        self.oauth.resolve()
    }

    /// Returns the socket address to bind.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is not an IP address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let host = self
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidSetting {
                setting: "host".to_string(),
                reason: format!("'{}' is not an IP address", self.host),
            })?;
        Ok(SocketAddr::new(host, self.port))
    }
}
