//! Authentication and authorization for the gateway server.
//!
//! This module provides:
//! - The OAuth login flow against the configured identity provider
//! - Stateless session tokens handed to the client after login
//! - The guard chain protecting routes by token, role, or permission
//!
//! # Session Model
//!
//! Nothing about a session is stored server-side. The CSRF state for a
//! login in flight lives in a short-lived cookie, and an established
//! session is just a signed token the client presents as a bearer
//! credential. Logging out is a client-side concern.

pub mod guard;
pub mod oauth;
pub mod routes;

use iag_platform_access::{AccessControl, TokenCodec};
use std::sync::Arc;

pub use guard::{
    Authenticate, CurrentIdentity, GuardChain, GuardRejection, GuardStage, RequestScope,
    RequireAnyRole, RequirePermission,
};
pub use oauth::{ExchangeError, IdentityProvider, OAuthClient, UserInfoError};
pub use routes::{callback, login, logout, profile};

/// Shared application state.
///
/// Everything here is immutable after startup.
pub struct AppState {
    /// Upstream identity provider.
    pub provider: Arc<dyn IdentityProvider>,
    /// Session token codec.
    pub codec: TokenCodec,
    /// Role and permission evaluation.
    pub access: AccessControl,
    /// Whether to set the Secure flag on cookies.
    pub secure_cookies: bool,
    /// Whether role and permission stages guard the `/api` routes.
    pub enable_rbac: bool,
}

impl AppState {
    /// Creates a new application state with the built-in role table.
    pub fn new(provider: Arc<dyn IdentityProvider>, codec: TokenCodec) -> Self {
        Self {
            provider,
            codec,
            access: AccessControl::default(),
            secure_cookies: true,
            enable_rbac: true,
        }
    }

    /// Sets whether cookies carry the Secure flag.
    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    /// Sets whether authorization stages are applied.
    #[must_use]
    pub fn with_rbac(mut self, enabled: bool) -> Self {
        self.enable_rbac = enabled;
        self
    }
}
