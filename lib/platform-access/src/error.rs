//! Error types for the platform-access crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `ConfigError`: Invalid or missing gateway configuration (fatal at startup)
//! - `TokenError`: Session token issuance and verification failures
//! - `AuthenticationError`: Request could not be tied to a verified identity
//! - `AuthorizationError`: Verified identity lacks a required role or permission

use crate::role::Role;
use std::fmt;

/// Errors from resolving gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The configured OAuth provider is not one of the supported providers.
    UnsupportedProvider { provider: String },
    /// A required setting is missing or empty.
    MissingSetting { setting: String },
    /// A setting is present but its value cannot be used.
    InvalidSetting { setting: String, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedProvider { provider } => {
                write!(f, "unsupported OAuth provider: {provider}")
            }
            Self::MissingSetting { setting } => {
                write!(f, "missing required setting: {setting}")
            }
            Self::InvalidSetting { setting, reason } => {
                write!(f, "invalid setting '{setting}': {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors from session token operations.
///
/// Every verification failure is reported through one of these variants;
/// callers treat all of them as "the token is not valid".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The token is not a well-formed compact token or lacks required claims.
    Malformed { reason: String },
    /// The signature does not match the configured secret.
    InvalidSignature,
    /// The token header declares an algorithm outside the HMAC family.
    UnsupportedAlgorithm { algorithm: String },
    /// The token was issued by someone other than this gateway.
    InvalidIssuer,
    /// The token's expiry is in the past.
    Expired,
    /// The token's not-before time is in the future.
    NotYetValid,
    /// Signing the token failed.
    Signing { reason: String },
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed { reason } => write!(f, "malformed token: {reason}"),
            Self::InvalidSignature => write!(f, "token signature is invalid"),
            Self::UnsupportedAlgorithm { algorithm } => {
                write!(f, "unsupported token algorithm: {algorithm}")
            }
            Self::InvalidIssuer => write!(f, "token issuer is not accepted"),
            Self::Expired => write!(f, "token has expired"),
            Self::NotYetValid => write!(f, "token is not yet valid"),
            Self::Signing { reason } => write!(f, "failed to sign token: {reason}"),
        }
    }
}

impl std::error::Error for TokenError {}

/// Errors from authenticating a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationError {
    /// No `Authorization` header was sent.
    MissingHeader,
    /// The `Authorization` header is not of the form `Bearer <token>`.
    MalformedHeader,
    /// The bearer token failed verification.
    InvalidToken { reason: String },
    /// An authorization check ran before any identity was attached.
    MissingIdentity,
}

impl fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingHeader => write!(f, "authorization header required"),
            Self::MalformedHeader => write!(f, "invalid authorization header format"),
            Self::InvalidToken { reason } => write!(f, "invalid token: {reason}"),
            Self::MissingIdentity => write!(f, "request is not authenticated"),
        }
    }
}

impl std::error::Error for AuthenticationError {}

/// Errors from authorization checks.
///
/// Each variant names only the requirement that was not met, never the
/// wider policy table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    /// The identity holds none of the acceptable roles.
    MissingRole { required: Vec<Role> },
    /// The identity lacks the required resource/action permission.
    MissingPermission { resource: String, action: String },
}

impl fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRole { required } => {
                let names: Vec<&str> = required.iter().map(Role::as_str).collect();
                write!(f, "requires one of roles: {}", names.join(", "))
            }
            Self::MissingPermission { resource, action } => {
                write!(f, "lacks permission to {action} on {resource}")
            }
        }
    }
}

impl std::error::Error for AuthorizationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_unsupported_provider_display() {
        let err = ConfigError::UnsupportedProvider {
            provider: "github".to_string(),
        };
        assert!(err.to_string().contains("unsupported"));
        assert!(err.to_string().contains("github"));
    }

    #[test]
    fn token_error_algorithm_display() {
        let err = TokenError::UnsupportedAlgorithm {
            algorithm: "RS256".to_string(),
        };
        assert!(err.to_string().contains("RS256"));
    }

    #[test]
    fn authentication_error_invalid_token_display() {
        let err = AuthenticationError::InvalidToken {
            reason: TokenError::Expired.to_string(),
        };
        assert!(err.to_string().contains("invalid token"));
        assert!(err.to_string().contains("expired"));
    }

    #[test]
    fn authorization_error_missing_role_names_roles() {
        let err = AuthorizationError::MissingRole {
            required: vec![Role::Admin, Role::User],
        };
        assert_eq!(err.to_string(), "requires one of roles: admin, user");
    }

    #[test]
    fn authorization_error_missing_permission_display() {
        let err = AuthorizationError::MissingPermission {
            resource: "data".to_string(),
            action: "delete".to_string(),
        };
        assert!(err.to_string().contains("delete"));
        assert!(err.to_string().contains("data"));
    }
}
