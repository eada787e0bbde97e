//! Identity, session token, and access control core for the IAG gateway.
//!
//! This crate provides:
//! - Provider configuration and endpoint resolution (`OAuthConfig`)
//! - Normalization of provider user info into a canonical `Identity`
//! - Stateless session tokens (`TokenCodec`)
//! - Role-based access control (`Role`, `RoleTable`, `AccessControl`)
//!
//! # Access Control Model
//!
//! Every identity holds at least one role; identities arriving without any
//! are given `user`. Roles grant `(resource, action)` permissions through a
//! static table where `*` matches anything:
//! - `admin` holds `(*, *)`
//! - `user` may read and update its profile, and read and create data
//! - `viewer` may read its profile and data
//!
//! # Example
//!
//! ```
//! use iag_platform_access::{AccessControl, Provider, Role, TokenCodec};
//! use chrono::Duration;
//! use serde_json::json;
//!
//! let info = json!({ "sub": "00u1", "email": "alice@example.com", "name": "Alice" });
//! let identity = Provider::Okta.normalize(info.as_object().unwrap());
//!
//! let codec = TokenCodec::new(b"gateway-secret", Duration::hours(24)).unwrap();
//! let token = codec.issue(&identity).unwrap();
//! let decoded = codec.verify(&token).unwrap().into_identity();
//!
//! let access = AccessControl::default();
//! assert!(access.has_role(&decoded, Role::User));
//! assert!(access.has_permission(&decoded, "data", "create"));
//! assert!(!access.has_permission(&decoded, "data", "delete"));
//! ```

pub mod access;
pub mod error;
pub mod identity;
pub mod oauth;
pub mod role;
pub mod token;

// Re-export main types at crate root
pub use access::AccessControl;
pub use error::{AuthenticationError, AuthorizationError, ConfigError, TokenError};
pub use identity::{Identity, Provider};
pub use oauth::{OAuthConfig, OAuthConfigBuilder, OAuthSettings, ProviderEndpoints};
pub use role::{Permission, Role, RoleSet, RoleTable, UnknownRole, WILDCARD};
pub use token::{SessionClaims, TokenCodec, HMAC_ALGORITHMS, TOKEN_ISSUER};
