//! Canonical identity type and provider user-info normalization.
//!
//! Each supported identity provider returns user info in its own shape.
//! [`Provider::normalize`] maps those shapes onto a single [`Identity`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::role::RoleSet;

/// Supported identity providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Google OAuth 2.0 (`/oauth2/v2/userinfo` shape).
    Google,
    /// Okta OIDC (`/oauth2/v1/userinfo` shape).
    Okta,
    /// Microsoft Entra ID via Microsoft Graph (`/v1.0/me` shape).
    Azure,
}

impl Provider {
    /// Returns the provider's wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Okta => "okta",
            Self::Azure => "azure",
        }
    }

    /// Builds an [`Identity`] from a raw user-info response.
    ///
    /// Missing or non-string fields become empty strings; normalization
    /// never fails.
    #[must_use]
    pub fn normalize(&self, info: &Map<String, Value>) -> Identity {
        let (id, email, name, picture) = match self {
            Self::Google => (
                string_field(info, "id"),
                string_field(info, "email"),
                string_field(info, "name"),
                string_field(info, "picture"),
            ),
            Self::Okta => (
                string_field(info, "sub"),
                string_field(info, "email"),
                string_field(info, "name"),
                string_field(info, "picture"),
            ),
            Self::Azure => {
                let mut email = string_field(info, "mail");
                if email.is_empty() {
                    email = string_field(info, "userPrincipalName");
                }
                (
                    string_field(info, "id"),
                    email,
                    string_field(info, "displayName"),
                    String::new(),
                )
            }
        };

        Identity::new(id, email, name, *self, RoleSet::none())
            .with_picture(Some(picture).filter(|p| !p.is_empty()))
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn string_field(info: &Map<String, Value>, field: &str) -> String {
    info.get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Canonical user record produced by a provider login or a token decode.
///
/// An identity lives for one request or one OAuth callback and is never
/// mutated after construction. Its role set is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Provider-scoped unique identifier.
    id: String,
    email: String,
    /// Display name.
    name: String,
    /// Avatar URL, when the provider supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    picture: Option<String>,
    provider: Provider,
    #[serde(deserialize_with = "roles_or_default_user")]
    roles: RoleSet,
    /// When this identity was first materialized locally.
    created: DateTime<Utc>,
}

fn roles_or_default_user<'de, D>(deserializer: D) -> Result<RoleSet, D::Error>
where
    D: Deserializer<'de>,
{
    RoleSet::deserialize(deserializer).map(RoleSet::or_default_user)
}

impl Identity {
    /// Creates an identity materialized now.
    ///
    /// An empty role set is replaced by the baseline user role.
    #[must_use]
    pub fn new(
        id: String,
        email: String,
        name: String,
        provider: Provider,
        roles: RoleSet,
    ) -> Self {
        Self {
            id,
            email,
            name,
            picture: None,
            provider,
            roles: roles.or_default_user(),
            created: Utc::now(),
        }
    }

    /// Sets the avatar URL.
    #[must_use]
    pub fn with_picture(mut self, picture: Option<String>) -> Self {
        self.picture = picture;
        self
    }

    /// Sets the materialization time.
    #[must_use]
    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = created;
        self
    }

    /// Returns the provider-scoped identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the email address (possibly empty).
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the display name (possibly empty).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the avatar URL, if any.
    #[must_use]
    pub fn picture(&self) -> Option<&str> {
        self.picture.as_deref()
    }

    /// Returns the identity provider.
    #[must_use]
    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Returns the role set.
    #[must_use]
    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }

    /// Returns when this identity was materialized.
    #[must_use]
    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }
}
