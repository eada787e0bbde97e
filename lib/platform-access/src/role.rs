//! Role and permission types for gateway access control.
//!
//! Roles form a small closed set. Each role grants a list of
//! `(resource, action)` permissions through an immutable [`RoleTable`]
//! built once at startup.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

/// Wildcard matching any resource or action.
pub const WILDCARD: &str = "*";

/// Gateway access role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Administrator with unrestricted access.
    Admin,
    /// Standard user. Assigned to every identity that has no other role.
    User,
    /// Read-only access.
    Viewer,
}

impl Role {
    /// Returns the role's wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
            Self::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a known role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            "viewer" => Ok(Self::Viewer),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Set of role names held by an identity.
///
/// Names are kept as strings because tokens may carry role names this
/// build does not know; those never match a permission but still count
/// for exact-name role checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet {
    roles: BTreeSet<String>,
}

impl RoleSet {
    /// Creates an empty role set.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Creates the baseline role set holding only [`Role::User`].
    #[must_use]
    pub fn user() -> Self {
        Self::from_roles([Role::User])
    }

    /// Creates a role set from known roles.
    #[must_use]
    pub fn from_roles(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            roles: roles.into_iter().map(|r| r.as_str().to_string()).collect(),
        }
    }

    /// Creates a role set from raw role names.
    #[must_use]
    pub fn from_names<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            roles: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns this set, or the baseline user role if it is empty.
    #[must_use]
    pub fn or_default_user(self) -> Self {
        if self.is_empty() { Self::user() } else { self }
    }

    /// Returns true if `name` is a member of the set (exact match).
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.roles.contains(name)
    }

    /// Returns true if the set holds no roles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Iterates over the roles this build knows, skipping unknown names.
    pub fn known_roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.roles.iter().filter_map(|name| name.parse().ok())
    }

    /// Returns the role names as an owned list.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        self.roles.iter().cloned().collect()
    }
}

/// A `(resource, action)` grant. Either field may be [`WILDCARD`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub resource: String,
    pub action: String,
}

impl Permission {
    /// Creates a new permission.
    #[must_use]
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
        }
    }

    /// Returns true if this grant covers `action` on `resource`.
    ///
    /// A wildcard action only counts alongside an exact resource or a
    /// wildcard resource; `(*, read)` does not match every resource.
    #[must_use]
    pub fn allows(&self, resource: &str, action: &str) -> bool {
        if self.resource == WILDCARD && self.action == WILDCARD {
            return true;
        }
        self.resource == resource && (self.action == WILDCARD || self.action == action)
    }
}

/// Immutable mapping from role to granted permissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleTable {
    grants: HashMap<Role, Vec<Permission>>,
}

impl RoleTable {
    /// Creates a table from explicit grants.
    #[must_use]
    pub fn new(grants: HashMap<Role, Vec<Permission>>) -> Self {
        Self { grants }
    }

    /// Returns the permissions granted to `role`, or an empty slice.
    #[must_use]
    pub fn permissions(&self, role: Role) -> &[Permission] {
        self.grants
            .get(&role)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl Default for RoleTable {
    /// The built-in gateway policy.
    fn default() -> Self {
        let mut grants = HashMap::new();
        grants.insert(Role::Admin, vec![Permission::new(WILDCARD, WILDCARD)]);
        grants.insert(
            Role::User,
            vec![
                Permission::new("profile", "read"),
                Permission::new("profile", "update"),
                Permission::new("data", "read"),
                Permission::new("data", "create"),
            ],
        );
        grants.insert(
            Role::Viewer,
            vec![
                Permission::new("profile", "read"),
                Permission::new("data", "read"),
            ],
        );
        Self { grants }
    }
}
