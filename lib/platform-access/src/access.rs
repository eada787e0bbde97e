//! Role and permission evaluation.

use std::sync::Arc;

use crate::identity::Identity;
use crate::role::{Role, RoleTable};

/// Evaluates role membership and permissions against an immutable table.
///
/// Cloning is cheap; all clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct AccessControl {
    table: Arc<RoleTable>,
}

impl AccessControl {
    /// Creates an engine over `table`.
    #[must_use]
    pub fn new(table: Arc<RoleTable>) -> Self {
        Self { table }
    }

    /// Returns true if the identity holds `role` (exact name, no hierarchy).
    #[must_use]
    pub fn has_role(&self, identity: &Identity, role: Role) -> bool {
        identity.roles().contains(role.as_str())
    }

    /// Returns true if the identity holds at least one of `roles`.
    #[must_use]
    pub fn has_any_role(&self, identity: &Identity, roles: &[Role]) -> bool {
        roles.iter().any(|role| self.has_role(identity, *role))
    }

    /// Returns true if any of the identity's roles grants `action` on `resource`.
    ///
    /// Grants only ever add access, so the order roles are checked in does
    /// not affect the result. Role names unknown to this build grant nothing.
    #[must_use]
    pub fn has_permission(&self, identity: &Identity, resource: &str, action: &str) -> bool {
        identity.roles().known_roles().any(|role| {
            self.table
                .permissions(role)
                .iter()
                .any(|grant| grant.allows(resource, action))
        })
    }
}
