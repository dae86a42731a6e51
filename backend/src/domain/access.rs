//! Authorisation predicate shared by every mutating issue operation.

use serde::{Deserialize, Serialize};

use super::user::{Role, UserId};

/// The authenticated caller, as produced by the bearer-token verifier.
///
/// Handlers thread a `Principal` into every domain operation explicitly;
/// there is no ambient "current user".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    /// Identifier of the authenticated account.
    pub user_id: UserId,
    /// Role granted to the account.
    pub role: Role,
}

impl Principal {
    /// Construct a principal for the given account and role.
    pub const fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Whether the caller holds the administrator role.
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    /// Whether the caller may mutate an issue reported by `reporter`.
    ///
    /// True iff the caller is the reporter or an administrator. Pure; no
    /// side effects.
    pub fn can_mutate(&self, reporter: &UserId) -> bool {
        self.is_admin() || self.user_id == *reporter
    }
}
