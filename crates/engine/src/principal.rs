//! Who is asking, and what they may see or change.
//!
//! Reads are scoped by [`Principal::read_scope`]; every listing and every
//! statistics query goes through it. Writes go through
//! [`AccessPolicy::can_modify`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Role;

/// The authenticated caller, as resolved by the transport layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
}

/// The set of expenses a read may touch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    /// Only expenses owned by this user.
    Owner(Uuid),
    /// Every expense.
    All,
}

impl Principal {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn read_scope(&self) -> Scope {
        match self.role {
            Role::Admin => Scope::All,
            Role::User => Scope::Owner(self.user_id),
        }
    }
}

/// Write rules for expenses.
///
/// By default only the owner may update or delete an expense, Admins
/// included. Setting `admin_can_modify_any` lets Admins mutate any expense.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicy {
    pub admin_can_modify_any: bool,
}

impl AccessPolicy {
    pub fn can_modify(&self, principal: &Principal, owner_id: Uuid) -> bool {
        principal.user_id == owner_id || (self.admin_can_modify_any && principal.is_admin())
    }
}
