use sea_orm::{ConnectionTrait, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{EngineError, Principal, ResultEngine, Scope, expenses, users};

use super::Engine;

/// Restricts an expense query to what a [`Scope`] may see.
///
/// This is the only place read visibility is decided.
pub(super) trait ApplyScope: QueryFilter + Sized {
    fn apply_scope(self, scope: Scope) -> Self;
}

impl<T> ApplyScope for T
where
    T: QueryFilter + Sized,
{
    fn apply_scope(self, scope: Scope) -> Self {
        match scope {
            Scope::Owner(user_id) => self.filter(expenses::Column::OwnerId.eq(user_id)),
            Scope::All => self,
        }
    }
}

impl Engine {
    pub(super) async fn require_user<C>(&self, db: &C, user_id: Uuid) -> ResultEngine<users::Model>
    where
        C: ConnectionTrait,
    {
        users::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))
    }

    /// Loads an expense the principal is allowed to update or delete.
    pub(super) async fn require_expense_write<C>(
        &self,
        db: &C,
        principal: &Principal,
        expense_id: Uuid,
    ) -> ResultEngine<expenses::Model>
    where
        C: ConnectionTrait,
    {
        let model = expenses::Entity::find_by_id(expense_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))?;
        if !self.policy.can_modify(principal, model.owner_id) {
            return Err(EngineError::Forbidden("user not authorized".to_string()));
        }
        Ok(model)
    }
}

/// The raw SQL counterpart of [`ApplyScope`] for hand-written aggregate
/// queries over `expenses`.
///
/// Returns a clause to append after an existing `WHERE` condition, and the
/// values it binds.
pub(super) fn scope_sql(scope: Scope) -> (&'static str, Vec<Value>) {
    match scope {
        Scope::Owner(user_id) => (" AND owner_id = ?", vec![user_id.into()]),
        Scope::All => ("", Vec::new()),
    }
}
