//! Expense primitives.
//!
//! An `Expense` belongs to exactly one user for its whole life. Its
//! `expenditure` is derived from `price_minor` and the owner's budget limit at
//! write time and is never set directly by callers.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::OwnerName;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub price_minor: i64,
    pub date: DateTime<Utc>,
    /// Percentage of the owner's budget limit, fixed when last written.
    pub expenditure: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A listed expense together with the owner's display name.
///
/// `owner` is `None` only if the owner row disappeared underneath the
/// expense.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseWithOwner {
    pub expense: Expense,
    pub owner: Option<OwnerName>,
}

/// Create command. Every field is optional so that missing input surfaces as
/// a validation error from the engine rather than a decoding failure.
#[derive(Clone, Debug, Default)]
pub struct CreateExpenseCmd {
    pub title: Option<String>,
    pub price_minor: Option<i64>,
    /// RFC 3339 timestamp or `YYYY-MM-DD` (midnight UTC).
    pub date: Option<String>,
}

/// Update command. Absent (or blank) fields keep their stored value.
#[derive(Clone, Debug)]
pub struct UpdateExpenseCmd {
    pub expense_id: Uuid,
    pub title: Option<String>,
    pub price_minor: Option<i64>,
    pub date: Option<String>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub title_norm: String,
    pub price_minor: i64,
    pub date: DateTimeUtc,
    pub expenditure: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::OwnerId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Expense {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            owner_id: model.owner_id,
            title: model.title,
            price_minor: model.price_minor,
            date: model.date,
            expenditure: model.expenditure,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<&Expense> for ActiveModel {
    fn from(expense: &Expense) -> Self {
        Self {
            id: ActiveValue::Set(expense.id),
            owner_id: ActiveValue::Set(expense.owner_id),
            title: ActiveValue::Set(expense.title.clone()),
            title_norm: ActiveValue::Set(crate::util::normalize_title(&expense.title)),
            price_minor: ActiveValue::Set(expense.price_minor),
            date: ActiveValue::Set(expense.date),
            expenditure: ActiveValue::Set(expense.expenditure),
            created_at: ActiveValue::Set(expense.created_at),
            updated_at: ActiveValue::Set(expense.updated_at),
        }
    }
}
