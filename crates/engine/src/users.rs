//! Users: the owners of expenses.
//!
//! A user carries the budget limit every expense utilization is computed
//! against, and the role that decides which expenses it can see.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Admin => "Admin",
        }
    }
}

impl TryFrom<&str> for Role {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "User" => Ok(Self::User),
            "Admin" => Ok(Self::Admin),
            other => Err(EngineError::Validation(format!("invalid role: {other}"))),
        }
    }
}

/// Public view of a user. The password hash never leaves the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub budget_limit_minor: i64,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Minimal owner projection attached to listed expenses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerName {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
}

/// Input for [`Engine::create_user`](crate::Engine::create_user).
#[derive(Clone, Debug)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub budget_limit_minor: i64,
    pub role: Role,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub budget_limit_minor: i64,
    pub role: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::expenses::Entity")]
    Expenses,
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for User {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            role: Role::try_from(model.role.as_str())?,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            budget_limit_minor: model.budget_limit_minor,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

impl From<Model> for OwnerName {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            first_name: model.first_name,
            last_name: model.last_name,
        }
    }
}

pub(crate) fn validate_new_user(user: &NewUser) -> ResultEngine<()> {
    for (value, label) in [
        (&user.email, "email"),
        (&user.first_name, "first name"),
        (&user.last_name, "last name"),
        (&user.password, "password"),
    ] {
        if value.trim().is_empty() {
            return Err(EngineError::Validation(format!("{label} must not be empty")));
        }
    }
    crate::budget::ensure_budget_limit(user.budget_limit_minor)
}
