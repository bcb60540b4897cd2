use argon2::Argon2;
use chrono::Utc;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng};
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, NewUser, Principal, ResultEngine, Role, User,
    budget::ensure_budget_limit,
    users::{self, validate_new_user},
};

use super::{Engine, with_tx};

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> ResultEngine<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| EngineError::PasswordHash(err.to_string()))
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Runs [`hash_password`] on the blocking pool.
async fn spawn_hash(password: String) -> ResultEngine<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|err| EngineError::PasswordHash(err.to_string()))?
}

/// Runs [`verify_password`] on the blocking pool.
async fn spawn_verify(password: String, hash: String) -> ResultEngine<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|err| EngineError::PasswordHash(err.to_string()))
}

fn invalid_credentials() -> EngineError {
    EngineError::Unauthenticated("invalid email or password".to_string())
}

impl Engine {
    /// Registers a user. Emails are unique, case-insensitively.
    pub async fn create_user(&self, new_user: NewUser) -> ResultEngine<User> {
        validate_new_user(&new_user)?;
        let email = normalize_email(&new_user.email);
        let password_hash = spawn_hash(new_user.password.clone()).await?;

        with_tx!(self, |db_tx| {
            let exists = users::Entity::find()
                .filter(users::Column::Email.eq(email.clone()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(email));
            }

            let now = Utc::now();
            let model = users::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                email: ActiveValue::Set(email),
                first_name: ActiveValue::Set(new_user.first_name.trim().to_string()),
                last_name: ActiveValue::Set(new_user.last_name.trim().to_string()),
                password_hash: ActiveValue::Set(password_hash),
                budget_limit_minor: ActiveValue::Set(new_user.budget_limit_minor),
                role: ActiveValue::Set(new_user.role.as_str().to_string()),
                created_at: ActiveValue::Set(now),
                updated_at: ActiveValue::Set(now),
            }
            .insert(&db_tx)
            .await?;
            tracing::info!(user_id = %model.id, role = %model.role, "user created");

            User::try_from(model)
        })
    }

    /// Resolves credentials into a [`Principal`].
    ///
    /// Unknown emails and wrong passwords fail the same way.
    pub async fn authenticate(&self, email: &str, password: &str) -> ResultEngine<Principal> {
        let model = users::Entity::find()
            .filter(users::Column::Email.eq(normalize_email(email)))
            .one(&self.database)
            .await?
            .ok_or_else(invalid_credentials)?;

        if !spawn_verify(password.to_string(), model.password_hash.clone()).await? {
            return Err(invalid_credentials());
        }

        Ok(Principal::new(model.id, Role::try_from(model.role.as_str())?))
    }

    /// Looks a user up by email without any authorization check. Meant for
    /// operator tooling that already runs with full database access.
    pub async fn user_by_email(&self, email: &str) -> ResultEngine<User> {
        let model = users::Entity::find()
            .filter(users::Column::Email.eq(normalize_email(email)))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))?;
        User::try_from(model)
    }

    /// Returns a user profile. Users may read themselves, Admins anyone.
    pub async fn user(&self, principal: &Principal, user_id: Uuid) -> ResultEngine<User> {
        if principal.user_id != user_id && !principal.is_admin() {
            return Err(EngineError::Forbidden("user not authorized".to_string()));
        }
        let model = self.require_user(&self.database, user_id).await?;
        User::try_from(model)
    }

    /// Lists every user, oldest account first. Admins only.
    pub async fn list_users(&self, principal: &Principal) -> ResultEngine<Vec<User>> {
        if !principal.is_admin() {
            return Err(EngineError::Forbidden("user not authorized".to_string()));
        }
        users::Entity::find()
            .order_by_asc(users::Column::CreatedAt)
            .order_by_asc(users::Column::Email)
            .all(&self.database)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    /// Changes a budget limit. Users may change their own, Admins anyone's.
    ///
    /// Stored expenses keep the utilization computed when they were written.
    pub async fn update_budget_limit(
        &self,
        principal: &Principal,
        user_id: Uuid,
        budget_limit_minor: i64,
    ) -> ResultEngine<User> {
        if principal.user_id != user_id && !principal.is_admin() {
            return Err(EngineError::Forbidden("user not authorized".to_string()));
        }
        ensure_budget_limit(budget_limit_minor)?;

        with_tx!(self, |db_tx| {
            let model = self.require_user(&db_tx, user_id).await?;
            let mut active: users::ActiveModel = model.into();
            active.budget_limit_minor = ActiveValue::Set(budget_limit_minor);
            active.updated_at = ActiveValue::Set(Utc::now());
            let updated = active.update(&db_tx).await?;
            tracing::info!(user_id = %updated.id, budget_limit_minor, "budget limit updated");

            User::try_from(updated)
        })
    }
}
