//! Account endpoints: sign-up, profile and budget limit.

use api_types::user::{BudgetUpdate, Role as RoleView, UserNew, UserView};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{NewUser, Principal, Role, User};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn user_view(user: User) -> UserView {
    UserView {
        id: user.id,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        budget_limit_minor: user.budget_limit_minor,
        role: match user.role {
            Role::User => RoleView::User,
            Role::Admin => RoleView::Admin,
        },
        created_at: user.created_at,
        updated_at: user.updated_at,
    }
}

/// Public sign-up. Admin accounts are only created from the admin CLI.
pub async fn signup(
    State(state): State<ServerState>,
    Json(payload): Json<UserNew>,
) -> Result<(StatusCode, Json<UserView>), ServerError> {
    let user = state
        .engine
        .create_user(NewUser {
            email: payload.email,
            first_name: payload.first_name,
            last_name: payload.last_name,
            password: payload.password,
            budget_limit_minor: payload.budget_limit_minor,
            role: Role::User,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user_view(user))))
}

pub async fn me(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
) -> Result<Json<UserView>, ServerError> {
    let user = state.engine.user(&principal, principal.user_id).await?;
    Ok(Json(user_view(user)))
}

/// Every account. Admins only.
pub async fn list(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<UserView>>, ServerError> {
    let users = state.engine.list_users(&principal).await?;
    Ok(Json(users.into_iter().map(user_view).collect()))
}

pub async fn get(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserView>, ServerError> {
    let user = state.engine.user(&principal, user_id).await?;
    Ok(Json(user_view(user)))
}

pub async fn update_budget(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<BudgetUpdate>,
) -> Result<Json<UserView>, ServerError> {
    let user = state
        .engine
        .update_budget_limit(&principal, user_id, payload.budget_limit_minor)
        .await?;
    Ok(Json(user_view(user)))
}
