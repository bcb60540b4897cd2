//! Expense endpoints.

use api_types::expense::{
    ExpenseDeleted, ExpenseListQuery, ExpenseNew, ExpenseUpdate, ExpenseView, OwnerView,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{
    CreateExpenseCmd, Expense, ExpenseListFilter, ExpenseSort, ExpenseWithOwner, OwnerName,
    Principal, UpdateExpenseCmd, parse_day,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

pub(crate) fn expense_view(expense: Expense, owner: Option<OwnerName>) -> ExpenseView {
    ExpenseView {
        id: expense.id,
        owner_id: expense.owner_id,
        owner: owner.map(|owner| OwnerView {
            id: owner.id,
            first_name: owner.first_name,
            last_name: owner.last_name,
        }),
        title: expense.title,
        price_minor: expense.price_minor,
        date: expense.date,
        expenditure: expense.expenditure,
        created_at: expense.created_at,
        updated_at: expense.updated_at,
    }
}

pub async fn create(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Json(payload): Json<ExpenseNew>,
) -> Result<(StatusCode, Json<ExpenseView>), ServerError> {
    let expense = state
        .engine
        .create_expense(
            &principal,
            CreateExpenseCmd {
                title: payload.title,
                price_minor: payload.price_minor,
                date: payload.date,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(expense_view(expense, None))))
}

/// Lists visible expenses with their owner names.
pub async fn list(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Query(query): Query<ExpenseListQuery>,
) -> Result<Json<Vec<ExpenseView>>, ServerError> {
    let filter = ExpenseListFilter {
        day: query.date.as_deref().and_then(parse_day),
        keyword: query.keyword,
        sort: ExpenseSort::from_param(query.sort_by.as_deref()),
    };

    let rows = state.engine.list_expenses(&principal, &filter).await?;
    Ok(Json(
        rows.into_iter()
            .map(|ExpenseWithOwner { expense, owner }| expense_view(expense, owner))
            .collect(),
    ))
}

pub async fn get(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Path(expense_id): Path<Uuid>,
) -> Result<Json<ExpenseView>, ServerError> {
    let expense = state.engine.expense(&principal, expense_id).await?;
    Ok(Json(expense_view(expense, None)))
}

pub async fn update(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Path(expense_id): Path<Uuid>,
    Json(payload): Json<ExpenseUpdate>,
) -> Result<Json<ExpenseView>, ServerError> {
    let expense = state
        .engine
        .update_expense(
            &principal,
            UpdateExpenseCmd {
                expense_id,
                title: payload.title,
                price_minor: payload.price_minor,
                date: payload.date,
            },
        )
        .await?;

    Ok(Json(expense_view(expense, None)))
}

pub async fn delete(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Path(expense_id): Path<Uuid>,
) -> Result<Json<ExpenseDeleted>, ServerError> {
    state.engine.delete_expense(&principal, expense_id).await?;
    Ok(Json(ExpenseDeleted {
        message: "Expense deleted successfully".to_string(),
    }))
}
