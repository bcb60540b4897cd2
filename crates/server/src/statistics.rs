//! Statistics API endpoints

use api_types::stats::{MonthlySpending, Statistic, StatsQuery};
use axum::{
    Extension, Json,
    extract::{Query, State},
};
use chrono::Utc;
use engine::{Principal, StatsRange};

use crate::{ServerError, expenses::expense_view, server::ServerState};

/// Handle requests for spending statistics over a trailing month window
pub async fn get_stats(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Statistic>, ServerError> {
    let now = Utc::now();
    let range = StatsRange::from_param(query.range.as_deref());

    let mut stats = state.engine.expense_stats(&principal, range, now).await?;
    if query.dense.unwrap_or(false) {
        stats = stats.densified(now);
    }

    Ok(Json(Statistic {
        range: stats.range.as_str().to_string(),
        start: stats.start,
        total_spent_minor: stats.total_spent_minor,
        expense_count: stats.expense_count,
        monthly_spending: stats
            .monthly_spending
            .into_iter()
            .map(|entry| MonthlySpending {
                year: entry.year,
                month: entry.month,
                total_minor: entry.total_minor,
            })
            .collect(),
        top_expenses: stats
            .top_expenses
            .into_iter()
            .map(|expense| expense_view(expense, None))
            .collect(),
    }))
}
