use chrono::{DateTime, Utc};
use sea_orm::{QueryFilter, QueryOrder, QuerySelect, Statement, prelude::*};

use crate::{
    EngineError, Expense, ExpenseStats, MonthlySpending, Principal, ResultEngine, Scope,
    StatsRange, TOP_EXPENSES_LIMIT, expenses,
};

use super::{
    Engine,
    access::{ApplyScope, scope_sql},
};

impl Engine {
    /// Aggregates the principal's spending over a trailing range.
    ///
    /// The range is resolved against `now`. Totals, the monthly series and
    /// the top expenses come from independent queries that run concurrently;
    /// if any of them fails the whole call fails with
    /// [`EngineError::AggregationFailed`].
    pub async fn expense_stats(
        &self,
        principal: &Principal,
        range: StatsRange,
        now: DateTime<Utc>,
    ) -> ResultEngine<ExpenseStats> {
        let start = range.start(now)?;
        let scope = principal.read_scope();
        tracing::debug!(
            user_id = %principal.user_id,
            range = range.as_str(),
            %start,
            "computing expense stats"
        );

        let ((total_spent_minor, expense_count), monthly_spending, top_expenses) = tokio::try_join!(
            self.stats_totals(scope, start),
            self.stats_monthly(scope, start),
            self.stats_top(scope, start),
        )
        .map_err(|err| {
            tracing::error!("expense stats failed: {err}");
            match err {
                err @ EngineError::AggregationFailed(_) => err,
                other => EngineError::AggregationFailed(other.to_string()),
            }
        })?;

        Ok(ExpenseStats {
            range,
            start,
            total_spent_minor,
            expense_count,
            monthly_spending,
            top_expenses,
        })
    }

    async fn stats_totals(&self, scope: Scope, start: DateTime<Utc>) -> ResultEngine<(i64, u64)> {
        let (scope_cond, scope_values) = scope_sql(scope);
        let mut values: Vec<Value> = vec![start.into()];
        values.extend(scope_values);

        let stmt = Statement::from_sql_and_values(
            self.database.get_database_backend(),
            format!(
                "SELECT COALESCE(SUM(price_minor), 0) AS total, COUNT(*) AS count \
                 FROM expenses \
                 WHERE date >= ?{scope_cond};"
            ),
            values,
        );
        let Some(row) = self.database.query_one(stmt).await? else {
            return Ok((0, 0));
        };
        let total: i64 = row.try_get("", "total")?;
        let count: i64 = row.try_get("", "count")?;
        let count = u64::try_from(count)
            .map_err(|_| EngineError::AggregationFailed(format!("invalid count: {count}")))?;
        Ok((total, count))
    }

    async fn stats_monthly(
        &self,
        scope: Scope,
        start: DateTime<Utc>,
    ) -> ResultEngine<Vec<MonthlySpending>> {
        let (scope_cond, scope_values) = scope_sql(scope);
        let mut values: Vec<Value> = vec![start.into()];
        values.extend(scope_values);

        let stmt = Statement::from_sql_and_values(
            self.database.get_database_backend(),
            format!(
                "SELECT CAST(strftime('%Y', date) AS INTEGER) AS year, \
                        CAST(strftime('%m', date) AS INTEGER) AS month, \
                        SUM(price_minor) AS total \
                 FROM expenses \
                 WHERE date >= ?{scope_cond} \
                 GROUP BY year, month \
                 ORDER BY year ASC, month ASC;"
            ),
            values,
        );

        let rows = self.database.query_all(stmt).await?;
        rows.into_iter()
            .map(|row| {
                let year: i32 = row.try_get("", "year")?;
                let month: i32 = row.try_get("", "month")?;
                let total_minor: i64 = row.try_get("", "total")?;
                let month = u32::try_from(month)
                    .ok()
                    .filter(|m| (1..=12).contains(m))
                    .ok_or_else(|| {
                        EngineError::AggregationFailed(format!("invalid month: {month}"))
                    })?;
                Ok(MonthlySpending {
                    year,
                    month,
                    total_minor,
                })
            })
            .collect()
    }

    /// Highest prices first; equal prices by newest date, then by id.
    async fn stats_top(&self, scope: Scope, start: DateTime<Utc>) -> ResultEngine<Vec<Expense>> {
        let models = expenses::Entity::find()
            .apply_scope(scope)
            .filter(expenses::Column::Date.gte(start))
            .order_by_desc(expenses::Column::PriceMinor)
            .order_by_desc(expenses::Column::Date)
            .order_by_asc(expenses::Column::Id)
            .limit(TOP_EXPENSES_LIMIT)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Expense::from).collect())
    }
}
