use chrono::{Duration, NaiveDate, NaiveTime};
use sea_orm::{
    QueryFilter, QueryOrder,
    prelude::*,
    sea_query::{Expr, LikeExpr},
};

use crate::{
    ExpenseWithOwner, OwnerName, Principal, ResultEngine, expenses, users,
    util::{like_contains_pattern, normalize_optional_text, normalize_title},
};

use super::{Engine, access::ApplyScope};

/// Ordering of an expense listing.
///
/// Equal keys are ordered by expense id so listings are stable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExpenseSort {
    /// Price, highest first.
    HighPrice,
    /// Price, lowest first.
    LowPrice,
    /// Date, oldest first.
    OldDate,
    /// Date, newest first.
    #[default]
    NewDate,
}

impl ExpenseSort {
    /// Reads a `sortBy` value. Anything unknown means [`ExpenseSort::NewDate`].
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("highprice") => Self::HighPrice,
            Some("lowprice") => Self::LowPrice,
            Some("olddate") => Self::OldDate,
            _ => Self::NewDate,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::HighPrice => "highprice",
            Self::LowPrice => "lowprice",
            Self::OldDate => "olddate",
            Self::NewDate => "newdate",
        }
    }

    fn apply<Q: QueryOrder>(self, query: Q) -> Q {
        let query = match self {
            Self::HighPrice => query.order_by_desc(expenses::Column::PriceMinor),
            Self::LowPrice => query.order_by_asc(expenses::Column::PriceMinor),
            Self::OldDate => query.order_by_asc(expenses::Column::Date),
            Self::NewDate => query.order_by_desc(expenses::Column::Date),
        };
        query.order_by_asc(expenses::Column::Id)
    }
}

/// Criteria for listing expenses.
#[derive(Clone, Debug, Default)]
pub struct ExpenseListFilter {
    /// Calendar day (UTC). Matches dates in `[day 00:00, next day 00:00)`.
    pub day: Option<NaiveDate>,
    /// Case-insensitive literal substring of the title.
    pub keyword: Option<String>,
    pub sort: ExpenseSort,
}

trait ApplyListFilters: QueryFilter + Sized {
    fn apply_list_filters(self, filter: &ExpenseListFilter) -> Self;
}

impl<T> ApplyListFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_list_filters(mut self, filter: &ExpenseListFilter) -> Self {
        if let Some(day) = filter.day {
            let from = day.and_time(NaiveTime::MIN).and_utc();
            let to = from + Duration::days(1);
            self = self
                .filter(expenses::Column::Date.gte(from))
                .filter(expenses::Column::Date.lt(to));
        }

        if let Some(keyword) = normalize_optional_text(filter.keyword.as_deref()) {
            let pattern = like_contains_pattern(&normalize_title(&keyword));
            self = self.filter(
                Expr::col((expenses::Entity, expenses::Column::TitleNorm))
                    .like(LikeExpr::new(pattern).escape('\\')),
            );
        }

        self
    }
}

impl Engine {
    /// Lists the expenses visible to the principal that match `filter`.
    ///
    /// Non-admins only ever see their own expenses. Every row carries the
    /// owner's name and nothing else about the owner.
    pub async fn list_expenses(
        &self,
        principal: &Principal,
        filter: &ExpenseListFilter,
    ) -> ResultEngine<Vec<ExpenseWithOwner>> {
        tracing::debug!(
            user_id = %principal.user_id,
            ?filter,
            "listing expenses"
        );

        let query = expenses::Entity::find()
            .find_also_related(users::Entity)
            .apply_scope(principal.read_scope())
            .apply_list_filters(filter);
        let query = filter.sort.apply(query);

        let rows: Vec<(expenses::Model, Option<users::Model>)> =
            query.all(&self.database).await?;

        Ok(rows
            .into_iter()
            .map(|(expense, owner)| ExpenseWithOwner {
                expense: expense.into(),
                owner: owner.map(OwnerName::from),
            })
            .collect())
    }
}
