//! Spending statistics types and the pure pieces of the aggregation.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EngineError, Expense, ResultEngine};

/// How many expenses `top_expenses` carries.
pub const TOP_EXPENSES_LIMIT: u64 = 5;

/// Trailing window selector for statistics.
///
/// A range of `N` months covers the current calendar month plus the `N - 1`
/// before it, starting at midnight UTC of the first day. There is no upper
/// bound.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatsRange {
    #[serde(rename = "3m")]
    ThreeMonths,
    #[serde(rename = "6m")]
    SixMonths,
    #[default]
    #[serde(rename = "12m")]
    TwelveMonths,
}

impl StatsRange {
    /// Reads a range selector. Anything unknown means the default `12m`.
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("3m") => Self::ThreeMonths,
            Some("6m") => Self::SixMonths,
            _ => Self::TwelveMonths,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ThreeMonths => "3m",
            Self::SixMonths => "6m",
            Self::TwelveMonths => "12m",
        }
    }

    pub fn months(self) -> u32 {
        match self {
            Self::ThreeMonths => 3,
            Self::SixMonths => 6,
            Self::TwelveMonths => 12,
        }
    }

    /// First instant included by this range when evaluated at `now`.
    pub fn start(self, now: DateTime<Utc>) -> ResultEngine<DateTime<Utc>> {
        now.date_naive()
            .with_day(1)
            .and_then(|first| first.checked_sub_months(Months::new(self.months() - 1)))
            .map(|day| day.and_time(NaiveTime::MIN).and_utc())
            .ok_or_else(|| {
                EngineError::AggregationFailed(format!(
                    "cannot resolve {} range start",
                    self.as_str()
                ))
            })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlySpending {
    pub year: i32,
    /// 1-based calendar month.
    pub month: u32,
    pub total_minor: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseStats {
    pub range: StatsRange,
    pub start: DateTime<Utc>,
    pub total_spent_minor: i64,
    pub expense_count: u64,
    /// Ascending by `(year, month)`, one entry per month with at least one
    /// expense.
    pub monthly_spending: Vec<MonthlySpending>,
    /// Highest price first.
    pub top_expenses: Vec<Expense>,
}

impl ExpenseStats {
    /// Zero-fills the months between the range start and `now`.
    pub fn densified(mut self, now: DateTime<Utc>) -> Self {
        self.monthly_spending =
            densify_monthly(&self.monthly_spending, self.start.date_naive(), now.date_naive());
        self
    }
}

/// Returns one entry per calendar month from `from` to `to` (inclusive, by
/// month), taking totals from `series` and `0` where it has no entry.
///
/// Entries of `series` outside that span are kept, so no spending is ever
/// dropped.
pub fn densify_monthly(
    series: &[MonthlySpending],
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<MonthlySpending> {
    let mut totals: HashMap<(i32, u32), i64> = series
        .iter()
        .map(|m| ((m.year, m.month), m.total_minor))
        .collect();

    let mut out = Vec::new();
    let mut cursor = (from.year(), from.month());
    let last = (to.year(), to.month());
    while cursor <= last {
        out.push(MonthlySpending {
            year: cursor.0,
            month: cursor.1,
            total_minor: totals.remove(&cursor).unwrap_or(0),
        });
        cursor = if cursor.1 == 12 {
            (cursor.0 + 1, 1)
        } else {
            (cursor.0, cursor.1 + 1)
        };
    }

    if !totals.is_empty() {
        out.extend(totals.into_iter().map(|((year, month), total_minor)| {
            MonthlySpending {
                year,
                month,
                total_minor,
            }
        }));
        out.sort_by_key(|m| (m.year, m.month));
    }
    out
}
