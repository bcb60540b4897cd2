use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod user {
    use super::*;

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub enum Role {
        #[default]
        User,
        Admin,
    }

    /// Sign-up request. New accounts always get the `User` role.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct UserNew {
        pub first_name: String,
        pub last_name: String,
        pub email: String,
        pub password: String,
        pub budget_limit_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct BudgetUpdate {
        pub budget_limit_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct UserView {
        pub id: Uuid,
        pub email: String,
        pub first_name: String,
        pub last_name: String,
        pub budget_limit_minor: i64,
        pub role: Role,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }
}

pub mod expense {
    use super::*;

    /// Create request. Fields are optional on the wire so that missing ones
    /// are reported as a validation error.
    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ExpenseNew {
        pub title: Option<String>,
        pub price_minor: Option<i64>,
        /// RFC 3339 timestamp or `YYYY-MM-DD`.
        pub date: Option<String>,
    }

    /// Update request. Absent fields are left untouched.
    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ExpenseUpdate {
        pub title: Option<String>,
        pub price_minor: Option<i64>,
        pub date: Option<String>,
    }

    /// Listing query string.
    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ExpenseListQuery {
        /// Calendar day; unparseable values are ignored.
        pub date: Option<String>,
        pub keyword: Option<String>,
        /// `highprice`, `lowprice`, `olddate` or `newdate` (default).
        pub sort_by: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct OwnerView {
        pub id: Uuid,
        pub first_name: String,
        pub last_name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ExpenseView {
        pub id: Uuid,
        pub owner_id: Uuid,
        /// Only set on listings.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub owner: Option<OwnerView>,
        pub title: String,
        pub price_minor: i64,
        pub date: DateTime<Utc>,
        pub expenditure: i64,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseDeleted {
        pub message: String,
    }
}

pub mod stats {
    use super::*;
    use crate::expense::ExpenseView;

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct StatsQuery {
        /// `3m`, `6m` or `12m` (default).
        pub range: Option<String>,
        /// Zero-fill months without expenses.
        pub dense: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "camelCase")]
    pub struct MonthlySpending {
        pub year: i32,
        pub month: u32,
        pub total_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Statistic {
        pub range: String,
        pub start: DateTime<Utc>,
        pub total_spent_minor: i64,
        pub expense_count: u64,
        pub monthly_spending: Vec<MonthlySpending>,
        pub top_expenses: Vec<ExpenseView>,
    }
}
