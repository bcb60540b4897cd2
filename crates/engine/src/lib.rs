//! Expense accounting and aggregation engine.
//!
//! The engine records expenses with a write-time budget utilization
//! snapshot, lists them with role-aware visibility, and aggregates spending
//! over trailing month windows.

pub use budget::compute_expenditure;
pub use error::EngineError;
pub use expenses::{CreateExpenseCmd, Expense, ExpenseWithOwner, UpdateExpenseCmd};
pub use ops::{Engine, EngineBuilder, ExpenseListFilter, ExpenseSort};
pub use principal::{AccessPolicy, Principal, Scope};
pub use stats::{ExpenseStats, MonthlySpending, StatsRange, TOP_EXPENSES_LIMIT, densify_monthly};
pub use users::{NewUser, OwnerName, Role, User};
pub use util::parse_day;

mod budget;
mod error;
mod expenses;
mod ops;
mod principal;
mod stats;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
