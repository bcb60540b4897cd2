//! Budget utilization.
//!
//! Every expense stores the share of its owner's budget limit it represents,
//! as a whole percentage computed when the expense is written. The value is a
//! snapshot: changing the budget limit later does not touch stored expenses.

use crate::{EngineError, ResultEngine};

/// Returns `round(price / budget_limit * 100)`.
///
/// Rounding is half-up towards positive infinity (`-0.5` rounds to `0`,
/// `2.5` rounds to `3`). The result is not clamped, a single expense may be
/// well over `100`. Both amounts must be in the same minor unit.
///
/// Fails with [`EngineError::InvalidBudget`] when `budget_limit_minor` is not
/// positive instead of producing an infinite or undefined percentage.
pub fn compute_expenditure(price_minor: i64, budget_limit_minor: i64) -> ResultEngine<i64> {
    if budget_limit_minor <= 0 {
        return Err(EngineError::InvalidBudget(format!(
            "budget limit must be > 0, got {budget_limit_minor}"
        )));
    }

    // floor(price * 100 / budget + 1/2), kept exact in integer arithmetic.
    let numerator = 200 * i128::from(price_minor) + i128::from(budget_limit_minor);
    let denominator = 2 * i128::from(budget_limit_minor);
    let percent = numerator.div_euclid(denominator);

    i64::try_from(percent)
        .map_err(|_| EngineError::InvalidBudget("utilization out of range".to_string()))
}

/// Validates a budget limit supplied by a caller.
pub(crate) fn ensure_budget_limit(budget_limit_minor: i64) -> ResultEngine<()> {
    if budget_limit_minor <= 0 {
        return Err(EngineError::Validation(
            "budget limit must be > 0".to_string(),
        ));
    }
    Ok(())
}
