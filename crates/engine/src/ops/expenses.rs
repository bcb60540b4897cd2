use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    CreateExpenseCmd, EngineError, Expense, Principal, ResultEngine, UpdateExpenseCmd,
    budget::compute_expenditure,
    expenses,
    util::{normalize_optional_text, normalize_title, parse_expense_date},
};

use super::{Engine, access::ApplyScope, with_tx};

const MISSING_FIELDS: &str = "please provide title, price, and date";

/// A zero price counts as missing, like an absent one.
fn provided_price(price_minor: Option<i64>) -> Option<i64> {
    price_minor.filter(|p| *p != 0)
}

fn parse_date_field(raw: &str) -> ResultEngine<DateTime<Utc>> {
    parse_expense_date(raw)
        .ok_or_else(|| EngineError::Validation(format!("invalid date: {}", raw.trim())))
}

fn validate_create(cmd: &CreateExpenseCmd) -> ResultEngine<(String, i64, DateTime<Utc>)> {
    let title = normalize_optional_text(cmd.title.as_deref());
    let price_minor = provided_price(cmd.price_minor);
    let date = normalize_optional_text(cmd.date.as_deref());

    let (Some(title), Some(price_minor), Some(date)) = (title, price_minor, date) else {
        return Err(EngineError::Validation(MISSING_FIELDS.to_string()));
    };

    Ok((title, price_minor, parse_date_field(&date)?))
}

impl Engine {
    /// Records a new expense for the principal.
    ///
    /// `expenditure` is computed against the principal's current budget
    /// limit and stored with the record.
    pub async fn create_expense(
        &self,
        principal: &Principal,
        cmd: CreateExpenseCmd,
    ) -> ResultEngine<Expense> {
        with_tx!(self, |db_tx| {
            let owner = self.require_user(&db_tx, principal.user_id).await?;
            let (title, price_minor, date) = validate_create(&cmd)?;
            let expenditure = compute_expenditure(price_minor, owner.budget_limit_minor)?;

            let now = Utc::now();
            let expense = Expense {
                id: Uuid::new_v4(),
                owner_id: owner.id,
                title,
                price_minor,
                date,
                expenditure,
                created_at: now,
                updated_at: now,
            };
            let model = expenses::ActiveModel::from(&expense).insert(&db_tx).await?;
            tracing::info!(
                expense_id = %expense.id,
                owner_id = %expense.owner_id,
                expenditure,
                "expense created"
            );

            Ok(Expense::from(model))
        })
    }

    /// Returns a single expense visible to the principal.
    pub async fn expense(&self, principal: &Principal, expense_id: Uuid) -> ResultEngine<Expense> {
        expenses::Entity::find_by_id(expense_id)
            .apply_scope(principal.read_scope())
            .one(&self.database)
            .await?
            .map(Expense::from)
            .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))
    }

    /// Updates an expense and recomputes its `expenditure`.
    ///
    /// Absent fields keep their stored value. Utilization is recomputed from
    /// the resulting price against the owner's budget limit as it is now.
    pub async fn update_expense(
        &self,
        principal: &Principal,
        cmd: UpdateExpenseCmd,
    ) -> ResultEngine<Expense> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_expense_write(&db_tx, principal, cmd.expense_id)
                .await?;
            let owner = self.require_user(&db_tx, model.owner_id).await?;

            let title = normalize_optional_text(cmd.title.as_deref())
                .unwrap_or_else(|| model.title.clone());
            let price_minor = provided_price(cmd.price_minor).unwrap_or(model.price_minor);
            let date = match normalize_optional_text(cmd.date.as_deref()) {
                Some(raw) => parse_date_field(&raw)?,
                None => model.date,
            };
            let expenditure = compute_expenditure(price_minor, owner.budget_limit_minor)?;

            let mut active: expenses::ActiveModel = model.into();
            active.title_norm = ActiveValue::Set(normalize_title(&title));
            active.title = ActiveValue::Set(title);
            active.price_minor = ActiveValue::Set(price_minor);
            active.date = ActiveValue::Set(date);
            active.expenditure = ActiveValue::Set(expenditure);
            active.updated_at = ActiveValue::Set(Utc::now());
            let updated = active.update(&db_tx).await?;
            tracing::info!(expense_id = %updated.id, expenditure, "expense updated");

            Ok(Expense::from(updated))
        })
    }

    /// Deletes an expense. Same authorization as [`Engine::update_expense`].
    pub async fn delete_expense(&self, principal: &Principal, expense_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_expense_write(&db_tx, principal, expense_id)
                .await?;
            expenses::Entity::delete_by_id(model.id)
                .exec(&db_tx)
                .await?;
            tracing::info!(expense_id = %model.id, "expense deleted");
            Ok(())
        })
    }
}
