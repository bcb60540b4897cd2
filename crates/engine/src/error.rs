//! The module contains the error the engine can throw.
//!
//! The errors are:
//!
//! - [`Validation`] thrown when a required field is missing or malformed.
//! - [`KeyNotFound`] thrown when an expense or a user are not found.
//! - [`Forbidden`] thrown when the principal may not touch a record.
//! - [`InvalidBudget`] thrown when an owner's budget limit cannot be used to
//!   compute utilization.
//! - [`AggregationFailed`] thrown when any statistics query fails.
//!
//!  [`Validation`]: EngineError::Validation
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`Forbidden`]: EngineError::Forbidden
//!  [`InvalidBudget`]: EngineError::InvalidBudget
//!  [`AggregationFailed`]: EngineError::AggregationFailed
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not authenticated: {0}")]
    Unauthenticated(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid budget: {0}")]
    InvalidBudget(String),
    #[error("Aggregation failed: {0}")]
    AggregationFailed(String),
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::Unauthenticated(a), Self::Unauthenticated(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidBudget(a), Self::InvalidBudget(b)) => a == b,
            (Self::AggregationFailed(a), Self::AggregationFailed(b)) => a == b,
            (Self::PasswordHash(a), Self::PasswordHash(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
