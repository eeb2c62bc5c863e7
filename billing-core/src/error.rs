use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum BillingError {
    #[error("Validation error on `{field}`: {message}")]
    Validation { field: &'static str, message: String },

    #[error("Bill not found: {0}")]
    NotFound(Uuid),

    #[error("Payment of {attempted} exceeds remaining balance of {balance}")]
    Overpayment { attempted: Decimal, balance: Decimal },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Daily bill number sequence exhausted for {0}")]
    IdentifierExhausted(NaiveDate),

    #[error("Database error: {0}")]
    Database(String),
}

impl BillingError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Whether a bounded retry of the failed operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

pub type BillingResult<T> = Result<T, BillingError>;
