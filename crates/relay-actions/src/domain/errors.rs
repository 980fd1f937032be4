//! Domain errors for action handlers.

use thiserror::Error;

/// Errors from monetary arithmetic.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MoneyError {
    #[error("amount must not be negative, got {0}")]
    Negative(f64),

    #[error("amount is not a finite number")]
    NotFinite,

    #[error("amount {0} exceeds the supported maximum")]
    TooLarge(f64),

    #[error("amount must be a number, got {0}")]
    NotANumber(String),
}
