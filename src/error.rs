//! Custom error types for the dues ledger
//!
//! This module defines the error hierarchy for the application using thiserror
//! for ergonomic error definitions. Ledger operations surface one of four
//! tagged kinds (validation, not found, insufficient balance, storage) plus a
//! retryable lock timeout.

use thiserror::Error;

use crate::models::Money;

/// Field- and shape-level validation failures
///
/// These are detected before any row lock is taken, except for the checks
/// that need locked account state (currency, activity, overflow).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was not supplied
    #[error("missing required field '{field}'")]
    MissingField { field: &'static str },

    /// An amount was zero or negative
    #[error("'{field}' must be greater than zero (got {value})")]
    InvalidAmount { field: &'static str, value: i64 },

    /// An amount that may be zero was negative
    #[error("'{field}' must not be negative (got {value})")]
    NegativeAmount { field: &'static str, value: i64 },

    /// A value is not one of the allowed choices
    #[error("invalid value '{value}' for '{field}' (expected one of: {})", .allowed.join(", "))]
    InvalidEnum {
        field: &'static str,
        value: String,
        allowed: Vec<&'static str>,
    },

    /// A field was supplied where the transaction kind does not take one
    #[error("field '{field}' is not allowed for {kind} transactions")]
    UnexpectedField {
        field: &'static str,
        kind: &'static str,
    },

    /// A transfer names the same account on both sides
    #[error("cannot transfer to the same account")]
    SameAccount,

    /// Transfer accounts hold different currencies
    #[error("currency mismatch: {source_currency} -> {dest_currency}")]
    CurrencyMismatch {
        source_currency: String,
        dest_currency: String,
    },

    /// A new effect targets an archived account
    #[error("account '{0}' is archived")]
    InactiveAccount(String),

    /// A text field is empty or too long
    #[error("invalid '{field}': {reason}")]
    InvalidText {
        field: &'static str,
        reason: &'static str,
    },

    /// Balance arithmetic left the representable range
    #[error("balance overflow on account '{0}'")]
    Overflow(String),
}

/// The main error type for ledger operations
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Malformed or inconsistent input
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Duplicate entity errors
    #[error("{entity_type} already exists: {identifier}")]
    Duplicate {
        entity_type: &'static str,
        identifier: String,
    },

    /// A debit would drive an account balance below zero
    #[error("Insufficient balance in account '{account}': need {needed}, have {available}")]
    InsufficientBalance {
        account: String,
        needed: Money,
        available: Money,
    },

    /// A row lock could not be acquired in time
    #[error("Timed out after {waited_ms}ms waiting for lock on {resource}")]
    LockTimeout { resource: String, waited_ms: u64 },

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Create a "not found" error for accounts
    pub fn account_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Account",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for categories
    pub fn category_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Category",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for transactions
    pub fn transaction_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Transaction",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is an insufficient balance error
    pub fn is_insufficient_balance(&self) -> bool {
        matches!(self, Self::InsufficientBalance { .. })
    }

    /// Whether the whole operation may simply be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockTimeout { .. })
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
