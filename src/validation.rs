//! Stateless field checks
//!
//! Cheap checks that run before any row lock is requested. Anything that needs
//! current account state (existence, currency, sufficiency) is checked later,
//! under lock.

use crate::error::ValidationError;
use crate::models::Money;

/// Require an optional value to be present
pub fn require<T>(value: Option<T>, field: &'static str) -> Result<T, ValidationError> {
    value.ok_or(ValidationError::MissingField { field })
}

/// Require a non-blank string, returning it trimmed
pub fn require_text<'a>(value: &'a str, field: &'static str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField { field });
    }
    Ok(trimmed)
}

/// Require an amount strictly greater than zero
pub fn positive(value: Money, field: &'static str) -> Result<Money, ValidationError> {
    if value.is_positive() {
        Ok(value)
    } else {
        Err(ValidationError::InvalidAmount {
            field,
            value: value.cents(),
        })
    }
}

/// Require an amount of zero or more
pub fn non_negative(value: Money, field: &'static str) -> Result<Money, ValidationError> {
    if value.is_negative() {
        Err(ValidationError::NegativeAmount {
            field,
            value: value.cents(),
        })
    } else {
        Ok(value)
    }
}

/// Require a value to match one of the allowed choices (case-insensitive)
///
/// Returns the index of the matching choice.
pub fn one_of(
    value: &str,
    field: &'static str,
    allowed: &[&'static str],
) -> Result<usize, ValidationError> {
    let needle = value.trim().to_lowercase();
    allowed
        .iter()
        .position(|candidate| *candidate == needle)
        .ok_or_else(|| ValidationError::InvalidEnum {
            field,
            value: value.to_string(),
            allowed: allowed.to_vec(),
        })
}

/// Require a string to fit within a maximum length
pub fn max_len(value: &str, field: &'static str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::InvalidText {
            field,
            reason: "too long",
        });
    }
    Ok(())
}
