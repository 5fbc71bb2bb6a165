//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the service layer.
//! Amounts are typed in decimal major units and converted to integer minor
//! units here, before any service sees them.

pub mod account;
pub mod audit;
pub mod category;
pub mod transaction;

pub use account::{handle_account_command, AccountCommands};
pub use audit::handle_audit_command;
pub use category::{handle_category_command, CategoryCommands};
pub use transaction::{handle_transaction_command, TransactionCommands};

use chrono::NaiveDate;

use crate::error::{LedgerResult, ValidationError};
use crate::models::Money;

/// Parse a decimal amount such as "12.50" into minor units
pub(crate) fn parse_amount(input: &str, field: &'static str) -> LedgerResult<Money> {
    Money::parse(input).map_err(|_| {
        ValidationError::InvalidText {
            field,
            reason: "expected an amount like '1000' or '12.50'",
        }
        .into()
    })
}

/// Parse a YYYY-MM-DD date
pub(crate) fn parse_date(input: &str) -> LedgerResult<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| {
        ValidationError::InvalidText {
            field: "date",
            reason: "expected YYYY-MM-DD",
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("12.50", "amount").unwrap().cents(), 1250);
        assert!(parse_amount("twelve", "amount").unwrap_err().is_validation());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2025-03-01").unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
        );
        assert!(parse_date("03/01/2025").unwrap_err().is_validation());
    }
}
