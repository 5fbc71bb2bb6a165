//! Display formatting for terminal output
//!
//! Provides utilities for formatting data models as tables and detail views.

pub mod account;
pub mod category;
pub mod transaction;

pub use account::{format_account_details, format_account_list};
pub use category::format_category_list;
pub use transaction::{
    format_transaction_details, format_transaction_register, NameLookup,
};
