//! Core data models for the dues ledger
//!
//! This module contains the data structures of the ledger domain: accounts,
//! transactions and their balance effects, categories, and money.

pub mod account;
pub mod category;
pub mod ids;
pub mod money;
pub mod transaction;

pub use account::{Account, AccountKind};
pub use category::{Category, CategoryKind};
pub use ids::{AccountId, CategoryId, TransactionId};
pub use money::Money;
pub use transaction::{Effect, Posting, Transaction, TransactionKind};
