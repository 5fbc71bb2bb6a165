//! Service layer for the dues ledger
//!
//! The service layer provides business logic on top of the storage layer.
//! Every balance change goes through [`LedgerEngine`]; the account and
//! category services only manage metadata.

pub mod account;
pub mod category;
pub mod ledger;

pub use account::AccountService;
pub use category::CategoryService;
pub use ledger::{CreateTransactionInput, LedgerEngine, TransactionFilter, TransactionPatch};
