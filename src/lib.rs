//! dues-ledger - balance-consistent ledger for residential building dues
//!
//! This library records income, expenses, and transfers against a building's
//! accounts and keeps every account balance equal to the net effect of the
//! transactions recorded against it, even under concurrent writers.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `models`: Core data models (accounts, transactions, categories, money)
//! - `validation`: Shape checks run before any lock is taken
//! - `storage`: JSON file storage, row locks, and units of work
//! - `services`: The ledger engine and account/category management
//! - `audit`: Append-only operation log
//! - `cli` / `display`: Command handlers and terminal formatting
//!
//! # Example
//!
//! ```rust,ignore
//! use dues_ledger::config::{LedgerPaths, Settings};
//! use dues_ledger::services::{CreateTransactionInput, LedgerEngine};
//! use dues_ledger::storage::Storage;
//!
//! let paths = LedgerPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let storage = Storage::open(paths, &settings)?;
//!
//! let engine = LedgerEngine::new(&storage);
//! engine.create(CreateTransactionInput::income(operating, amount, today))?;
//! ```

use std::sync::Once;

use tracing_subscriber::EnvFilter;

pub mod audit;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
pub mod validation;

pub use error::{LedgerError, LedgerResult};

static TRACING: Once = Once::new();

/// Install the stderr tracing subscriber; later calls are no-ops
///
/// The filter comes from `RUST_LOG`, defaulting to `dues_ledger=info`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("dues_ledger=info"));
        // A subscriber installed by the host application wins
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}
