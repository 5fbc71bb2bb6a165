//! Operation log
//!
//! Records every committed create, update, and delete with before/after
//! values in an append-only JSON-lines file. Ledger entries also carry the
//! signed balance deltas they applied, so an account's balance history can be
//! reconciled against the log.

mod entry;
mod logger;

pub use entry::{AuditEntry, EntityType, Operation};
pub use logger::AuditLogger;
