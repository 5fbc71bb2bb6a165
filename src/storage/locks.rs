//! Pessimistic row locks
//!
//! An exclusive lock per row (account or transaction), held by a unit of work
//! until it commits or is dropped. Waiting is bounded; a lock that cannot be
//! had in time surfaces as a retryable `LockTimeout`.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{AccountId, TransactionId};

/// A lockable row
///
/// Transaction rows order before account rows, and account rows order by id,
/// which is the acquisition order every operation follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RowKey {
    Transaction(TransactionId),
    Account(AccountId),
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transaction(id) => write!(f, "transaction {}", id),
            Self::Account(id) => write!(f, "account {}", id),
        }
    }
}

/// Table of currently held row locks
#[derive(Default)]
pub struct LockTable {
    held: Mutex<HashSet<RowKey>>,
    released: Condvar,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until `key` is free (or `timeout` passes), then take it
    pub fn acquire(&self, key: RowKey, timeout: Duration) -> LedgerResult<RowGuard<'_>> {
        let started = Instant::now();
        let deadline = started + timeout;

        let mut held = self.held.lock().map_err(|_| poisoned())?;
        while held.contains(&key) {
            let now = Instant::now();
            if now >= deadline {
                return Err(LedgerError::LockTimeout {
                    resource: key.to_string(),
                    waited_ms: started.elapsed().as_millis() as u64,
                });
            }
            let (guard, _) = self
                .released
                .wait_timeout(held, deadline - now)
                .map_err(|_| poisoned())?;
            held = guard;
        }
        held.insert(key);
        drop(held);

        debug!(row = %key, waited_us = started.elapsed().as_micros() as u64, "row lock acquired");
        Ok(RowGuard { table: self, key })
    }

    /// Whether any unit of work currently holds `key`
    pub fn is_held(&self, key: RowKey) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&key)
    }

    fn release(&self, key: RowKey) {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        held.remove(&key);
        drop(held);
        self.released.notify_all();
    }
}

fn poisoned() -> LedgerError {
    LedgerError::Storage("row lock table poisoned".into())
}

/// Releases its row when dropped
pub struct RowGuard<'a> {
    table: &'a LockTable,
    key: RowKey,
}

impl RowGuard<'_> {
    pub fn key(&self) -> RowKey {
        self.key
    }
}

impl Drop for RowGuard<'_> {
    fn drop(&mut self) {
        self.table.release(self.key);
    }
}

impl fmt::Debug for RowGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowGuard").field("key", &self.key).finish()
    }
}
