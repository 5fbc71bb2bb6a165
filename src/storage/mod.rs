//! Storage layer for the dues ledger
//!
//! Provides JSON file storage with atomic writes, automatic directory
//! creation, pessimistic row locks, and all-or-nothing commits of the rows a
//! unit of work staged.

pub mod accounts;
pub mod categories;
pub mod file_io;
pub mod init;
pub mod locks;
pub mod transactions;
pub mod unit_of_work;

pub use accounts::AccountRepository;
pub use categories::CategoryRepository;
pub use file_io::DataFile;
pub use init::initialize_storage;
pub use locks::{LockTable, RowKey};
pub use transactions::TransactionRepository;
pub use unit_of_work::UnitOfWork;

use std::sync::Mutex;
use std::time::Duration;

use tracing::{info, warn};

use crate::audit::{AuditEntry, AuditLogger};
use crate::config::{LedgerPaths, Settings};
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Account, AccountId, Transaction, TransactionId};

use unit_of_work::TransactionWrite;

/// Main storage coordinator that provides access to all repositories
///
/// Shared by reference across threads; every write goes through a
/// [`UnitOfWork`] obtained from [`Storage::begin`].
pub struct Storage {
    paths: LedgerPaths,
    pub accounts: AccountRepository,
    pub transactions: TransactionRepository,
    pub categories: CategoryRepository,
    locks: LockTable,
    /// Serializes the in-memory apply and file writes of concurrent commits
    commit_lock: Mutex<()>,
    audit: AuditLogger,
    lock_timeout: Duration,
}

impl Storage {
    /// Create a new Storage instance
    pub fn new(paths: LedgerPaths) -> LedgerResult<Self> {
        paths.ensure_directories()?;

        Ok(Self {
            accounts: AccountRepository::new(paths.accounts_file()),
            transactions: TransactionRepository::new(paths.transactions_file()),
            categories: CategoryRepository::new(paths.categories_file()),
            locks: LockTable::new(),
            commit_lock: Mutex::new(()),
            audit: AuditLogger::new(paths.audit_log()),
            lock_timeout: Settings::default().lock_timeout(),
            paths,
        })
    }

    /// Open storage with the lock timeout from `settings` and load all data
    pub fn open(paths: LedgerPaths, settings: &Settings) -> LedgerResult<Self> {
        let storage = Self::new(paths)?.with_lock_timeout(settings.lock_timeout());
        storage.load_all()?;
        Ok(storage)
    }

    /// Bound how long a unit of work waits for a row lock
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// Get the paths configuration
    pub fn paths(&self) -> &LedgerPaths {
        &self.paths
    }

    /// The operation log
    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    /// Load all data from disk
    pub fn load_all(&self) -> LedgerResult<()> {
        self.accounts.load()?;
        self.transactions.load()?;
        self.categories.load()?;
        Ok(())
    }

    /// Check if storage has been initialized
    pub fn is_initialized(&self) -> bool {
        self.paths.is_initialized()
    }

    /// Start a unit of work
    pub fn begin(&self) -> UnitOfWork<'_> {
        UnitOfWork::new(self)
    }

    /// Apply staged rows in memory, then persist; restore everything on failure
    fn apply(
        &self,
        accounts: Vec<Account>,
        transactions: Vec<TransactionWrite>,
    ) -> LedgerResult<()> {
        if accounts.is_empty() && transactions.is_empty() {
            return Ok(());
        }

        let _commit = self
            .commit_lock
            .lock()
            .map_err(|_| LedgerError::Storage("commit lock poisoned".into()))?;

        let mut account_undo: Vec<(AccountId, Option<Account>)> = Vec::new();
        let mut transaction_undo: Vec<(TransactionId, Option<Transaction>)> = Vec::new();

        let (account_count, transaction_count) = (accounts.len(), transactions.len());
        let result = self.apply_rows(
            accounts,
            transactions,
            &mut account_undo,
            &mut transaction_undo,
        );

        match result {
            Ok(()) => {
                info!(
                    accounts = account_count,
                    transactions = transaction_count,
                    "commit applied"
                );
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "commit failed; rolling back");
                self.undo(account_undo, transaction_undo);
                Err(LedgerError::Storage(format!("commit rolled back: {}", err)))
            }
        }
    }

    fn apply_rows(
        &self,
        accounts: Vec<Account>,
        transactions: Vec<TransactionWrite>,
        account_undo: &mut Vec<(AccountId, Option<Account>)>,
        transaction_undo: &mut Vec<(TransactionId, Option<Transaction>)>,
    ) -> LedgerResult<()> {
        let accounts_changed = !accounts.is_empty();
        let transactions_changed = !transactions.is_empty();

        for account in accounts {
            let id = account.id;
            let previous = self.accounts.replace(account)?;
            account_undo.push((id, previous));
        }

        for write in transactions {
            match write {
                TransactionWrite::Upsert(txn) => {
                    let id = txn.id;
                    let previous = self.transactions.upsert(txn)?;
                    transaction_undo.push((id, previous));
                }
                TransactionWrite::Remove(id) => {
                    let previous = self.transactions.remove(id)?;
                    transaction_undo.push((id, previous));
                }
            }
        }

        if accounts_changed {
            self.accounts.save()?;
        }
        if transactions_changed {
            self.transactions.save()?;
        }
        Ok(())
    }

    fn undo(
        &self,
        account_undo: Vec<(AccountId, Option<Account>)>,
        transaction_undo: Vec<(TransactionId, Option<Transaction>)>,
    ) {
        let accounts_changed = !account_undo.is_empty();
        let transactions_changed = !transaction_undo.is_empty();

        for (id, previous) in transaction_undo.into_iter().rev() {
            if let Err(e) = self.transactions.restore(id, previous) {
                warn!(transaction = %id, error = %e, "failed to restore transaction row");
            }
        }
        for (id, previous) in account_undo.into_iter().rev() {
            if let Err(e) = self.accounts.restore(id, previous) {
                warn!(account = %id, error = %e, "failed to restore account row");
            }
        }

        // Files that were already rewritten must go back to the old rows too
        if accounts_changed {
            if let Err(e) = self.accounts.save() {
                warn!(error = %e, "failed to rewrite accounts after rollback");
            }
        }
        if transactions_changed {
            if let Err(e) = self.transactions.save() {
                warn!(error = %e, "failed to rewrite transactions after rollback");
            }
        }
    }

    /// Append committed entries to the operation log
    ///
    /// The data is already durable at this point, so a log failure is only
    /// reported.
    pub(crate) fn append_audit(&self, entries: &[AuditEntry]) {
        if let Err(e) = self.audit.log_batch(entries) {
            warn!(error = %e, entries = entries.len(), "failed to write operation log");
        }
    }
}
