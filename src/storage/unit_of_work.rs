//! Unit of work
//!
//! One ledger operation runs inside one `UnitOfWork`. It owns the row locks
//! the operation takes, a working copy of every locked account, and the rows
//! staged for writing. `commit` hands the staged rows to storage as a single
//! atomic batch; dropping the unit of work without committing discards them
//! and releases every lock.

use std::collections::BTreeMap;

use tracing::debug;

use crate::audit::AuditEntry;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Account, AccountId, Transaction, TransactionId};

use super::locks::{RowGuard, RowKey};
use super::Storage;

/// A staged change to the transaction table
#[derive(Debug, Clone)]
pub(crate) enum TransactionWrite {
    Upsert(Transaction),
    Remove(TransactionId),
}

/// A locked account and whether it has been changed
struct LockedAccount {
    account: Account,
    dirty: bool,
}

/// Locks and staged writes of a single ledger operation
pub struct UnitOfWork<'s> {
    storage: &'s Storage,
    guards: Vec<RowGuard<'s>>,
    accounts: BTreeMap<AccountId, LockedAccount>,
    transactions: Vec<TransactionWrite>,
    audit: Vec<AuditEntry>,
    finished: bool,
}

impl<'s> UnitOfWork<'s> {
    pub(crate) fn new(storage: &'s Storage) -> Self {
        Self {
            storage,
            guards: Vec::new(),
            accounts: BTreeMap::new(),
            transactions: Vec::new(),
            audit: Vec::new(),
            finished: false,
        }
    }

    fn holds(&self, key: RowKey) -> bool {
        self.guards.iter().any(|g| g.key() == key)
    }

    /// Lock a transaction row and read its current version
    ///
    /// Returns `None` (holding no lock) if the row does not exist. Must be
    /// called before any account is locked.
    pub fn lock_transaction(&mut self, id: TransactionId) -> LedgerResult<Option<Transaction>> {
        let key = RowKey::Transaction(id);
        if self.holds(key) {
            return self.storage.transactions.get(id);
        }
        if !self.accounts.is_empty() {
            return Err(LedgerError::Storage(format!(
                "lock order violation: {} requested after account rows",
                key
            )));
        }

        let guard = self.storage.locks.acquire(key, self.storage.lock_timeout)?;
        let Some(txn) = self.storage.transactions.get(id)? else {
            return Ok(None);
        };
        self.guards.push(guard);
        Ok(Some(txn))
    }

    /// Lock an account row and return its current state
    ///
    /// Re-entrant: an account already locked by this unit of work is returned
    /// from the working copy, including changes saved so far. Accounts must
    /// be locked in ascending id order.
    pub fn get_for_update(&mut self, id: AccountId) -> LedgerResult<Account> {
        if let Some(locked) = self.accounts.get(&id) {
            return Ok(locked.account.clone());
        }

        if let Some((highest, _)) = self.accounts.last_key_value() {
            if *highest > id {
                return Err(LedgerError::Storage(format!(
                    "lock order violation: account {} requested after account {}",
                    id, highest
                )));
            }
        }

        let guard = self
            .storage
            .locks
            .acquire(RowKey::Account(id), self.storage.lock_timeout)?;
        let account = self
            .storage
            .accounts
            .get(id)?
            .ok_or_else(|| LedgerError::account_not_found(id.to_string()))?;

        self.guards.push(guard);
        self.accounts.insert(
            id,
            LockedAccount {
                account: account.clone(),
                dirty: false,
            },
        );
        Ok(account)
    }

    /// Lock a set of accounts in ascending id order
    pub fn lock_accounts(
        &mut self,
        ids: impl IntoIterator<Item = AccountId>,
    ) -> LedgerResult<BTreeMap<AccountId, Account>> {
        let mut ids: Vec<_> = ids.into_iter().collect();
        ids.sort();
        ids.dedup();

        let mut locked = BTreeMap::new();
        for id in ids {
            locked.insert(id, self.get_for_update(id)?);
        }
        Ok(locked)
    }

    /// Stage a changed account; it must have been locked through this unit
    pub fn save_account(&mut self, account: Account) -> LedgerResult<()> {
        match self.accounts.get_mut(&account.id) {
            Some(locked) => {
                locked.account = account;
                locked.dirty = true;
                Ok(())
            }
            None => Err(LedgerError::Storage(format!(
                "account {} saved without holding its lock",
                account.id
            ))),
        }
    }

    /// Stage a brand-new account
    pub fn insert_account(&mut self, account: Account) -> LedgerResult<()> {
        if self.storage.accounts.exists(account.id)? {
            return Err(LedgerError::Duplicate {
                entity_type: "Account",
                identifier: account.id.to_string(),
            });
        }
        let guard = self
            .storage
            .locks
            .acquire(RowKey::Account(account.id), self.storage.lock_timeout)?;
        self.guards.push(guard);
        self.accounts.insert(
            account.id,
            LockedAccount {
                account,
                dirty: true,
            },
        );
        Ok(())
    }

    /// Stage a transaction row for insertion or replacement
    pub fn stage_transaction(&mut self, txn: Transaction) {
        self.transactions.push(TransactionWrite::Upsert(txn));
    }

    /// Stage a transaction row for removal
    pub fn stage_removal(&mut self, id: TransactionId) {
        self.transactions.push(TransactionWrite::Remove(id));
    }

    /// Queue an operation log entry, written only if the commit succeeds
    pub fn record(&mut self, entry: AuditEntry) {
        self.audit.push(entry);
    }

    /// Apply every staged write atomically, then release the locks
    pub fn commit(mut self) -> LedgerResult<()> {
        let accounts: Vec<Account> = std::mem::take(&mut self.accounts)
            .into_values()
            .filter(|locked| locked.dirty)
            .map(|locked| locked.account)
            .collect();
        let transactions = std::mem::take(&mut self.transactions);
        let audit = std::mem::take(&mut self.audit);
        self.finished = true;

        self.storage.apply(accounts, transactions)?;
        self.storage.append_audit(&audit);
        Ok(())
    }
}

impl Drop for UnitOfWork<'_> {
    fn drop(&mut self) {
        if !self.finished && (!self.transactions.is_empty() || self.accounts.values().any(|a| a.dirty))
        {
            debug!(
                rows = self.guards.len(),
                "unit of work dropped without commit; staged writes discarded"
            );
        }
    }
}

impl std::fmt::Debug for UnitOfWork<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("locked", &self.guards)
            .field("staged_transactions", &self.transactions.len())
            .finish()
    }
}
