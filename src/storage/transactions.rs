//! Transaction repository for JSON storage
//!
//! Manages loading and saving transactions to transactions.json, with an
//! account index covering both the source and destination side.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::LedgerError;
use crate::models::{AccountId, CategoryId, Transaction, TransactionId};

use super::file_io::DataFile;

/// Serializable transaction data structure
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct TransactionData {
    transactions: Vec<Transaction>,
}

#[derive(Default)]
struct Tables {
    rows: HashMap<TransactionId, Transaction>,
    /// account_id -> transaction_ids touching it
    by_account: HashMap<AccountId, Vec<TransactionId>>,
}

impl Tables {
    fn index(&mut self, txn: &Transaction) {
        self.by_account
            .entry(txn.source_account_id)
            .or_default()
            .push(txn.id);
        if let Some(dest) = txn.dest_account_id {
            self.by_account.entry(dest).or_default().push(txn.id);
        }
    }

    fn unindex(&mut self, txn: &Transaction) {
        for account_id in [Some(txn.source_account_id), txn.dest_account_id]
            .into_iter()
            .flatten()
        {
            if let Some(ids) = self.by_account.get_mut(&account_id) {
                ids.retain(|id| *id != txn.id);
                if ids.is_empty() {
                    self.by_account.remove(&account_id);
                }
            }
        }
    }

    fn put(&mut self, txn: Transaction) -> Option<Transaction> {
        let previous = self.take(txn.id);
        self.index(&txn);
        self.rows.insert(txn.id, txn);
        previous
    }

    fn take(&mut self, id: TransactionId) -> Option<Transaction> {
        let previous = self.rows.remove(&id)?;
        self.unindex(&previous);
        Some(previous)
    }
}

/// Repository for transaction persistence with indexing
pub struct TransactionRepository {
    file: DataFile,
    tables: RwLock<Tables>,
}

fn newest_first(a: &Transaction, b: &Transaction) -> std::cmp::Ordering {
    b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at))
}

impl TransactionRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: DataFile::new(path),
            tables: RwLock::new(Tables::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, LedgerError> {
        self.tables
            .read()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, LedgerError> {
        self.tables
            .write()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire write lock: {}", e)))
    }

    /// Load transactions from disk and build the index
    pub fn load(&self) -> Result<(), LedgerError> {
        let file_data: TransactionData = self.file.load()?;

        let mut tables = self.write()?;
        *tables = Tables::default();
        for txn in file_data.transactions {
            tables.put(txn);
        }

        Ok(())
    }

    /// Save transactions to disk
    pub fn save(&self) -> Result<(), LedgerError> {
        let tables = self.read()?;

        let mut transactions: Vec<_> = tables.rows.values().cloned().collect();
        transactions.sort_by(newest_first);

        self.file.store(&TransactionData { transactions })
    }

    pub fn get(&self, id: TransactionId) -> Result<Option<Transaction>, LedgerError> {
        Ok(self.read()?.rows.get(&id).cloned())
    }

    pub fn exists(&self, id: TransactionId) -> Result<bool, LedgerError> {
        Ok(self.read()?.rows.contains_key(&id))
    }

    /// All transactions, newest first
    pub fn get_all(&self) -> Result<Vec<Transaction>, LedgerError> {
        let mut transactions: Vec<_> = self.read()?.rows.values().cloned().collect();
        transactions.sort_by(newest_first);
        Ok(transactions)
    }

    /// Transactions touching an account on either side, newest first
    pub fn get_by_account(&self, account_id: AccountId) -> Result<Vec<Transaction>, LedgerError> {
        let tables = self.read()?;
        let mut transactions: Vec<_> = tables
            .by_account
            .get(&account_id)
            .into_iter()
            .flatten()
            .filter_map(|id| tables.rows.get(id).cloned())
            .collect();
        transactions.sort_by(newest_first);
        Ok(transactions)
    }

    pub fn get_by_category(&self, category_id: CategoryId) -> Result<Vec<Transaction>, LedgerError> {
        let mut transactions: Vec<_> = self
            .read()?
            .rows
            .values()
            .filter(|t| t.category_id == Some(category_id))
            .cloned()
            .collect();
        transactions.sort_by(newest_first);
        Ok(transactions)
    }

    pub fn count(&self) -> Result<usize, LedgerError> {
        Ok(self.read()?.rows.len())
    }

    /// Insert or replace a row, returning the previous version
    pub(crate) fn upsert(&self, txn: Transaction) -> Result<Option<Transaction>, LedgerError> {
        Ok(self.write()?.put(txn))
    }

    /// Remove a row, returning it
    pub(crate) fn remove(&self, id: TransactionId) -> Result<Option<Transaction>, LedgerError> {
        Ok(self.write()?.take(id))
    }

    /// Put back the version captured by `upsert` or `remove`
    pub(crate) fn restore(
        &self,
        id: TransactionId,
        previous: Option<Transaction>,
    ) -> Result<(), LedgerError> {
        let mut tables = self.write()?;
        match previous {
            Some(txn) => {
                tables.put(txn);
            }
            None => {
                tables.take(id);
            }
        }
        Ok(())
    }
}
