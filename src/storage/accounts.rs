//! Account repository for JSON storage
//!
//! Manages loading and saving accounts to accounts.json. Rows are only
//! replaced through a committed unit of work; this type never decides on a
//! balance by itself.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::LedgerError;
use crate::models::{Account, AccountId};

use super::file_io::DataFile;

/// Serializable account data structure
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct AccountData {
    accounts: Vec<Account>,
}

/// Repository for account persistence
pub struct AccountRepository {
    file: DataFile,
    data: RwLock<HashMap<AccountId, Account>>,
}

impl AccountRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: DataFile::new(path),
            data: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<AccountId, Account>>, LedgerError> {
        self.data
            .read()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<AccountId, Account>>, LedgerError> {
        self.data
            .write()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire write lock: {}", e)))
    }

    /// Load accounts from disk
    pub fn load(&self) -> Result<(), LedgerError> {
        let file_data: AccountData = self.file.load()?;

        let mut data = self.write()?;
        data.clear();
        for account in file_data.accounts {
            data.insert(account.id, account);
        }

        Ok(())
    }

    /// Save accounts to disk
    pub fn save(&self) -> Result<(), LedgerError> {
        let data = self.read()?;

        let mut accounts: Vec<_> = data.values().cloned().collect();
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        self.file.store(&AccountData { accounts })
    }

    /// Get an account by ID (unlocked snapshot, for display only)
    pub fn get(&self, id: AccountId) -> Result<Option<Account>, LedgerError> {
        Ok(self.read()?.get(&id).cloned())
    }

    /// Get all accounts, sorted by name
    pub fn get_all(&self) -> Result<Vec<Account>, LedgerError> {
        let mut accounts: Vec<_> = self.read()?.values().cloned().collect();
        accounts.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(accounts)
    }

    /// Get all active accounts
    pub fn get_active(&self) -> Result<Vec<Account>, LedgerError> {
        Ok(self.get_all()?.into_iter().filter(|a| a.active).collect())
    }

    /// Get an account by name (case-insensitive)
    pub fn get_by_name(&self, name: &str) -> Result<Option<Account>, LedgerError> {
        let name_lower = name.trim().to_lowercase();
        Ok(self
            .read()?
            .values()
            .find(|a| a.name.to_lowercase() == name_lower)
            .cloned())
    }

    /// The account flagged as default, if any
    pub fn get_default(&self) -> Result<Option<Account>, LedgerError> {
        Ok(self.read()?.values().find(|a| a.is_default).cloned())
    }

    pub fn exists(&self, id: AccountId) -> Result<bool, LedgerError> {
        Ok(self.read()?.contains_key(&id))
    }

    /// Check if an account name is already taken
    pub fn name_exists(
        &self,
        name: &str,
        exclude_id: Option<AccountId>,
    ) -> Result<bool, LedgerError> {
        let name_lower = name.trim().to_lowercase();
        Ok(self
            .read()?
            .values()
            .any(|a| a.name.to_lowercase() == name_lower && Some(a.id) != exclude_id))
    }

    pub fn count(&self) -> Result<usize, LedgerError> {
        Ok(self.read()?.len())
    }

    /// Replace a row, returning the previous version
    pub(crate) fn replace(&self, account: Account) -> Result<Option<Account>, LedgerError> {
        Ok(self.write()?.insert(account.id, account))
    }

    /// Put back the version captured by `replace`
    pub(crate) fn restore(
        &self,
        id: AccountId,
        previous: Option<Account>,
    ) -> Result<(), LedgerError> {
        let mut data = self.write()?;
        match previous {
            Some(account) => {
                data.insert(id, account);
            }
            None => {
                data.remove(&id);
            }
        }
        Ok(())
    }
}
