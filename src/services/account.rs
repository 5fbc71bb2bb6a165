//! Account service
//!
//! Account management: creation with an opening balance, lookups, and the
//! metadata changes (rename, archive, default flag). After creation an
//! account's balance is only ever changed by the ledger engine; the writes
//! here go through a unit of work so they never race with one.

use std::collections::BTreeMap;

use tracing::info;

use crate::audit::{AuditEntry, EntityType};
use crate::error::{LedgerError, LedgerResult, ValidationError};
use crate::models::ids::unique_match;
use crate::models::{Account, AccountId, AccountKind, Money};
use crate::storage::Storage;
use crate::validation;

/// Service for account management
pub struct AccountService<'a> {
    storage: &'a Storage,
}

impl<'a> AccountService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Create a new account
    pub fn create(
        &self,
        name: &str,
        kind: AccountKind,
        currency: &str,
        opening_balance: Money,
    ) -> LedgerResult<Account> {
        let name = validation::require_text(name, "name")?;
        validation::non_negative(opening_balance, "opening_balance")?;

        if self.storage.accounts.name_exists(name, None)? {
            return Err(LedgerError::Duplicate {
                entity_type: "Account",
                identifier: name.to_string(),
            });
        }

        let account = Account::with_opening_balance(name, kind, currency, opening_balance);
        account.validate()?;

        let mut uow = self.storage.begin();
        uow.insert_account(account.clone())?;
        uow.record(AuditEntry::create(
            EntityType::Account,
            account.id.full(),
            Some(account.name.clone()),
            &account,
        ));
        uow.commit()?;

        info!(account = %account.id, name = %account.name, "account created");
        Ok(account)
    }

    pub fn get(&self, id: AccountId) -> LedgerResult<Option<Account>> {
        self.storage.accounts.get(id)
    }

    /// Find an account by name, full ID, or the short ID shown in listings
    pub fn find(&self, identifier: &str) -> LedgerResult<Option<Account>> {
        if let Some(account) = self.storage.accounts.get_by_name(identifier)? {
            return Ok(Some(account));
        }

        if let Ok(id) = identifier.parse::<AccountId>() {
            return self.storage.accounts.get(id);
        }

        Ok(unique_match(
            self.storage
                .accounts
                .get_all()?
                .into_iter()
                .filter(|a| a.id.starts_with(identifier)),
        ))
    }

    /// Like `find`, but a missing account is an error
    pub fn require(&self, identifier: &str) -> LedgerResult<Account> {
        self.find(identifier)?
            .ok_or_else(|| LedgerError::account_not_found(identifier))
    }

    /// All accounts, sorted by name
    pub fn list(&self, include_archived: bool) -> LedgerResult<Vec<Account>> {
        if include_archived {
            self.storage.accounts.get_all()
        } else {
            self.storage.accounts.get_active()
        }
    }

    /// The account flagged as default, if any
    pub fn default_account(&self) -> LedgerResult<Option<Account>> {
        self.storage.accounts.get_default()
    }

    /// Rename an account
    pub fn rename(&self, id: AccountId, new_name: &str) -> LedgerResult<Account> {
        let new_name = validation::require_text(new_name, "name")?;

        if self.storage.accounts.name_exists(new_name, Some(id))? {
            return Err(LedgerError::Duplicate {
                entity_type: "Account",
                identifier: new_name.to_string(),
            });
        }

        let mut uow = self.storage.begin();
        let before = uow.get_for_update(id)?;
        let mut account = before.clone();
        account.name = new_name.to_string();
        account.updated_at = chrono::Utc::now();
        account.validate()?;

        uow.save_account(account.clone())?;
        uow.record(AuditEntry::update(
            EntityType::Account,
            account.id.full(),
            Some(account.name.clone()),
            &before,
            &account,
            Some(format!("name: {} -> {}", before.name, account.name)),
        ));
        uow.commit()?;

        Ok(account)
    }

    /// Archive an account (soft delete); its balance and history stay intact
    pub fn archive(&self, id: AccountId) -> LedgerResult<Account> {
        self.set_active(id, false)
    }

    pub fn unarchive(&self, id: AccountId) -> LedgerResult<Account> {
        self.set_active(id, true)
    }

    fn set_active(&self, id: AccountId, active: bool) -> LedgerResult<Account> {
        let mut uow = self.storage.begin();
        let before = uow.get_for_update(id)?;
        if before.active == active {
            return Ok(before);
        }

        let mut account = before.clone();
        if active {
            account.unarchive();
        } else {
            account.archive();
        }

        uow.save_account(account.clone())?;
        uow.record(AuditEntry::update(
            EntityType::Account,
            account.id.full(),
            Some(account.name.clone()),
            &before,
            &account,
            Some(format!("active: {} -> {}", before.active, account.active)),
        ));
        uow.commit()?;

        info!(account = %account.id, active, "account archive state changed");
        Ok(account)
    }

    /// Make `id` the default account, clearing the flag on the previous one
    pub fn set_default(&self, id: AccountId) -> LedgerResult<Account> {
        let previous = self.storage.accounts.get_default()?.map(|a| a.id);

        let mut uow = self.storage.begin();
        let locked = uow.lock_accounts(previous.into_iter().chain([id]))?;
        let before = locked
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::account_not_found(id.to_string()))?;
        if !before.active {
            return Err(ValidationError::InactiveAccount(before.name).into());
        }

        for (other_id, other) in &locked {
            if *other_id != id && other.is_default {
                let mut cleared = other.clone();
                cleared.is_default = false;
                cleared.updated_at = chrono::Utc::now();
                uow.save_account(cleared)?;
            }
        }

        let mut account = before.clone();
        account.is_default = true;
        account.updated_at = chrono::Utc::now();
        uow.save_account(account.clone())?;
        uow.record(AuditEntry::update(
            EntityType::Account,
            account.id.full(),
            Some(account.name.clone()),
            &before,
            &account,
            Some("default: false -> true".to_string()),
        ));
        uow.commit()?;

        Ok(account)
    }

    /// Sum of active account balances, per currency
    pub fn total_balance_by_currency(&self) -> LedgerResult<BTreeMap<String, Money>> {
        let mut totals: BTreeMap<String, Money> = BTreeMap::new();
        for account in self.storage.accounts.get_active()? {
            *totals.entry(account.currency).or_default() += account.balance;
        }
        Ok(totals)
    }
}
