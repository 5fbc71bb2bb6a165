//! Ledger engine
//!
//! Creates, edits, and deletes transactions while keeping every account
//! balance consistent with the transactions that reference it. Each operation
//! runs in one unit of work: shape checks first, then row locks in a fixed
//! order, then balance checks against the locked rows, and finally a single
//! atomic commit.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use tracing::info;

use crate::audit::{AuditEntry, EntityType};
use crate::error::{LedgerError, LedgerResult, ValidationError};
use crate::models::{
    Account, AccountId, CategoryId, Effect, Money, Transaction, TransactionId, TransactionKind,
};
use crate::models::ids::unique_match;
use crate::storage::{Storage, UnitOfWork};
use crate::validation;

/// Options for filtering transactions
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Transactions touching this account on either side
    pub account_id: Option<AccountId>,
    pub category_id: Option<CategoryId>,
    pub kind: Option<TransactionKind>,
    /// Filter by date range start (inclusive)
    pub start_date: Option<NaiveDate>,
    /// Filter by date range end (inclusive)
    pub end_date: Option<NaiveDate>,
    /// Maximum number of transactions to return
    pub limit: Option<usize>,
}

impl TransactionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(mut self, account_id: AccountId) -> Self {
        self.account_id = Some(account_id);
        self
    }

    pub fn category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Input for creating a new transaction
///
/// `source_account_id` and `date` are optional here so that a missing value
/// is reported as a validation error rather than being unrepresentable.
#[derive(Debug, Clone)]
pub struct CreateTransactionInput {
    pub kind: TransactionKind,
    pub amount: Money,
    pub source_account_id: Option<AccountId>,
    pub dest_account_id: Option<AccountId>,
    pub category_id: Option<CategoryId>,
    pub date: Option<NaiveDate>,
    pub description: String,
}

impl CreateTransactionInput {
    pub fn new(kind: TransactionKind, amount: Money) -> Self {
        Self {
            kind,
            amount,
            source_account_id: None,
            dest_account_id: None,
            category_id: None,
            date: None,
            description: String::new(),
        }
    }

    pub fn income(account: AccountId, amount: Money, date: NaiveDate) -> Self {
        Self::new(TransactionKind::Income, amount)
            .source(account)
            .date(date)
    }

    pub fn expense(account: AccountId, amount: Money, date: NaiveDate) -> Self {
        Self::new(TransactionKind::Expense, amount)
            .source(account)
            .date(date)
    }

    pub fn transfer(from: AccountId, to: AccountId, amount: Money, date: NaiveDate) -> Self {
        Self::new(TransactionKind::Transfer, amount)
            .source(from)
            .dest(to)
            .date(date)
    }

    pub fn source(mut self, account: AccountId) -> Self {
        self.source_account_id = Some(account);
        self
    }

    pub fn dest(mut self, account: AccountId) -> Self {
        self.dest_account_id = Some(account);
        self
    }

    pub fn category(mut self, category: CategoryId) -> Self {
        self.category_id = Some(category);
        self
    }

    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Partial update of a transaction
///
/// `None` leaves a field unchanged. The nullable fields use a nested option:
/// `Some(None)` clears the value and `Some(Some(x))` sets it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionPatch {
    pub kind: Option<TransactionKind>,
    pub amount: Option<Money>,
    pub source_account_id: Option<AccountId>,
    pub dest_account_id: Option<Option<AccountId>>,
    pub category_id: Option<Option<CategoryId>>,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
}

impl TransactionPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn amount(mut self, amount: Money) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn source(mut self, account: AccountId) -> Self {
        self.source_account_id = Some(account);
        self
    }

    pub fn dest(mut self, account: Option<AccountId>) -> Self {
        self.dest_account_id = Some(account);
        self
    }

    pub fn category(mut self, category: Option<CategoryId>) -> Self {
        self.category_id = Some(category);
        self
    }

    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Checks that need nothing but the patch itself
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(amount) = self.amount {
            validation::positive(amount, "amount")?;
        }
        if let Some(description) = &self.description {
            validation::max_len(description.trim(), "description", 500)?;
        }
        Ok(())
    }

    /// The stored record with this patch applied
    ///
    /// When the resulting kind is not a transfer, a destination carried over
    /// from the stored record is dropped. An explicitly supplied one is kept
    /// so that validation rejects it.
    fn merge_into(&self, stored: &Transaction) -> Transaction {
        let mut txn = stored.clone();

        if let Some(kind) = self.kind {
            txn.kind = kind;
        }
        if let Some(amount) = self.amount {
            txn.amount = amount;
        }
        if let Some(source) = self.source_account_id {
            txn.source_account_id = source;
        }
        match self.dest_account_id {
            Some(dest) => txn.dest_account_id = dest,
            None if !txn.is_transfer() => txn.dest_account_id = None,
            None => {}
        }
        if let Some(category) = self.category_id {
            txn.category_id = category;
        }
        if let Some(date) = self.date {
            txn.date = date;
        }
        if let Some(description) = &self.description {
            txn.description = description.trim().to_string();
        }

        txn.updated_at = Utc::now();
        txn
    }
}

/// Service that owns every balance-changing operation
pub struct LedgerEngine<'a> {
    storage: &'a Storage,
}

impl<'a> LedgerEngine<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Record a new transaction and apply its effect
    pub fn create(&self, input: CreateTransactionInput) -> LedgerResult<Transaction> {
        let source = validation::require(input.source_account_id, "source_account_id")?;
        let date = validation::require(input.date, "date")?;

        let mut txn = Transaction::new(input.kind, input.amount, source, date);
        txn.dest_account_id = input.dest_account_id;
        txn.category_id = input.category_id;
        txn.description = input.description.trim().to_string();
        txn.validate()?;

        if let Some(category_id) = txn.category_id {
            self.ensure_category(category_id)?;
        }

        let effect = txn.effect();
        let mut uow = self.storage.begin();
        let locked = uow.lock_accounts(effect.accounts())?;
        check_targets(&txn, &locked, &[])?;

        apply_effect(&mut uow, &effect, false)?;
        uow.stage_transaction(txn.clone());
        uow.record(
            AuditEntry::create(
                EntityType::Transaction,
                txn.id.full(),
                Some(txn.to_string()),
                &txn,
            )
            .with_postings(effect.postings().iter().copied()),
        );
        uow.commit()?;

        info!(transaction = %txn.id, kind = %txn.kind, amount = %txn.amount, "transaction created");
        Ok(txn)
    }

    /// Edit a transaction, moving balances from its old effect to its new one
    ///
    /// Returns `None` if no transaction has this id.
    pub fn update(
        &self,
        id: TransactionId,
        patch: TransactionPatch,
    ) -> LedgerResult<Option<Transaction>> {
        if !self.storage.transactions.exists(id)? {
            return Ok(None);
        }
        patch.validate()?;
        if let Some(Some(category_id)) = patch.category_id {
            self.ensure_category(category_id)?;
        }

        let mut uow = self.storage.begin();
        let Some(before) = uow.lock_transaction(id)? else {
            return Ok(None);
        };
        if patch.is_empty() {
            return Ok(Some(before));
        }

        let after = patch.merge_into(&before);
        after.validate()?;

        let old_effect = before.effect();
        let new_effect = after.effect();
        let locked = uow.lock_accounts(old_effect.accounts().chain(new_effect.accounts()))?;
        let previously: Vec<AccountId> = old_effect.accounts().collect();
        check_targets(&after, &locked, &previously)?;

        let reversal = old_effect.reversed();
        apply_effect(&mut uow, &reversal, true)?;
        apply_effect(&mut uow, &new_effect, false)?;
        ensure_non_negative(&mut uow, &locked)?;

        uow.stage_transaction(after.clone());
        uow.record(
            AuditEntry::update(
                EntityType::Transaction,
                after.id.full(),
                Some(after.to_string()),
                &before,
                &after,
                describe_changes(&before, &after),
            )
            .with_postings(
                reversal
                    .postings()
                    .iter()
                    .chain(new_effect.postings())
                    .copied(),
            ),
        );
        uow.commit()?;

        info!(transaction = %after.id, kind = %after.kind, amount = %after.amount, "transaction updated");
        Ok(Some(after))
    }

    /// Delete a transaction and reverse its effect
    ///
    /// Returns `false` if no transaction has this id.
    pub fn delete(&self, id: TransactionId) -> LedgerResult<bool> {
        if !self.storage.transactions.exists(id)? {
            return Ok(false);
        }

        let mut uow = self.storage.begin();
        let Some(txn) = uow.lock_transaction(id)? else {
            return Ok(false);
        };

        let reversal = txn.effect().reversed();
        uow.lock_accounts(reversal.accounts())?;
        apply_effect(&mut uow, &reversal, false)?;

        uow.stage_removal(id);
        uow.record(
            AuditEntry::delete(
                EntityType::Transaction,
                id.full(),
                Some(txn.to_string()),
                &txn,
            )
            .with_postings(reversal.postings().iter().copied()),
        );
        uow.commit()?;

        info!(transaction = %id, "transaction deleted");
        Ok(true)
    }

    pub fn get(&self, id: TransactionId) -> LedgerResult<Option<Transaction>> {
        self.storage.transactions.get(id)
    }

    /// Find a transaction by its id string, full or as the short form
    /// printed in listings. An ambiguous short id matches nothing.
    pub fn find(&self, identifier: &str) -> LedgerResult<Option<Transaction>> {
        if let Ok(id) = identifier.parse::<TransactionId>() {
            return self.get(id);
        }

        Ok(unique_match(
            self.storage
                .transactions
                .get_all()?
                .into_iter()
                .filter(|t| t.id.starts_with(identifier)),
        ))
    }

    /// List transactions, newest first
    pub fn list(&self, filter: TransactionFilter) -> LedgerResult<Vec<Transaction>> {
        let mut transactions = if let Some(account_id) = filter.account_id {
            self.storage.transactions.get_by_account(account_id)?
        } else if let Some(category_id) = filter.category_id {
            self.storage.transactions.get_by_category(category_id)?
        } else {
            self.storage.transactions.get_all()?
        };

        if let Some(category_id) = filter.category_id {
            transactions.retain(|t| t.category_id == Some(category_id));
        }
        if let Some(kind) = filter.kind {
            transactions.retain(|t| t.kind == kind);
        }
        if let Some(start) = filter.start_date {
            transactions.retain(|t| t.date >= start);
        }
        if let Some(end) = filter.end_date {
            transactions.retain(|t| t.date <= end);
        }
        if let Some(limit) = filter.limit {
            transactions.truncate(limit);
        }

        Ok(transactions)
    }

    pub fn count(&self) -> LedgerResult<usize> {
        self.storage.transactions.count()
    }

    fn ensure_category(&self, id: CategoryId) -> LedgerResult<()> {
        if self.storage.categories.exists(id)? {
            Ok(())
        } else {
            Err(LedgerError::category_not_found(id.to_string()))
        }
    }
}

/// Checks on the locked accounts a transaction is about to touch
///
/// Accounts in `previously` already carried this transaction's effect, so
/// archiving them later does not block an edit.
fn check_targets(
    txn: &Transaction,
    locked: &BTreeMap<AccountId, Account>,
    previously: &[AccountId],
) -> LedgerResult<()> {
    for id in txn.effect().accounts() {
        let account = locked
            .get(&id)
            .ok_or_else(|| LedgerError::account_not_found(id.to_string()))?;
        if !account.active && !previously.contains(&id) {
            return Err(ValidationError::InactiveAccount(account.name.clone()).into());
        }
    }

    if let (TransactionKind::Transfer, Some(dest_id)) = (txn.kind, txn.dest_account_id) {
        let (Some(source), Some(dest)) = (locked.get(&txn.source_account_id), locked.get(&dest_id))
        else {
            return Err(LedgerError::account_not_found(dest_id.to_string()));
        };
        if source.currency != dest.currency {
            return Err(ValidationError::CurrencyMismatch {
                source_currency: source.currency.clone(),
                dest_currency: dest.currency.clone(),
            }
            .into());
        }
    }

    Ok(())
}

/// Apply each posting to its locked account
///
/// Debits fail unless `allow_negative`. Credits always go through; an
/// account left negative after them is caught by `ensure_non_negative`.
fn apply_effect(uow: &mut UnitOfWork<'_>, effect: &Effect, allow_negative: bool) -> LedgerResult<()> {
    for posting in effect.postings() {
        let mut account = uow.get_for_update(posting.account_id)?;
        account.apply_delta(posting.delta, allow_negative || !posting.delta.is_negative())?;
        uow.save_account(account)?;
    }
    Ok(())
}

/// Fail if any touched account ended below zero
fn ensure_non_negative(
    uow: &mut UnitOfWork<'_>,
    before: &BTreeMap<AccountId, Account>,
) -> LedgerResult<()> {
    for (id, original) in before {
        let current = uow.get_for_update(*id)?;
        if current.balance.is_negative() {
            return Err(LedgerError::InsufficientBalance {
                account: current.name,
                needed: original.balance - current.balance,
                available: original.balance,
            });
        }
    }
    Ok(())
}

fn describe_changes(before: &Transaction, after: &Transaction) -> Option<String> {
    let mut changes = Vec::new();
    if before.kind != after.kind {
        changes.push(format!("kind: {} -> {}", before.kind, after.kind));
    }
    if before.amount != after.amount {
        changes.push(format!("amount: {} -> {}", before.amount, after.amount));
    }
    if before.source_account_id != after.source_account_id {
        changes.push(format!(
            "source: {} -> {}",
            before.source_account_id, after.source_account_id
        ));
    }
    if before.dest_account_id != after.dest_account_id {
        changes.push(format!(
            "dest: {:?} -> {:?}",
            before.dest_account_id.map(|id| id.to_string()),
            after.dest_account_id.map(|id| id.to_string())
        ));
    }
    if before.category_id != after.category_id {
        changes.push("category changed".to_string());
    }
    if before.date != after.date {
        changes.push(format!("date: {} -> {}", before.date, after.date));
    }
    if before.description != after.description {
        changes.push("description changed".to_string());
    }

    if changes.is_empty() {
        None
    } else {
        Some(changes.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerPaths;
    use crate::models::{AccountKind, Category, CategoryKind};
    use std::thread;
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::new(paths).unwrap();
        storage.load_all().unwrap();
        (temp_dir, storage)
    }

    fn open_account(storage: &Storage, name: &str, cents: i64) -> AccountId {
        open_account_in(storage, name, cents, "USD")
    }

    fn open_account_in(storage: &Storage, name: &str, cents: i64, currency: &str) -> AccountId {
        let account = Account::with_opening_balance(
            name,
            AccountKind::Bank,
            currency,
            Money::from_cents(cents),
        );
        let id = account.id;
        let mut uow = storage.begin();
        uow.insert_account(account).unwrap();
        uow.commit().unwrap();
        id
    }

    fn balance(storage: &Storage, id: AccountId) -> i64 {
        storage.accounts.get(id).unwrap().unwrap().balance.cents()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()
    }

    fn cents(c: i64) -> Money {
        Money::from_cents(c)
    }

    #[test]
    fn test_income_credits_source() {
        let (_temp, storage) = create_test_storage();
        let a = open_account(&storage, "Operating", 100);
        let engine = LedgerEngine::new(&storage);

        let txn = engine
            .create(CreateTransactionInput::income(a, cents(250), day()).description("  May dues "))
            .unwrap();

        assert_eq!(balance(&storage, a), 350);
        assert_eq!(txn.description, "May dues");
        assert!(storage.transactions.exists(txn.id).unwrap());
    }

    #[test]
    fn test_expense_beyond_balance_is_rejected() {
        let (_temp, storage) = create_test_storage();
        let a = open_account(&storage, "Cash Box", 50);
        let engine = LedgerEngine::new(&storage);

        let err = engine
            .create(CreateTransactionInput::expense(a, cents(100), day()))
            .unwrap_err();

        match err {
            LedgerError::InsufficientBalance { needed, available, .. } => {
                assert_eq!(needed.cents(), 100);
                assert_eq!(available.cents(), 50);
            }
            other => panic!("expected InsufficientBalance, got {other:?}"),
        }
        assert_eq!(balance(&storage, a), 50);
        assert_eq!(engine.count().unwrap(), 0);
    }

    #[test]
    fn test_expense_of_entire_balance_is_allowed() {
        let (_temp, storage) = create_test_storage();
        let a = open_account(&storage, "Cash Box", 50);
        let engine = LedgerEngine::new(&storage);

        engine
            .create(CreateTransactionInput::expense(a, cents(50), day()))
            .unwrap();
        assert_eq!(balance(&storage, a), 0);
    }

    #[test]
    fn test_transfer_then_delete_restores_balances() {
        let (_temp, storage) = create_test_storage();
        let a = open_account(&storage, "Operating", 500);
        let b = open_account(&storage, "Reserve", 100);
        let engine = LedgerEngine::new(&storage);

        let txn = engine
            .create(CreateTransactionInput::transfer(a, b, cents(150), day()))
            .unwrap();
        assert_eq!(balance(&storage, a), 350);
        assert_eq!(balance(&storage, b), 250);

        assert!(engine.delete(txn.id).unwrap());
        assert_eq!(balance(&storage, a), 500);
        assert_eq!(balance(&storage, b), 100);
        assert!(engine.get(txn.id).unwrap().is_none());
    }

    #[test]
    fn test_transfer_to_expense_releases_destination() {
        let (_temp, storage) = create_test_storage();
        let a = open_account(&storage, "Operating", 500);
        let b = open_account(&storage, "Reserve", 100);
        let engine = LedgerEngine::new(&storage);

        let txn = engine
            .create(CreateTransactionInput::transfer(a, b, cents(50), day()))
            .unwrap();
        assert_eq!(balance(&storage, a), 450);
        assert_eq!(balance(&storage, b), 150);

        let updated = engine
            .update(
                txn.id,
                TransactionPatch::new()
                    .kind(TransactionKind::Expense)
                    .dest(None),
            )
            .unwrap()
            .unwrap();

        assert_eq!(updated.kind, TransactionKind::Expense);
        assert_eq!(updated.dest_account_id, None);
        assert_eq!(balance(&storage, a), 450);
        assert_eq!(balance(&storage, b), 100);
    }

    #[test]
    fn test_kind_change_drops_stored_destination() {
        let (_temp, storage) = create_test_storage();
        let a = open_account(&storage, "Operating", 500);
        let b = open_account(&storage, "Reserve", 100);
        let engine = LedgerEngine::new(&storage);

        let txn = engine
            .create(CreateTransactionInput::transfer(a, b, cents(50), day()))
            .unwrap();
        let updated = engine
            .update(txn.id, TransactionPatch::new().kind(TransactionKind::Income))
            .unwrap()
            .unwrap();

        assert_eq!(updated.dest_account_id, None);
        assert_eq!(balance(&storage, a), 550);
        assert_eq!(balance(&storage, b), 100);
    }

    #[test]
    fn test_explicit_destination_on_expense_is_rejected() {
        let (_temp, storage) = create_test_storage();
        let a = open_account(&storage, "Operating", 500);
        let b = open_account(&storage, "Reserve", 100);
        let engine = LedgerEngine::new(&storage);

        let txn = engine
            .create(CreateTransactionInput::expense(a, cents(50), day()))
            .unwrap();
        let err = engine
            .update(txn.id, TransactionPatch::new().dest(Some(b)))
            .unwrap_err();

        assert!(err.is_validation());
        assert_eq!(balance(&storage, a), 450);
        assert_eq!(balance(&storage, b), 100);
    }

    /// Every (old kind, new kind) pair, checked against the expected balances
    #[test]
    fn test_kind_conversion_matrix() {
        use TransactionKind::{Expense, Income, Transfer};

        // Start A=1000, B=1000, amount 100; expected (A, B) after the update
        let cases = [
            (Income, Income, (1100, 1000)),
            (Income, Expense, (900, 1000)),
            (Income, Transfer, (900, 1100)),
            (Expense, Income, (1100, 1000)),
            (Expense, Expense, (900, 1000)),
            (Expense, Transfer, (900, 1100)),
            (Transfer, Income, (1100, 1000)),
            (Transfer, Expense, (900, 1000)),
            (Transfer, Transfer, (900, 1100)),
        ];

        for (from, to, (expected_a, expected_b)) in cases {
            let (_temp, storage) = create_test_storage();
            let a = open_account(&storage, "A", 1000);
            let b = open_account(&storage, "B", 1000);
            let engine = LedgerEngine::new(&storage);

            let mut input = CreateTransactionInput::new(from, cents(100))
                .source(a)
                .date(day());
            if from == Transfer {
                input = input.dest(b);
            }
            let txn = engine.create(input).unwrap();

            let mut patch = TransactionPatch::new().kind(to);
            if to == Transfer {
                patch = patch.dest(Some(b));
            }
            let updated = engine.update(txn.id, patch).unwrap().unwrap();

            assert_eq!(updated.kind, to, "{from:?} -> {to:?}");
            assert_eq!(
                (balance(&storage, a), balance(&storage, b)),
                (expected_a, expected_b),
                "{from:?} -> {to:?}"
            );
            assert_eq!(updated.dest_account_id.is_some(), to == Transfer);
        }
    }

    #[test]
    fn test_update_checks_against_reversed_balance() {
        let (_temp, storage) = create_test_storage();
        let a = open_account(&storage, "Operating", 100);
        let engine = LedgerEngine::new(&storage);

        // 100 - 80 = 20 left; raising the expense to 100 uses the reversed 100
        let txn = engine
            .create(CreateTransactionInput::expense(a, cents(80), day()))
            .unwrap();
        engine
            .update(txn.id, TransactionPatch::new().amount(cents(100)))
            .unwrap();
        assert_eq!(balance(&storage, a), 0);

        let err = engine
            .update(txn.id, TransactionPatch::new().amount(cents(101)))
            .unwrap_err();
        assert!(err.is_insufficient_balance());
        assert_eq!(balance(&storage, a), 0);
        assert_eq!(engine.get(txn.id).unwrap().unwrap().amount.cents(), 100);
    }

    #[test]
    fn test_update_fails_when_destination_already_spent() {
        let (_temp, storage) = create_test_storage();
        let a = open_account(&storage, "Operating", 500);
        let b = open_account(&storage, "Reserve", 0);
        let engine = LedgerEngine::new(&storage);

        let transfer = engine
            .create(CreateTransactionInput::transfer(a, b, cents(100), day()))
            .unwrap();
        engine
            .create(CreateTransactionInput::expense(b, cents(80), day()))
            .unwrap();

        // Taking the transfer away would leave B at -80
        let err = engine
            .update(transfer.id, TransactionPatch::new().kind(TransactionKind::Expense))
            .unwrap_err();
        assert!(err.is_insufficient_balance());
        assert_eq!(balance(&storage, a), 400);
        assert_eq!(balance(&storage, b), 20);

        let err = engine.delete(transfer.id).unwrap_err();
        assert!(err.is_insufficient_balance());
        assert!(engine.get(transfer.id).unwrap().is_some());
        assert_eq!(balance(&storage, b), 20);
    }

    #[test]
    fn test_update_moves_effect_between_accounts() {
        let (_temp, storage) = create_test_storage();
        let a = open_account(&storage, "Operating", 300);
        let b = open_account(&storage, "Cash Box", 300);
        let engine = LedgerEngine::new(&storage);

        let txn = engine
            .create(CreateTransactionInput::expense(a, cents(100), day()))
            .unwrap();
        engine
            .update(txn.id, TransactionPatch::new().source(b))
            .unwrap();

        assert_eq!(balance(&storage, a), 300);
        assert_eq!(balance(&storage, b), 200);
    }

    #[test]
    fn test_update_moves_transfer_to_four_accounts() {
        let (_temp, storage) = create_test_storage();
        let a = open_account(&storage, "Operating", 1000);
        let b = open_account(&storage, "Reserve", 1000);
        let c = open_account(&storage, "Cash Box", 1000);
        let d = open_account(&storage, "Elevator Fund", 1000);
        let engine = LedgerEngine::new(&storage);

        let txn = engine
            .create(CreateTransactionInput::transfer(a, b, cents(100), day()))
            .unwrap();
        engine
            .update(txn.id, TransactionPatch::new().source(c).dest(Some(d)))
            .unwrap()
            .unwrap();

        assert_eq!(balance(&storage, a), 1000);
        assert_eq!(balance(&storage, b), 1000);
        assert_eq!(balance(&storage, c), 900);
        assert_eq!(balance(&storage, d), 1100);

        let entries = storage.audit().read_all().unwrap();
        let postings = &entries.last().unwrap().postings;
        let mut touched: Vec<AccountId> = postings.iter().map(|p| p.account_id).collect();
        touched.sort();
        let mut expected = vec![a, b, c, d];
        expected.sort();
        assert_eq!(touched, expected);
    }

    #[test]
    fn test_update_without_balance_fields_keeps_balances() {
        let (_temp, storage) = create_test_storage();
        let a = open_account(&storage, "Operating", 300);
        let engine = LedgerEngine::new(&storage);

        let txn = engine
            .create(CreateTransactionInput::expense(a, cents(100), day()))
            .unwrap();
        let updated = engine
            .update(txn.id, TransactionPatch::new().description("Gardening"))
            .unwrap()
            .unwrap();

        assert_eq!(updated.description, "Gardening");
        assert_eq!(balance(&storage, a), 200);
    }

    #[test]
    fn test_absent_ids() {
        let (_temp, storage) = create_test_storage();
        let a = open_account(&storage, "Operating", 300);
        let engine = LedgerEngine::new(&storage);

        assert!(!engine.delete(TransactionId::new()).unwrap());
        assert!(engine
            .update(TransactionId::new(), TransactionPatch::new().amount(cents(5)))
            .unwrap()
            .is_none());
        assert_eq!(balance(&storage, a), 300);
    }

    #[test]
    fn test_validation_failures() {
        let (_temp, storage) = create_test_storage();
        let a = open_account(&storage, "Operating", 300);
        let engine = LedgerEngine::new(&storage);

        let missing_source = CreateTransactionInput::new(TransactionKind::Income, cents(10)).date(day());
        assert!(matches!(
            engine.create(missing_source),
            Err(LedgerError::Validation(ValidationError::MissingField { field: "source_account_id" }))
        ));

        let missing_date = CreateTransactionInput::new(TransactionKind::Income, cents(10)).source(a);
        assert!(matches!(
            engine.create(missing_date),
            Err(LedgerError::Validation(ValidationError::MissingField { field: "date" }))
        ));

        assert!(matches!(
            engine.create(CreateTransactionInput::income(a, cents(0), day())),
            Err(LedgerError::Validation(ValidationError::InvalidAmount { .. }))
        ));

        assert!(matches!(
            engine.create(CreateTransactionInput::transfer(a, a, cents(10), day())),
            Err(LedgerError::Validation(ValidationError::SameAccount))
        ));

        let no_dest = CreateTransactionInput::new(TransactionKind::Transfer, cents(10))
            .source(a)
            .date(day());
        assert!(engine.create(no_dest).unwrap_err().is_validation());

        assert_eq!(balance(&storage, a), 300);
        assert_eq!(engine.count().unwrap(), 0);
    }

    #[test]
    fn test_missing_account_and_category() {
        let (_temp, storage) = create_test_storage();
        let a = open_account(&storage, "Operating", 300);
        let engine = LedgerEngine::new(&storage);

        let err = engine
            .create(CreateTransactionInput::transfer(a, AccountId::new(), cents(10), day()))
            .unwrap_err();
        assert!(err.is_not_found());

        let err = engine
            .create(CreateTransactionInput::income(a, cents(10), day()).category(CategoryId::new()))
            .unwrap_err();
        assert!(err.is_not_found());

        let dues = Category::new("Monthly Dues", CategoryKind::Income);
        let dues_id = dues.id;
        storage.categories.upsert(dues).unwrap();
        let txn = engine
            .create(CreateTransactionInput::income(a, cents(10), day()).category(dues_id))
            .unwrap();
        assert_eq!(txn.category_id, Some(dues_id));
        assert_eq!(balance(&storage, a), 310);
    }

    #[test]
    fn test_currency_mismatch_is_rejected() {
        let (_temp, storage) = create_test_storage();
        let a = open_account_in(&storage, "Operating", 300, "USD");
        let b = open_account_in(&storage, "Euro Account", 300, "EUR");
        let engine = LedgerEngine::new(&storage);

        let err = engine
            .create(CreateTransactionInput::transfer(a, b, cents(10), day()))
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Validation(ValidationError::CurrencyMismatch { .. })
        ));
        assert_eq!(balance(&storage, a), 300);
        assert_eq!(balance(&storage, b), 300);
    }

    #[test]
    fn test_archived_account_rejects_new_effects_only() {
        let (_temp, storage) = create_test_storage();
        let a = open_account(&storage, "Operating", 300);
        let b = open_account(&storage, "Old Fund", 300);
        let engine = LedgerEngine::new(&storage);

        let txn = engine
            .create(CreateTransactionInput::expense(b, cents(10), day()))
            .unwrap();

        let mut uow = storage.begin();
        let mut old = uow.get_for_update(b).unwrap();
        old.archive();
        uow.save_account(old).unwrap();
        uow.commit().unwrap();

        let err = engine
            .create(CreateTransactionInput::income(b, cents(10), day()))
            .unwrap_err();
        assert!(err.is_validation());

        // Editing an existing effect on the archived account is still allowed
        engine
            .update(txn.id, TransactionPatch::new().amount(cents(20)))
            .unwrap();
        assert_eq!(balance(&storage, b), 280);

        // Sending money into it is a new effect
        let err = engine
            .create(CreateTransactionInput::transfer(a, b, cents(5), day()))
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Validation(ValidationError::InactiveAccount(_))
        ));
        assert_eq!(balance(&storage, a), 300);
    }

    #[test]
    fn test_operations_write_audit_postings() {
        let (_temp, storage) = create_test_storage();
        let a = open_account(&storage, "Operating", 500);
        let b = open_account(&storage, "Reserve", 100);
        let engine = LedgerEngine::new(&storage);

        let txn = engine
            .create(CreateTransactionInput::transfer(a, b, cents(150), day()))
            .unwrap();
        engine
            .update(txn.id, TransactionPatch::new().amount(cents(200)))
            .unwrap();
        engine.delete(txn.id).unwrap();

        let entries = storage.audit().read_all().unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.entity_id == txn.id.full()));
        assert_eq!(entries[0].postings.len(), 2);
        assert_eq!(entries[1].postings.len(), 4);
        assert!(entries[1].diff_summary.as_deref().unwrap().contains("amount"));

        let totals = storage.audit().net_postings().unwrap();
        assert_eq!(totals[&a], Money::zero());
        assert_eq!(totals[&b], Money::zero());
    }

    #[test]
    fn test_failed_operation_writes_no_audit_entry() {
        let (_temp, storage) = create_test_storage();
        let a = open_account(&storage, "Cash Box", 50);
        let engine = LedgerEngine::new(&storage);

        engine
            .create(CreateTransactionInput::expense(a, cents(100), day()))
            .unwrap_err();
        assert!(storage.audit().read_all().unwrap().is_empty());
    }

    #[test]
    fn test_storage_failure_leaves_balances_untouched() {
        let (_temp, storage) = create_test_storage();
        let a = open_account(&storage, "Operating", 1000);
        let engine = LedgerEngine::new(&storage);

        std::fs::create_dir_all(storage.paths().transactions_file().join("blocker")).unwrap();

        let err = engine
            .create(CreateTransactionInput::expense(a, cents(300), day()))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Storage(_)));
        assert_eq!(balance(&storage, a), 1000);
        assert_eq!(engine.count().unwrap(), 0);
    }

    #[test]
    fn test_concurrent_expenses_cannot_overdraw() {
        let (_temp, storage) = create_test_storage();
        let a = open_account(&storage, "Operating", 100);
        let engine = LedgerEngine::new(&storage);

        let results: Vec<LedgerResult<Transaction>> = thread::scope(|s| {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    s.spawn(|| engine.create(CreateTransactionInput::expense(a, cents(60), day())))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(LedgerError::is_insufficient_balance));
        assert_eq!(balance(&storage, a), 40);
    }

    #[test]
    fn test_concurrent_opposing_transfers_do_not_deadlock() {
        let (_temp, storage) = create_test_storage();
        let a = open_account(&storage, "Operating", 10_000);
        let b = open_account(&storage, "Reserve", 10_000);
        let engine = LedgerEngine::new(&storage);

        thread::scope(|s| {
            for i in 0..4 {
                let (from, to) = if i % 2 == 0 { (a, b) } else { (b, a) };
                let engine = &engine;
                s.spawn(move || {
                    for _ in 0..10 {
                        engine
                            .create(CreateTransactionInput::transfer(from, to, cents(10), day()))
                            .unwrap();
                    }
                });
            }
        });

        assert_eq!(balance(&storage, a) + balance(&storage, b), 20_000);
        assert_eq!(engine.count().unwrap(), 40);
    }

    #[test]
    fn test_list_filters() {
        let (_temp, storage) = create_test_storage();
        let a = open_account(&storage, "Operating", 1000);
        let b = open_account(&storage, "Reserve", 1000);
        let engine = LedgerEngine::new(&storage);

        for d in 1..=3 {
            let date = NaiveDate::from_ymd_opt(2025, 1, d).unwrap();
            engine
                .create(CreateTransactionInput::income(a, cents(10), date))
                .unwrap();
        }
        engine
            .create(CreateTransactionInput::transfer(a, b, cents(10), day()))
            .unwrap();

        assert_eq!(engine.list(TransactionFilter::new()).unwrap().len(), 4);
        assert_eq!(engine.list(TransactionFilter::new().account(b)).unwrap().len(), 1);
        assert_eq!(
            engine
                .list(TransactionFilter::new().kind(TransactionKind::Income))
                .unwrap()
                .len(),
            3
        );
        let january = TransactionFilter::new().date_range(
            NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
        );
        assert_eq!(engine.list(january).unwrap().len(), 2);
        let newest = engine.list(TransactionFilter::new().limit(1)).unwrap();
        assert_eq!(newest[0].date, day());
    }

    #[test]
    fn test_find_by_full_and_short_id() {
        let (_temp, storage) = create_test_storage();
        let a = open_account(&storage, "Operating", 0);
        let engine = LedgerEngine::new(&storage);

        let txn = engine
            .create(CreateTransactionInput::income(a, cents(10), day()))
            .unwrap();

        assert_eq!(engine.find(&txn.id.full()).unwrap().unwrap().id, txn.id);
        assert_eq!(engine.find(&txn.id.to_string()).unwrap().unwrap().id, txn.id);
        assert!(engine.find("txn-").unwrap().is_none());
        assert!(engine.find("not-an-id").unwrap().is_none());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Create { kind: u8, amount: i64, source: usize, dest: usize },
            Update { target: usize, kind: u8, amount: i64, source: usize, dest: usize },
            Delete { target: usize },
        }

        fn kind_of(n: u8) -> TransactionKind {
            TransactionKind::ALL[n as usize % 3]
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0u8..3, 1i64..400, 0usize..4, 0usize..4).prop_map(|(kind, amount, source, dest)| {
                    Op::Create { kind, amount, source, dest }
                }),
                (0usize..8, 0u8..3, 1i64..400, 0usize..4, 0usize..4).prop_map(
                    |(target, kind, amount, source, dest)| Op::Update { target, kind, amount, source, dest }
                ),
                (0usize..8).prop_map(|target| Op::Delete { target }),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 48,
                ..ProptestConfig::default()
            })]

            /// Property: whatever sequence of operations runs (including the
            /// rejected ones), each balance moved by exactly the sum of the
            /// deltas in the operation log and never went negative.
            #[test]
            fn balances_reconcile_with_operation_log(
                ops in prop::collection::vec(op_strategy(), 1..25)
            ) {
                let (_temp, storage) = create_test_storage();
                let initial = [300i64, 150, 0, 80];
                let accounts: Vec<AccountId> = initial
                    .iter()
                    .enumerate()
                    .map(|(i, c)| open_account(&storage, &format!("Account {i}"), *c))
                    .collect();
                let engine = LedgerEngine::new(&storage);
                let mut created: Vec<TransactionId> = Vec::new();

                for op in ops {
                    match op {
                        Op::Create { kind, amount, source, dest } => {
                            let kind = kind_of(kind);
                            let mut input = CreateTransactionInput::new(kind, cents(amount))
                                .source(accounts[source])
                                .date(day());
                            if kind == TransactionKind::Transfer {
                                input = input.dest(accounts[dest]);
                            }
                            if let Ok(txn) = engine.create(input) {
                                created.push(txn.id);
                            }
                        }
                        Op::Update { target, kind, amount, source, dest } => {
                            if created.is_empty() {
                                continue;
                            }
                            let id = created[target % created.len()];
                            let kind = kind_of(kind);
                            let mut patch = TransactionPatch::new()
                                .kind(kind)
                                .amount(cents(amount))
                                .source(accounts[source]);
                            if kind == TransactionKind::Transfer {
                                patch = patch.dest(Some(accounts[dest]));
                            }
                            let _ = engine.update(id, patch);
                        }
                        Op::Delete { target } => {
                            if created.is_empty() {
                                continue;
                            }
                            let id = created[target % created.len()];
                            let _ = engine.delete(id);
                        }
                    }
                }

                let totals = storage.audit().net_postings().unwrap();
                for (id, start) in accounts.iter().zip(initial) {
                    let current = balance(&storage, *id);
                    let logged = totals.get(id).copied().unwrap_or_default().cents();
                    prop_assert!(current >= 0);
                    prop_assert_eq!(current - start, logged);
                }
            }
        }
    }
}
