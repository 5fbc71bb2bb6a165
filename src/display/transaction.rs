//! Transaction display formatting
//!
//! Register-style listings and detail views. Account and category ids are
//! resolved to names through the lookup tables the caller passes in.

use std::collections::HashMap;

use crate::models::{AccountId, CategoryId, Transaction, TransactionKind};

/// Names used to label transaction rows
#[derive(Debug, Default)]
pub struct NameLookup {
    pub accounts: HashMap<AccountId, String>,
    pub categories: HashMap<CategoryId, String>,
}

impl NameLookup {
    fn account(&self, id: AccountId) -> String {
        self.accounts
            .get(&id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    fn category(&self, id: Option<CategoryId>) -> String {
        match id {
            Some(id) => self
                .categories
                .get(&id)
                .cloned()
                .unwrap_or_else(|| id.to_string()),
            None => String::new(),
        }
    }
}

/// Accounts a transaction moves money between, as "from -> to"
fn flow(txn: &Transaction, names: &NameLookup) -> String {
    let source = names.account(txn.source_account_id);
    match (txn.kind, txn.dest_account_id) {
        (TransactionKind::Transfer, Some(dest)) => {
            format!("{} -> {}", source, names.account(dest))
        }
        (TransactionKind::Income, _) => format!("-> {}", source),
        _ => format!("{} ->", source),
    }
}

/// Format a single transaction as a register row
pub fn format_transaction_row(txn: &Transaction, names: &NameLookup, symbol: &str) -> String {
    format!(
        "{} {:12} {:8} {:>12}  {:28} {:16} {}",
        txn.date.format("%Y-%m-%d"),
        txn.id.to_string(),
        txn.kind.to_string(),
        txn.amount.format_with_symbol(symbol),
        truncate(&flow(txn, names), 28),
        truncate(&names.category(txn.category_id), 16),
        txn.description
    )
}

/// Format a list of transactions as a register
pub fn format_transaction_register(
    transactions: &[Transaction],
    names: &NameLookup,
    symbol: &str,
) -> String {
    if transactions.is_empty() {
        return "No transactions found.\n".to_string();
    }

    let mut output = String::new();
    output.push_str(&format!(
        "{:10} {:12} {:8} {:>12}  {:28} {:16} {}\n",
        "Date", "ID", "Kind", "Amount", "Accounts", "Category", "Description"
    ));
    output.push_str(&"-".repeat(104));
    output.push('\n');

    for txn in transactions {
        output.push_str(&format_transaction_row(txn, names, symbol));
        output.push('\n');
    }

    output
}

/// Format transaction details for display
pub fn format_transaction_details(txn: &Transaction, names: &NameLookup, symbol: &str) -> String {
    let mut output = String::new();

    output.push_str(&format!("Transaction: {}\n", txn.id.full()));
    output.push_str(&format!("Kind:        {}\n", txn.kind));
    output.push_str(&format!("Date:        {}\n", txn.date.format("%Y-%m-%d")));
    output.push_str(&format!(
        "Amount:      {}\n",
        txn.amount.format_with_symbol(symbol)
    ));
    output.push_str(&format!(
        "{:13}{}\n",
        if txn.is_transfer() { "From:" } else { "Account:" },
        names.account(txn.source_account_id)
    ));
    if let Some(dest) = txn.dest_account_id {
        output.push_str(&format!("To:          {}\n", names.account(dest)));
    }

    match txn.category_id {
        Some(_) => output.push_str(&format!(
            "Category:    {}\n",
            names.category(txn.category_id)
        )),
        None => output.push_str("Category:    (uncategorized)\n"),
    }

    if !txn.description.is_empty() {
        output.push_str(&format!("Description: {}\n", txn.description));
    }

    output.push_str(&format!(
        "Created:     {}\n",
        txn.created_at.format("%Y-%m-%d %H:%M UTC")
    ));
    output.push_str(&format!(
        "Modified:    {}\n",
        txn.updated_at.format("%Y-%m-%d %H:%M UTC")
    ));

    output
}

/// Truncate a string to a maximum number of characters
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Money;
    use chrono::NaiveDate;

    fn names_for(pairs: &[(AccountId, &str)]) -> NameLookup {
        NameLookup {
            accounts: pairs.iter().map(|(id, n)| (*id, n.to_string())).collect(),
            categories: HashMap::new(),
        }
    }

    #[test]
    fn test_transfer_row_shows_both_accounts() {
        let a = AccountId::new();
        let b = AccountId::new();
        let mut txn = Transaction::new(
            TransactionKind::Transfer,
            Money::from_cents(15000),
            a,
            NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
        );
        txn.dest_account_id = Some(b);

        let row = format_transaction_row(&txn, &names_for(&[(a, "Operating"), (b, "Reserve")]), "$");
        assert!(row.contains("Operating -> Reserve"));
        assert!(row.contains("$150.00"));
        assert!(row.contains("2025-02-01"));
    }

    #[test]
    fn test_register_empty() {
        let output = format_transaction_register(&[], &NameLookup::default(), "$");
        assert!(output.contains("No transactions found"));
    }

    #[test]
    fn test_details_for_uncategorized_expense() {
        let a = AccountId::new();
        let mut txn = Transaction::new(
            TransactionKind::Expense,
            Money::from_cents(4200),
            a,
            NaiveDate::from_ymd_opt(2025, 2, 3).unwrap(),
        );
        txn.description = "Stairwell light bulbs".into();

        let output = format_transaction_details(&txn, &names_for(&[(a, "Cash Box")]), "$");
        assert!(output.contains("Account:     Cash Box"));
        assert!(output.contains("(uncategorized)"));
        assert!(output.contains("Stairwell light bulbs"));
        assert!(!output.contains("To:"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer label", 10), "a much ...");
    }
}
