//! Account display formatting
//!
//! Formats accounts for terminal output in table and detail views.

use std::collections::BTreeMap;

use crate::models::{Account, Money};

/// Format a list of accounts as a table, with per-currency totals
pub fn format_account_list(accounts: &[Account], symbol: &str) -> String {
    if accounts.is_empty() {
        return "No accounts found.\n".to_string();
    }

    let name_width = accounts
        .iter()
        .map(|a| a.name.len())
        .max()
        .unwrap_or(4)
        .max(4);

    let mut output = String::new();
    output.push_str(&format!(
        "{:<name_width$}  {:<8}  {:<4}  {:>14}  {}\n",
        "Name",
        "Kind",
        "Cur",
        "Balance",
        "Status",
        name_width = name_width,
    ));
    output.push_str(&separator(name_width));

    for account in accounts {
        let status = if !account.active {
            "Archived"
        } else if account.is_default {
            "Default"
        } else {
            ""
        };

        output.push_str(&format!(
            "{:<name_width$}  {:<8}  {:<4}  {:>14}  {}\n",
            account.name,
            account.kind.to_string(),
            account.currency,
            account.balance.format_with_symbol(symbol),
            status,
            name_width = name_width,
        ));
    }

    // Archived accounts stay out of the totals
    let mut totals: BTreeMap<&str, Money> = BTreeMap::new();
    for account in accounts.iter().filter(|a| a.active) {
        *totals.entry(account.currency.as_str()).or_default() += account.balance;
    }

    output.push_str(&separator(name_width));
    for (currency, total) in totals {
        output.push_str(&format!(
            "{:<name_width$}  {:<8}  {:<4}  {:>14}\n",
            "TOTAL",
            "",
            currency,
            total.format_with_symbol(symbol),
            name_width = name_width,
        ));
    }

    output
}

fn separator(name_width: usize) -> String {
    format!(
        "{:-<name_width$}  {:-<8}  {:-<4}  {:->14}  {:-<8}\n",
        "",
        "",
        "",
        "",
        "",
        name_width = name_width,
    )
}

/// Format a single account's details
pub fn format_account_details(account: &Account, transaction_count: usize, symbol: &str) -> String {
    let mut output = String::new();

    output.push_str(&format!("Account: {}\n", account.name));
    output.push_str(&format!("  Kind:         {}\n", account.kind));
    output.push_str(&format!("  ID:           {}\n", account.id.full()));
    output.push_str(&format!("  Currency:     {}\n", account.currency));
    output.push_str(&format!(
        "  Balance:      {}\n",
        account.balance.format_with_symbol(symbol)
    ));
    output.push_str(&format!("  Transactions: {}\n", transaction_count));
    output.push_str(&format!(
        "  Archived:     {}\n",
        if account.active { "No" } else { "Yes" }
    ));
    output.push_str(&format!(
        "  Default:      {}\n",
        if account.is_default { "Yes" } else { "No" }
    ));

    if !account.notes.is_empty() {
        output.push('\n');
        output.push_str(&format!("  Notes: {}\n", account.notes));
    }

    output.push('\n');
    output.push_str(&format!(
        "  Created:  {}\n",
        account.created_at.format("%Y-%m-%d %H:%M UTC")
    ));
    output.push_str(&format!(
        "  Modified: {}\n",
        account.updated_at.format("%Y-%m-%d %H:%M UTC")
    ));

    output
}
