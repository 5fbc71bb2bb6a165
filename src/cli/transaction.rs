//! Transaction CLI commands
//!
//! Implements CLI commands for recording, correcting, and removing ledger
//! transactions.

use chrono::Local;
use clap::Subcommand;

use super::{parse_amount, parse_date};
use crate::config::Settings;
use crate::display::transaction::{
    format_transaction_details, format_transaction_register, NameLookup,
};
use crate::error::{LedgerError, LedgerResult};
use crate::models::{AccountId, CategoryId, TransactionKind};
use crate::services::{
    AccountService, CategoryService, CreateTransactionInput, LedgerEngine, TransactionFilter,
    TransactionPatch,
};
use crate::storage::Storage;

/// Transaction subcommands
#[derive(Subcommand)]
pub enum TransactionCommands {
    /// Record a new transaction
    Add {
        /// Transaction kind (income, expense, transfer)
        kind: String,
        /// Amount (e.g., "50.00")
        amount: String,
        /// Source account name or ID, defaults to the default account
        #[arg(short, long)]
        from: Option<String>,
        /// Destination account name or ID (transfers only)
        #[arg(short, long)]
        to: Option<String>,
        /// Category name or ID
        #[arg(short, long)]
        category: Option<String>,
        /// Transaction date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<String>,
        /// Description
        #[arg(short = 'm', long)]
        description: Option<String>,
    },
    /// Correct a recorded transaction
    Edit {
        /// Transaction ID
        id: String,
        /// New kind
        #[arg(short, long)]
        kind: Option<String>,
        /// New amount
        #[arg(short, long)]
        amount: Option<String>,
        /// New source account
        #[arg(short, long)]
        from: Option<String>,
        /// New destination account
        #[arg(short, long, conflicts_with = "clear_to")]
        to: Option<String>,
        /// Remove the destination account
        #[arg(long)]
        clear_to: bool,
        /// New category
        #[arg(short, long, conflicts_with = "clear_category")]
        category: Option<String>,
        /// Remove the category
        #[arg(long)]
        clear_category: bool,
        /// New date
        #[arg(short, long)]
        date: Option<String>,
        /// New description
        #[arg(short = 'm', long)]
        description: Option<String>,
    },
    /// Delete a transaction and reverse its effect
    Delete {
        /// Transaction ID
        id: String,
    },
    /// List transactions
    List {
        /// Filter by account name or ID
        #[arg(short, long)]
        account: Option<String>,
        /// Filter by kind
        #[arg(short, long)]
        kind: Option<String>,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        since: Option<String>,
        /// End date (YYYY-MM-DD)
        #[arg(long)]
        until: Option<String>,
        /// Number of transactions to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Show transaction details
    Show {
        /// Transaction ID
        id: String,
    },
}

/// Handle a transaction command
pub fn handle_transaction_command(
    storage: &Storage,
    settings: &Settings,
    cmd: TransactionCommands,
) -> LedgerResult<()> {
    let engine = LedgerEngine::new(storage);
    let accounts = AccountService::new(storage);
    let categories = CategoryService::new(storage);
    let symbol = settings.currency_symbol.as_str();

    let account_id = |identifier: &str| -> LedgerResult<AccountId> {
        Ok(accounts.require(identifier)?.id)
    };
    let category_id = |identifier: &str| -> LedgerResult<CategoryId> {
        Ok(categories.require(identifier)?.id)
    };

    match cmd {
        TransactionCommands::Add {
            kind,
            amount,
            from,
            to,
            category,
            date,
            description,
        } => {
            let kind = TransactionKind::parse(&kind)?;
            let amount = parse_amount(&amount, "amount")?;

            let mut input = CreateTransactionInput::new(kind, amount);
            match from {
                Some(from) => input = input.source(account_id(&from)?),
                None => {
                    if let Some(default) = accounts.default_account()? {
                        input = input.source(default.id);
                    }
                }
            }
            if let Some(to) = to {
                input = input.dest(account_id(&to)?);
            }
            if let Some(category) = category {
                input = input.category(category_id(&category)?);
            }
            input = input.date(match date {
                Some(date) => parse_date(&date)?,
                None => Local::now().date_naive(),
            });
            if let Some(description) = description {
                input = input.description(description);
            }

            let txn = engine.create(input)?;
            println!(
                "Recorded {} of {} ({})",
                txn.kind.as_str(),
                txn.amount.format_with_symbol(symbol),
                txn.id
            );
        }

        TransactionCommands::Edit {
            id,
            kind,
            amount,
            from,
            to,
            clear_to,
            category,
            clear_category,
            date,
            description,
        } => {
            let found = engine
                .find(&id)?
                .ok_or_else(|| LedgerError::transaction_not_found(&id))?;

            let mut patch = TransactionPatch::new();
            if let Some(kind) = kind {
                patch = patch.kind(TransactionKind::parse(&kind)?);
            }
            if let Some(amount) = amount {
                patch = patch.amount(parse_amount(&amount, "amount")?);
            }
            if let Some(from) = from {
                patch = patch.source(account_id(&from)?);
            }
            if clear_to {
                patch = patch.dest(None);
            } else if let Some(to) = to {
                patch = patch.dest(Some(account_id(&to)?));
            }
            if clear_category {
                patch = patch.category(None);
            } else if let Some(category) = category {
                patch = patch.category(Some(category_id(&category)?));
            }
            if let Some(date) = date {
                patch = patch.date(parse_date(&date)?);
            }
            if let Some(description) = description {
                patch = patch.description(description);
            }

            if patch.is_empty() {
                println!("No changes specified.");
                return Ok(());
            }

            match engine.update(found.id, patch)? {
                Some(updated) => println!("Updated transaction {}", updated.id),
                None => return Err(LedgerError::transaction_not_found(&id)),
            }
        }

        TransactionCommands::Delete { id } => {
            let found = engine
                .find(&id)?
                .ok_or_else(|| LedgerError::transaction_not_found(&id))?;

            if engine.delete(found.id)? {
                println!("Deleted transaction {}", found.id);
            } else {
                return Err(LedgerError::transaction_not_found(&id));
            }
        }

        TransactionCommands::List {
            account,
            kind,
            since,
            until,
            limit,
        } => {
            let mut filter = TransactionFilter::new().limit(limit);
            if let Some(account) = account {
                filter = filter.account(account_id(&account)?);
            }
            if let Some(kind) = kind {
                filter = filter.kind(TransactionKind::parse(&kind)?);
            }
            if let Some(since) = since {
                filter.start_date = Some(parse_date(&since)?);
            }
            if let Some(until) = until {
                filter.end_date = Some(parse_date(&until)?);
            }

            let transactions = engine.list(filter)?;
            print!(
                "{}",
                format_transaction_register(&transactions, &name_lookup(storage)?, symbol)
            );
        }

        TransactionCommands::Show { id } => {
            let txn = engine
                .find(&id)?
                .ok_or_else(|| LedgerError::transaction_not_found(&id))?;
            print!(
                "{}",
                format_transaction_details(&txn, &name_lookup(storage)?, symbol)
            );
        }
    }

    Ok(())
}

fn name_lookup(storage: &Storage) -> LedgerResult<NameLookup> {
    Ok(NameLookup {
        accounts: storage
            .accounts
            .get_all()?
            .into_iter()
            .map(|a| (a.id, a.name))
            .collect(),
        categories: storage
            .categories
            .get_all()?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect(),
    })
}
