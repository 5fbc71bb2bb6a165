//! Account CLI commands
//!
//! Implements CLI commands for account management.

use clap::Subcommand;

use super::parse_amount;
use crate::config::Settings;
use crate::display::account::{format_account_details, format_account_list};
use crate::error::LedgerResult;
use crate::models::AccountKind;
use crate::services::{AccountService, LedgerEngine, TransactionFilter};
use crate::storage::Storage;

/// Account subcommands
#[derive(Subcommand)]
pub enum AccountCommands {
    /// Create a new account
    Create {
        /// Account name
        name: String,
        /// Account kind (bank, cash, wallet, savings, other)
        #[arg(short, long, default_value = "bank")]
        kind: String,
        /// Currency code, defaults to the configured currency
        #[arg(long)]
        currency: Option<String>,
        /// Opening balance (e.g., "1000.00" or "1000")
        #[arg(short, long, default_value = "0")]
        balance: String,
    },
    /// List all accounts
    List {
        /// Show archived accounts
        #[arg(short, long)]
        all: bool,
    },
    /// Show account details
    Show {
        /// Account name or ID
        account: String,
    },
    /// Rename an account
    Rename {
        /// Account name or ID
        account: String,
        /// New name
        name: String,
    },
    /// Archive an account
    Archive {
        /// Account name or ID
        account: String,
    },
    /// Unarchive an account
    Unarchive {
        /// Account name or ID
        account: String,
    },
    /// Make an account the default
    Default {
        /// Account name or ID
        account: String,
    },
}

/// Handle an account command
pub fn handle_account_command(
    storage: &Storage,
    settings: &Settings,
    cmd: AccountCommands,
) -> LedgerResult<()> {
    let service = AccountService::new(storage);
    let symbol = settings.currency_symbol.as_str();

    match cmd {
        AccountCommands::Create {
            name,
            kind,
            currency,
            balance,
        } => {
            let kind = AccountKind::parse(&kind)?;
            let opening_balance = parse_amount(&balance, "balance")?;
            let currency = currency.unwrap_or_else(|| settings.default_currency.clone());

            let account = service.create(&name, kind, &currency, opening_balance)?;

            println!("Created account: {}", account.name);
            println!("  Kind: {}", account.kind);
            println!("  Currency: {}", account.currency);
            println!(
                "  Opening Balance: {}",
                account.balance.format_with_symbol(symbol)
            );
            println!("  ID: {}", account.id);
        }

        AccountCommands::List { all } => {
            let accounts = service.list(all)?;
            print!("{}", format_account_list(&accounts, symbol));
        }

        AccountCommands::Show { account } => {
            let found = service.require(&account)?;
            let transaction_count = LedgerEngine::new(storage)
                .list(TransactionFilter::new().account(found.id))?
                .len();
            print!(
                "{}",
                format_account_details(&found, transaction_count, symbol)
            );
        }

        AccountCommands::Rename { account, name } => {
            let found = service.require(&account)?;
            let renamed = service.rename(found.id, &name)?;
            println!("Renamed account: {} -> {}", found.name, renamed.name);
        }

        AccountCommands::Archive { account } => {
            let found = service.require(&account)?;
            let archived = service.archive(found.id)?;
            println!("Archived account: {}", archived.name);
        }

        AccountCommands::Unarchive { account } => {
            let found = service.require(&account)?;
            let unarchived = service.unarchive(found.id)?;
            println!("Unarchived account: {}", unarchived.name);
        }

        AccountCommands::Default { account } => {
            let found = service.require(&account)?;
            let default = service.set_default(found.id)?;
            println!("Default account: {}", default.name);
        }
    }

    Ok(())
}
