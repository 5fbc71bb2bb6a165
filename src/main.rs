use anyhow::Result;
use clap::{Parser, Subcommand};

use dues_ledger::cli::{
    handle_account_command, handle_audit_command, handle_category_command,
    handle_transaction_command, AccountCommands, CategoryCommands, TransactionCommands,
};
use dues_ledger::config::{LedgerPaths, Settings};
use dues_ledger::storage::{initialize_storage, Storage};

#[derive(Parser)]
#[command(
    name = "dues",
    version,
    about = "Ledger for residential building dues",
    long_about = "dues records the income, expenses, and transfers of a residential \
                  building's accounts and keeps every account balance consistent \
                  with the transactions recorded against it."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the ledger with default categories
    Init,

    /// Show current configuration and paths
    Config,

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Category management commands
    #[command(subcommand)]
    Category(CategoryCommands),

    /// Transaction commands
    #[command(subcommand, alias = "transaction")]
    Txn(TransactionCommands),

    /// Show the operation log
    Audit {
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

fn main() -> Result<()> {
    dues_ledger::init_tracing();

    let cli = Cli::parse();

    // Initialize paths and settings
    let paths = LedgerPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;

    // Initialize storage
    let storage = Storage::open(paths.clone(), &settings)?;

    match cli.command {
        Some(Commands::Init) => {
            println!("Initializing dues ledger at: {}", paths.base_dir().display());
            initialize_storage(&paths)?;
            settings.save(&paths)?;
            println!("Initialization complete!");
            println!();
            println!("Default categories have been created.");
            println!("Run 'dues category list' to see them, then 'dues account create' to add accounts.");
        }
        Some(Commands::Config) => {
            println!("dues ledger configuration");
            println!("=========================");
            println!("Base directory:   {}", paths.base_dir().display());
            println!("Data directory:   {}", paths.data_dir().display());
            println!("Operation log:    {}", paths.audit_log().display());
            println!();
            println!("Settings:");
            println!("  Default currency: {}", settings.default_currency);
            println!("  Currency symbol:  {}", settings.currency_symbol);
            println!("  Lock timeout:     {}ms", settings.lock_timeout_ms);
        }
        Some(Commands::Account(cmd)) => {
            handle_account_command(&storage, &settings, cmd)?;
        }
        Some(Commands::Category(cmd)) => {
            handle_category_command(&storage, cmd)?;
        }
        Some(Commands::Txn(cmd)) => {
            handle_transaction_command(&storage, &settings, cmd)?;
        }
        Some(Commands::Audit { limit }) => {
            handle_audit_command(&storage, limit)?;
        }
        None => {
            println!("dues - ledger for residential building dues");
            println!();
            println!("Run 'dues --help' for usage information.");
        }
    }

    Ok(())
}
