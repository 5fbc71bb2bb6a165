//! Category CLI commands

use clap::Subcommand;

use crate::display::category::format_category_list;
use crate::error::LedgerResult;
use crate::models::CategoryKind;
use crate::services::CategoryService;
use crate::storage::Storage;

/// Category subcommands
#[derive(Subcommand)]
pub enum CategoryCommands {
    /// Create a new category
    Create {
        /// Category name
        name: String,
        /// Category kind (income, expense, any)
        #[arg(short, long, default_value = "any")]
        kind: String,
    },
    /// List categories
    List {
        /// Show archived categories
        #[arg(short, long)]
        all: bool,
    },
    /// Archive a category
    Archive {
        /// Category name or ID
        category: String,
    },
}

/// Handle a category command
pub fn handle_category_command(storage: &Storage, cmd: CategoryCommands) -> LedgerResult<()> {
    let service = CategoryService::new(storage);

    match cmd {
        CategoryCommands::Create { name, kind } => {
            let kind = CategoryKind::parse(&kind)?;
            let category = service.create(&name, kind)?;
            println!("Created category: {} ({})", category.name, category.kind);
            println!("  ID: {}", category.id);
        }

        CategoryCommands::List { all } => {
            let categories = service.list(all)?;
            print!("{}", format_category_list(&categories));
        }

        CategoryCommands::Archive { category } => {
            let found = service.require(&category)?;
            let archived = service.archive(found.id)?;
            println!("Archived category: {}", archived.name);
        }
    }

    Ok(())
}
