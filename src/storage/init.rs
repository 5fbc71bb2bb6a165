//! Storage initialization
//!
//! Handles first-run setup and default data creation

use crate::config::paths::LedgerPaths;
use crate::error::LedgerError;
use crate::models::{Category, CategoryKind};

use super::categories::CategoryData;
use super::file_io::DataFile;

const DEFAULT_CATEGORIES: &[(&str, CategoryKind)] = &[
    ("Monthly Dues", CategoryKind::Income),
    ("Special Assessment", CategoryKind::Income),
    ("Late Fees", CategoryKind::Income),
    ("Cleaning", CategoryKind::Expense),
    ("Electricity", CategoryKind::Expense),
    ("Water", CategoryKind::Expense),
    ("Elevator Maintenance", CategoryKind::Expense),
    ("Repairs", CategoryKind::Expense),
    ("Insurance", CategoryKind::Expense),
    ("Bank Fees", CategoryKind::Expense),
    ("Other", CategoryKind::Any),
];

/// Initialize storage for a fresh installation
///
/// Creates the directories and a starter set of housing-dues categories.
pub fn initialize_storage(paths: &LedgerPaths) -> Result<(), LedgerError> {
    paths.ensure_directories()?;

    if needs_initialization(paths) {
        create_default_categories(paths)?;
    }

    Ok(())
}

fn create_default_categories(paths: &LedgerPaths) -> Result<(), LedgerError> {
    let categories = DEFAULT_CATEGORIES
        .iter()
        .map(|(name, kind)| Category::new(*name, *kind))
        .collect();

    DataFile::new(paths.categories_file()).store(&CategoryData { categories })
}

/// Check if storage needs initialization
pub fn needs_initialization(paths: &LedgerPaths) -> bool {
    !paths.categories_file().exists()
}
