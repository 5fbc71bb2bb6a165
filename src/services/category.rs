//! Category service
//!
//! Categories are labels the ledger references by id. They can be created
//! and archived, never deleted, so a stored transaction's category always
//! resolves.

use crate::audit::{AuditEntry, EntityType};
use crate::error::{LedgerError, LedgerResult};
use crate::models::ids::unique_match;
use crate::models::{Category, CategoryId, CategoryKind};
use crate::storage::Storage;
use crate::validation;

/// Service for category management
pub struct CategoryService<'a> {
    storage: &'a Storage,
}

impl<'a> CategoryService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Create a new category
    pub fn create(&self, name: &str, kind: CategoryKind) -> LedgerResult<Category> {
        let name = validation::require_text(name, "name")?;

        if self.storage.categories.get_by_name(name)?.is_some() {
            return Err(LedgerError::Duplicate {
                entity_type: "Category",
                identifier: name.to_string(),
            });
        }

        let category = Category::new(name, kind);
        category.validate()?;

        self.storage.categories.upsert(category.clone())?;
        self.storage.categories.save()?;
        self.storage.append_audit(&[AuditEntry::create(
            EntityType::Category,
            category.id.full(),
            Some(category.name.clone()),
            &category,
        )]);

        Ok(category)
    }

    pub fn get(&self, id: CategoryId) -> LedgerResult<Option<Category>> {
        self.storage.categories.get(id)
    }

    /// Find a category by name, full ID, or short ID
    pub fn find(&self, identifier: &str) -> LedgerResult<Option<Category>> {
        if let Some(category) = self.storage.categories.get_by_name(identifier)? {
            return Ok(Some(category));
        }

        if let Ok(id) = identifier.parse::<CategoryId>() {
            return self.storage.categories.get(id);
        }

        Ok(unique_match(
            self.storage
                .categories
                .get_all()?
                .into_iter()
                .filter(|c| c.id.starts_with(identifier)),
        ))
    }

    /// Like `find`, but a missing category is an error
    pub fn require(&self, identifier: &str) -> LedgerResult<Category> {
        self.find(identifier)?
            .ok_or_else(|| LedgerError::category_not_found(identifier))
    }

    /// All categories sorted by name
    pub fn list(&self, include_archived: bool) -> LedgerResult<Vec<Category>> {
        let mut categories = self.storage.categories.get_all()?;
        if !include_archived {
            categories.retain(|c| !c.archived);
        }
        Ok(categories)
    }

    /// Hide a category from listings; transactions keep referencing it
    pub fn archive(&self, id: CategoryId) -> LedgerResult<Category> {
        let before = self
            .storage
            .categories
            .get(id)?
            .ok_or_else(|| LedgerError::category_not_found(id.to_string()))?;
        if before.archived {
            return Ok(before);
        }

        let mut category = before.clone();
        category.archive();

        self.storage.categories.upsert(category.clone())?;
        self.storage.categories.save()?;
        self.storage.append_audit(&[AuditEntry::update(
            EntityType::Category,
            category.id.full(),
            Some(category.name.clone()),
            &before,
            &category,
            Some("archived: false -> true".to_string()),
        )]);

        Ok(category)
    }
}
