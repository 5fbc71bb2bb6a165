//! Category model
//!
//! Categories label transactions (dues, maintenance, utilities). The ledger
//! only checks that a referenced category exists; it never changes one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::CategoryId;
use crate::error::ValidationError;
use crate::validation;

/// Which side of the ledger a category is meant for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    Income,
    Expense,
    #[default]
    Any,
}

impl CategoryKind {
    pub const ALL: [CategoryKind; 3] = [Self::Income, Self::Expense, Self::Any];

    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let index = validation::one_of(s, "category kind", &["income", "expense", "any"])?;
        Ok(Self::ALL[index])
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Income => write!(f, "Income"),
            Self::Expense => write!(f, "Expense"),
            Self::Any => write!(f, "Any"),
        }
    }
}

/// A transaction category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,

    pub name: String,

    #[serde(default)]
    pub kind: CategoryKind,

    /// Archived categories are hidden from listings but stay referenceable
    #[serde(default)]
    pub archived: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn new(name: impl Into<String>, kind: CategoryKind) -> Self {
        let now = Utc::now();
        Self {
            id: CategoryId::new(),
            name: name.into(),
            kind,
            archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn archive(&mut self) {
        self.archived = true;
        self.updated_at = Utc::now();
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::require_text(&self.name, "name")?;
        validation::max_len(&self.name, "name", 50)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
