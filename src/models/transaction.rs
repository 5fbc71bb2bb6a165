//! Transaction model
//!
//! Represents ledger transactions (income, expense, transfer) and the balance
//! effect each one has on the accounts it touches.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{AccountId, CategoryId, TransactionId};
use super::money::Money;
use crate::error::ValidationError;
use crate::validation;

/// Kind of transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money entering the source account (e.g., dues collected)
    Income,
    /// Money leaving the source account (e.g., maintenance paid)
    Expense,
    /// Money moved from the source account to the destination account
    Transfer,
}

impl TransactionKind {
    pub const ALL: [TransactionKind; 3] = [Self::Income, Self::Expense, Self::Transfer];

    const NAMES: [&'static str; 3] = ["income", "expense", "transfer"];

    /// Parse a kind from user input
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let index = validation::one_of(s, "kind", &Self::NAMES)?;
        Ok(Self::ALL[index])
    }

    pub fn as_str(&self) -> &'static str {
        Self::NAMES[*self as usize]
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Income => write!(f, "Income"),
            Self::Expense => write!(f, "Expense"),
            Self::Transfer => write!(f, "Transfer"),
        }
    }
}

/// One signed balance change on one account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub account_id: AccountId,
    pub delta: Money,
}

/// The balance effect of a transaction: one posting, or two for a transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Effect {
    postings: Vec<Posting>,
}

impl Effect {
    /// Compute the effect of a transaction with the given shape
    ///
    /// Income credits the source; Expense debits it; Transfer debits the
    /// source and credits the destination. Debits come first.
    pub fn of(
        kind: TransactionKind,
        amount: Money,
        source: AccountId,
        dest: Option<AccountId>,
    ) -> Self {
        let postings = match (kind, dest) {
            (TransactionKind::Income, _) => vec![Posting {
                account_id: source,
                delta: amount,
            }],
            (TransactionKind::Expense, _) => vec![Posting {
                account_id: source,
                delta: -amount,
            }],
            (TransactionKind::Transfer, Some(dest)) => vec![
                Posting {
                    account_id: source,
                    delta: -amount,
                },
                Posting {
                    account_id: dest,
                    delta: amount,
                },
            ],
            // A transfer without a destination never passes validation
            (TransactionKind::Transfer, None) => vec![Posting {
                account_id: source,
                delta: -amount,
            }],
        };
        Self { postings }
    }

    /// The arithmetic inverse of this effect
    pub fn reversed(&self) -> Self {
        Self {
            postings: self
                .postings
                .iter()
                .map(|p| Posting {
                    account_id: p.account_id,
                    delta: -p.delta,
                })
                .collect(),
        }
    }

    pub fn postings(&self) -> &[Posting] {
        &self.postings
    }

    /// Accounts this effect touches, in posting order
    pub fn accounts(&self) -> impl Iterator<Item = AccountId> + '_ {
        self.postings.iter().map(|p| p.account_id)
    }

    /// Net change across all postings (zero for transfers)
    pub fn net(&self) -> Money {
        self.postings.iter().map(|p| p.delta).sum()
    }
}

/// A ledger transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier
    pub id: TransactionId,

    pub kind: TransactionKind,

    /// Always strictly positive; the kind carries the direction
    pub amount: Money,

    /// The account credited (income) or debited (expense, transfer)
    pub source_account_id: AccountId,

    /// Receiving account, transfers only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_account_id: Option<AccountId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,

    /// Transaction date
    pub date: NaiveDate,

    #[serde(default)]
    pub description: String,

    #[serde(default = "default_active")]
    pub active: bool,

    /// When the transaction was created
    pub created_at: DateTime<Utc>,

    /// When the transaction was last modified
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl Transaction {
    /// Create a new transaction
    pub fn new(
        kind: TransactionKind,
        amount: Money,
        source_account_id: AccountId,
        date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::new(),
            kind,
            amount,
            source_account_id,
            dest_account_id: None,
            category_id: None,
            date,
            description: String::new(),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Balance effect this transaction has when applied
    pub fn effect(&self) -> Effect {
        Effect::of(
            self.kind,
            self.amount,
            self.source_account_id,
            self.dest_account_id,
        )
    }

    pub fn is_transfer(&self) -> bool {
        self.kind == TransactionKind::Transfer
    }

    /// Check the shape invariants that do not need account state
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::positive(self.amount, "amount")?;
        validation::max_len(&self.description, "description", 500)?;

        match (self.kind, self.dest_account_id) {
            (TransactionKind::Transfer, None) => Err(ValidationError::MissingField {
                field: "dest_account_id",
            }),
            (TransactionKind::Transfer, Some(dest)) if dest == self.source_account_id => {
                Err(ValidationError::SameAccount)
            }
            (kind, Some(_)) if kind != TransactionKind::Transfer => {
                Err(ValidationError::UnexpectedField {
                    field: "dest_account_id",
                    kind: kind.as_str(),
                })
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.date, self.kind, self.amount)?;
        if !self.description.is_empty() {
            write!(f, " - {}", self.description)?;
        }
        Ok(())
    }
}
