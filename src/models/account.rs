//! Account model
//!
//! Represents money-holding accounts (bank, cash box, wallet, savings).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::AccountId;
use super::money::Money;
use crate::error::{LedgerError, LedgerResult, ValidationError};
use crate::validation;

/// Kind of account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// Bank account
    #[default]
    Bank,
    /// Physical cash box
    Cash,
    /// Digital wallet
    Wallet,
    /// Savings / reserve fund
    Savings,
    /// Anything else
    Other,
}

impl AccountKind {
    pub const ALL: [AccountKind; 5] = [
        Self::Bank,
        Self::Cash,
        Self::Wallet,
        Self::Savings,
        Self::Other,
    ];

    const NAMES: [&'static str; 5] = ["bank", "cash", "wallet", "savings", "other"];

    /// Parse account kind from string
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let index = validation::one_of(s, "account kind", &Self::NAMES)?;
        Ok(Self::ALL[index])
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bank => write!(f, "Bank"),
            Self::Cash => write!(f, "Cash"),
            Self::Wallet => write!(f, "Wallet"),
            Self::Savings => write!(f, "Savings"),
            Self::Other => write!(f, "Other"),
        }
    }
}

/// A money-holding account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier
    pub id: AccountId,

    /// Account name (e.g., "Operating Account")
    pub name: String,

    /// Kind of account
    pub kind: AccountKind,

    /// Current balance in minor units. Only the ledger engine writes this
    /// after the account is created.
    pub balance: Money,

    /// Inactive accounts are hidden from listings and reject new effects
    pub active: bool,

    /// Whether this is the default account offered for new transactions
    #[serde(default)]
    pub is_default: bool,

    /// Currency tag, e.g. "USD"
    pub currency: String,

    /// Notes about this account
    #[serde(default)]
    pub notes: String,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last modified
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account with a zero balance
    pub fn new(name: impl Into<String>, kind: AccountKind, currency: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: AccountId::new(),
            name: name.into(),
            kind,
            balance: Money::zero(),
            active: true,
            is_default: false,
            currency: currency.into().trim().to_uppercase(),
            notes: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a new account with an opening balance
    pub fn with_opening_balance(
        name: impl Into<String>,
        kind: AccountKind,
        currency: impl Into<String>,
        opening_balance: Money,
    ) -> Self {
        let mut account = Self::new(name, kind, currency);
        account.balance = opening_balance;
        account
    }

    /// Move the balance by `delta`
    ///
    /// Fails with `InsufficientBalance` if the result would be negative and
    /// `allow_negative` is false. The account is left untouched on error.
    pub fn apply_delta(&mut self, delta: Money, allow_negative: bool) -> LedgerResult<()> {
        let next = self
            .balance
            .checked_add(delta)
            .ok_or_else(|| ValidationError::Overflow(self.name.clone()))?;

        if next.is_negative() && !allow_negative {
            return Err(LedgerError::InsufficientBalance {
                account: self.name.clone(),
                needed: -delta,
                available: self.balance,
            });
        }

        self.balance = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Mark this account as archived
    pub fn archive(&mut self) {
        self.active = false;
        self.is_default = false;
        self.updated_at = Utc::now();
    }

    /// Unarchive this account
    pub fn unarchive(&mut self) {
        self.active = true;
        self.updated_at = Utc::now();
    }

    /// Validate the account
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::require_text(&self.name, "name")?;
        validation::max_len(&self.name, "name", 100)?;
        validation::require_text(&self.currency, "currency")?;
        validation::max_len(&self.currency, "currency", 8)?;
        Ok(())
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.kind, self.currency)
    }
}
