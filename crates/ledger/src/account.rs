use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tillbook_core::{AccountId, Entity, LedgerError, LedgerResult, UserId};

use crate::transaction::TransactionKind;

/// A single-currency, money-holding account.
///
/// # Invariants
/// - `balance` is never negative.
/// - `balance` only changes through [`Account::apply`], after [`Account::check`]
///   has accepted the same movement.
/// - Accounts are never removed; "delete" clears `active`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    id: AccountId,
    owner_id: UserId,
    name: String,
    /// Free-form currency code (e.g. "USD"); not checked against any table.
    currency: String,
    /// Balance in minor units (e.g. cents).
    balance: i64,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// One side of a balance change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Credit(i64),
    Debit(i64),
}

impl Movement {
    /// Transaction tag recorded for this movement.
    pub fn kind(self) -> TransactionKind {
        match self {
            Movement::Credit(_) => TransactionKind::Deposit,
            Movement::Debit(_) => TransactionKind::Withdraw,
        }
    }

    pub fn amount(self) -> i64 {
        match self {
            Movement::Credit(n) | Movement::Debit(n) => n,
        }
    }
}

impl Account {
    /// Open a fresh account: zero balance, active.
    pub fn open(
        owner_id: UserId,
        name: impl Into<String>,
        currency: impl Into<String>,
        now: DateTime<Utc>,
    ) -> LedgerResult<Self> {
        let name = name.into();
        let currency = currency.into();
        if name.trim().is_empty() {
            return Err(LedgerError::validation("account name is required"));
        }
        if currency.trim().is_empty() {
            return Err(LedgerError::validation("currency is required"));
        }

        Ok(Self {
            id: AccountId::new(),
            owner_id,
            name,
            currency,
            balance: 0,
            active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn owner_id(&self) -> UserId {
        self.owner_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn ensure_active(&self) -> LedgerResult<()> {
        if !self.active {
            return Err(LedgerError::AccountInactive);
        }
        Ok(())
    }

    /// Decide the balance `movement` would leave, without touching state.
    ///
    /// Checks, in order: the account is active, the amount is positive, a debit
    /// is covered, a credit does not overflow.
    pub fn check(&self, movement: Movement) -> LedgerResult<i64> {
        self.ensure_active()?;
        crate::validate_amount(movement.amount())?;

        match movement {
            Movement::Credit(amount) => self
                .balance
                .checked_add(amount)
                .ok_or(LedgerError::InvalidAmount),
            Movement::Debit(amount) => {
                if self.balance < amount {
                    return Err(LedgerError::InsufficientFunds);
                }
                Ok(self.balance - amount)
            }
        }
    }

    /// Apply a movement that [`Account::check`] already accepted.
    pub fn apply(&mut self, movement: Movement, at: DateTime<Utc>) {
        match movement {
            Movement::Credit(amount) => self.balance += amount,
            Movement::Debit(amount) => self.balance -= amount,
        }
        debug_assert!(self.balance >= 0, "balance went negative on {}", self.id);
        self.updated_at = at;
    }

    /// Apply a partial update. Returns `true` if any field was supplied.
    pub fn apply_update(&mut self, update: &AccountUpdate, at: DateTime<Utc>) -> bool {
        if update.is_empty() {
            return false;
        }
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(active) = update.active {
            self.active = active;
        }
        self.updated_at = at;
        true
    }
}

impl Entity for Account {
    type Id = AccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Partial update: `None` means "leave unchanged", never "clear".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

impl AccountUpdate {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.active.is_none()
    }
}

/// Selection used by account listing.
///
/// Inactive accounts never match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountFilter {
    pub owner_id: UserId,
    pub currency: Option<String>,
    pub min_balance: Option<i64>,
}

impl AccountFilter {
    pub fn owned_by(owner_id: UserId) -> Self {
        Self {
            owner_id,
            currency: None,
            min_balance: None,
        }
    }

    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn min_balance(mut self, min_balance: i64) -> Self {
        self.min_balance = Some(min_balance);
        self
    }

    pub fn matches(&self, account: &Account) -> bool {
        if account.owner_id != self.owner_id || !account.active {
            return false;
        }
        if let Some(currency) = &self.currency {
            if &account.currency != currency {
                return false;
            }
        }
        if let Some(min) = self.min_balance {
            if account.balance < min {
                return false;
            }
        }
        true
    }
}
