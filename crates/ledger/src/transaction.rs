use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tillbook_core::{AccountId, Entity, LedgerError, LedgerResult, TransactionId};

/// Caller-supplied annotations, stored as-is and never interpreted.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Direction of a posted movement.
///
/// `Transfer` is a valid tag but transfers are always materialized as one
/// `Withdraw` leg plus one `Deposit` leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Deposit,
    Withdraw,
    Transfer,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "DEPOSIT",
            TransactionKind::Withdraw => "WITHDRAW",
            TransactionKind::Transfer => "TRANSFER",
        }
    }
}

impl core::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of one balance movement on one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    id: TransactionId,
    account_id: AccountId,
    kind: TransactionKind,
    /// Positive amount in minor units; the sign comes from `kind`.
    amount: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    meta: Option<Metadata>,
    created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn record(
        account_id: AccountId,
        kind: TransactionKind,
        amount: i64,
        meta: Option<Metadata>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            account_id,
            kind,
            amount,
            meta,
            created_at,
        }
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn meta(&self) -> Option<&Metadata> {
        self.meta.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Effect of this record on its account's balance.
    pub fn signed_amount(&self) -> i64 {
        match self.kind {
            TransactionKind::Deposit => self.amount,
            TransactionKind::Withdraw => -self.amount,
            TransactionKind::Transfer => 0,
        }
    }
}

impl Entity for Transaction {
    type Id = TransactionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Reject amounts that cannot describe a movement.
pub fn validate_amount(amount: i64) -> LedgerResult<i64> {
    if amount <= 0 {
        return Err(LedgerError::InvalidAmount);
    }
    Ok(amount)
}
