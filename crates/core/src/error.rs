//! Ledger error model.

use thiserror::Error;

/// Result type used across the ledger.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Caller-visible failure of a ledger or identity operation.
///
/// Every variant except [`LedgerError::Internal`] is a caller-input or
/// state-precondition problem. Whatever the variant, an operation that returns
/// one has not mutated anything.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A referenced user or account identifier is unknown.
    #[error("not found")]
    NotFound,

    /// Registration conflict: the email already belongs to a user.
    #[error("email already registered")]
    DuplicateEmail,

    /// Amount was zero, negative, or would overflow the balance.
    #[error("amount must be positive")]
    InvalidAmount,

    /// The source balance does not cover the requested amount.
    #[error("insufficient funds")]
    InsufficientFunds,

    /// The operation targeted a deactivated account.
    #[error("account inactive")]
    AccountInactive,

    /// Credentials or bearer token did not resolve to a caller.
    #[error("unauthenticated")]
    Unauthenticated,

    /// The user exists but has been deactivated.
    #[error("user inactive")]
    UserInactive,

    /// A value failed validation (e.g. empty required field).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The caller's deadline passed while waiting for the store lock.
    #[error("timed out waiting for the store lock")]
    LockTimeout,

    /// A fault inside the service (e.g. the password hasher failed); retrying
    /// with the same input will not help the caller.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the caller can fix this by changing its input or the state it
    /// acts on.
    pub fn is_caller_fault(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }
}
