//! Registered user record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tillbook_core::{Entity, LedgerError, LedgerResult, UserId};

/// A registered user.
///
/// # Invariants
/// - `email` is stored exactly as registered (case-sensitive) and is unique
///   across the store (enforced by the registrar, not here).
/// - Users are never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    email: String,
    #[serde(skip_serializing, default)]
    password_hash: String,
    name: String,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl User {
    /// Build a new, active user from an already-hashed credential.
    pub fn register(
        email: impl Into<String>,
        password_hash: String,
        name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> LedgerResult<Self> {
        let email = email.into();
        if email.trim().is_empty() {
            return Err(LedgerError::validation("email is required"));
        }

        Ok(Self {
            id: UserId::new(),
            email,
            password_hash,
            name: name.into(),
            active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn name(&self) -> &str {
        &self.name
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

    pub fn set_active(&mut self, active: bool, at: DateTime<Utc>) {
        self.active = active;
        self.updated_at = at;
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
