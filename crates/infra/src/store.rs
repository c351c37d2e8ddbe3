//! In-memory entity store.
//!
//! One coarse reader/writer lock covers every table and the email index.
//! Readers share it; writers are serialized against everything. The store
//! validates nothing: invariants belong to the engine and the registrar.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tillbook_auth::User;
use tillbook_core::{AccountId, Entity, LedgerError, LedgerResult, TransactionId, UserId};
use tillbook_ledger::{Account, Transaction};

/// Every table the store holds, as seen through a lock guard.
#[derive(Debug, Default)]
pub struct Tables {
    users: HashMap<UserId, User>,
    accounts: HashMap<AccountId, Account>,
    transactions: HashMap<TransactionId, Transaction>,
    email_index: HashMap<String, UserId>,
}

fn put<E>(table: &mut HashMap<E::Id, E>, record: E)
where
    E: Entity,
{
    let id = *record.id();
    let previous = table.insert(id, record);
    assert!(previous.is_none(), "identifier {id:?} issued twice");
}

impl Tables {
    pub fn user(&self, id: &UserId) -> Option<&User> {
        self.users.get(id)
    }

    pub fn user_mut(&mut self, id: &UserId) -> Option<&mut User> {
        self.users.get_mut(id)
    }

    /// Resolve through the email index.
    ///
    /// Panics if the index names a user the table does not hold.
    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        let id = self.email_index.get(email)?;
        let user = self
            .users
            .get(id)
            .unwrap_or_else(|| panic!("email index points at missing user {id}"));
        Some(user)
    }

    pub fn email_owner(&self, email: &str) -> Option<UserId> {
        self.email_index.get(email).copied()
    }

    /// Insert a user and its index entry in one step.
    pub fn insert_user(&mut self, user: User) {
        self.email_index.insert(user.email().to_string(), *user.id());
        put(&mut self.users, user);
    }

    pub fn account(&self, id: &AccountId) -> Option<&Account> {
        self.accounts.get(id)
    }

    pub fn account_mut(&mut self, id: &AccountId) -> Option<&mut Account> {
        self.accounts.get_mut(id)
    }

    /// For callers that already saw `id` under the current write hold.
    pub fn existing_account_mut(&mut self, id: &AccountId) -> &mut Account {
        self.accounts
            .get_mut(id)
            .unwrap_or_else(|| panic!("account {id} vanished under the write lock"))
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn insert_account(&mut self, account: Account) {
        put(&mut self.accounts, account);
    }

    pub fn insert_transaction(&mut self, transaction: Transaction) {
        put(&mut self.transactions, transaction);
    }

    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.values()
    }

    /// Every record posted against `account_id`, in no particular order.
    pub fn transactions_for(&self, account_id: &AccountId) -> Vec<&Transaction> {
        self.transactions
            .values()
            .filter(|t| &t.account_id() == account_id)
            .collect()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }
}

/// Shared, injectable store handle. Wrap in `Arc` to share between services.
#[derive(Debug, Default)]
pub struct EntityStore {
    tables: RwLock<Tables>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared access; blocks only behind an active writer.
    pub fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read()
    }

    /// Exclusive access; blocks until every reader and writer has left.
    pub fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write()
    }

    /// Exclusive access, giving up after `timeout` if one is set.
    ///
    /// Nothing has been mutated when this fails.
    pub fn write_within(
        &self,
        timeout: Option<Duration>,
    ) -> LedgerResult<RwLockWriteGuard<'_, Tables>> {
        match timeout {
            None => Ok(self.tables.write()),
            Some(limit) => self
                .tables
                .try_write_for(limit)
                .ok_or(LedgerError::LockTimeout),
        }
    }
}
