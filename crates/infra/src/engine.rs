//! Ledger engine: account lifecycle and money movement over the entity store.
//!
//! Every mutating operation takes the store's single write lock for its whole
//! read-validate-mutate-append sequence, so a balance change and its
//! transaction record(s) become visible together or not at all. One global
//! lock also makes transfers deadlock-free regardless of argument order.
//! Preconditions are always evaluated after the lock is held.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLockWriteGuard;
use serde::Serialize;
use tracing::{debug, info};

use tillbook_core::{AccountId, Entity, LedgerError, LedgerResult, UserId};
use tillbook_ledger::{
    Account, AccountFilter, AccountUpdate, Metadata, Movement, Transaction, validate_amount,
};

use crate::store::{EntityStore, Tables};

/// An account whose stored balance disagrees with its transaction records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceMismatch {
    pub account_id: AccountId,
    pub recorded: i64,
    /// Signed sum of the account's records; wider than a balance so that no
    /// ordering of records can overflow it.
    pub computed: i128,
}

/// Operation layer over a shared [`EntityStore`].
#[derive(Debug, Clone)]
pub struct LedgerEngine {
    store: Arc<EntityStore>,
    lock_timeout: Option<Duration>,
}

impl LedgerEngine {
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self {
            store,
            lock_timeout: None,
        }
    }

    /// Bound how long mutations wait for the write lock.
    pub fn with_lock_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<EntityStore> {
        &self.store
    }

    fn write(&self) -> LedgerResult<RwLockWriteGuard<'_, Tables>> {
        self.store.write_within(self.lock_timeout)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Account lifecycle
    // ─────────────────────────────────────────────────────────────────────

    pub fn create_account(
        &self,
        owner_id: UserId,
        name: &str,
        currency: &str,
    ) -> LedgerResult<Account> {
        let account = Account::open(owner_id, name, currency, Utc::now())?;

        self.write()?.insert_account(account.clone());

        info!(account_id = %account.id(), owner_id = %owner_id, currency, "account created");
        Ok(account)
    }

    /// Inactive accounts are still returned.
    pub fn get_account(&self, id: AccountId) -> LedgerResult<Account> {
        self.store
            .read()
            .account(&id)
            .cloned()
            .ok_or(LedgerError::NotFound)
    }

    /// Active accounts matching `filter`. Order is unspecified.
    pub fn list_accounts(&self, filter: &AccountFilter) -> Vec<Account> {
        self.store
            .read()
            .accounts()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect()
    }

    pub fn update_account(&self, id: AccountId, update: &AccountUpdate) -> LedgerResult<Account> {
        let mut tables = self.write()?;
        let account = tables.account_mut(&id).ok_or(LedgerError::NotFound)?;

        if account.apply_update(update, Utc::now()) {
            info!(
                account_id = %id,
                name = ?update.name,
                active = ?update.active,
                "account updated"
            );
        }
        Ok(account.clone())
    }

    /// Soft delete: the account stays readable but refuses money operations.
    pub fn deactivate_account(&self, id: AccountId) -> LedgerResult<()> {
        self.update_account(id, &AccountUpdate::default().active(false))
            .map(|_| ())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Money movement
    // ─────────────────────────────────────────────────────────────────────

    pub fn deposit(
        &self,
        account_id: AccountId,
        amount: i64,
        meta: Option<Metadata>,
    ) -> LedgerResult<Transaction> {
        self.post(account_id, Movement::Credit(amount), meta)
    }

    pub fn withdraw(
        &self,
        account_id: AccountId,
        amount: i64,
        meta: Option<Metadata>,
    ) -> LedgerResult<Transaction> {
        self.post(account_id, Movement::Debit(amount), meta)
    }

    fn post(
        &self,
        account_id: AccountId,
        movement: Movement,
        meta: Option<Metadata>,
    ) -> LedgerResult<Transaction> {
        validate_amount(movement.amount())?;

        let mut guard = self.write()?;
        let tables: &mut Tables = &mut guard;

        let account = tables.account_mut(&account_id).ok_or(LedgerError::NotFound)?;
        account.check(movement).inspect_err(|e| {
            debug!(account_id = %account_id, ?movement, error = %e, "movement rejected");
        })?;

        let now = Utc::now();
        account.apply(movement, now);
        let balance = account.balance();

        let record = Transaction::record(account_id, movement.kind(), movement.amount(), meta, now);
        tables.insert_transaction(record.clone());

        info!(
            account_id = %account_id,
            transaction_id = %record.id(),
            kind = %record.kind(),
            amount = record.amount(),
            balance,
            "movement posted"
        );
        Ok(record)
    }

    /// Move `amount` from `from` to `to` as one atomic step.
    ///
    /// Returns the `WITHDRAW` leg on `from` and the `DEPOSIT` leg on `to`; both
    /// carry the same metadata and timestamp. `from == to` is allowed and nets
    /// to zero, but still requires the balance to cover `amount`.
    pub fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: i64,
        meta: Option<Metadata>,
    ) -> LedgerResult<(Transaction, Transaction)> {
        validate_amount(amount)?;
        let debit = Movement::Debit(amount);
        let credit = Movement::Credit(amount);

        let mut guard = self.write()?;
        let tables: &mut Tables = &mut guard;

        let source = tables.account(&from).ok_or(LedgerError::NotFound)?;
        let target = tables.account(&to).ok_or(LedgerError::NotFound)?;

        let checked = source
            .ensure_active()
            .and_then(|_| target.ensure_active())
            .and_then(|_| source.check(debit))
            .and_then(|_| {
                // A self-transfer credits back what it just debited.
                if from == to {
                    Ok(source.balance())
                } else {
                    target.check(credit)
                }
            });
        if let Err(e) = checked {
            debug!(from = %from, to = %to, amount, error = %e, "transfer rejected");
            return Err(e);
        }

        // Both accounts were found above under this same write hold.
        let now = Utc::now();
        tables.existing_account_mut(&from).apply(debit, now);
        tables.existing_account_mut(&to).apply(credit, now);

        let out_leg = Transaction::record(from, debit.kind(), amount, meta.clone(), now);
        let in_leg = Transaction::record(to, credit.kind(), amount, meta, now);
        tables.insert_transaction(out_leg.clone());
        tables.insert_transaction(in_leg.clone());

        info!(
            from = %from,
            to = %to,
            amount,
            withdraw_id = %out_leg.id(),
            deposit_id = %in_leg.id(),
            "transfer posted"
        );
        Ok((out_leg, in_leg))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Audit
    // ─────────────────────────────────────────────────────────────────────

    /// Recompute every balance from its transaction records.
    ///
    /// Runs under one read hold, so it sees a consistent snapshot. An empty
    /// result means the books balance.
    pub fn audit(&self) -> Vec<BalanceMismatch> {
        let tables = self.store.read();

        let mut computed: HashMap<AccountId, i128> = HashMap::new();
        for record in tables.transactions() {
            *computed.entry(record.account_id()).or_default() += i128::from(record.signed_amount());
        }

        tables
            .accounts()
            .filter_map(|account| {
                let id = *account.id();
                let sum = computed.get(&id).copied().unwrap_or(0);
                let recorded = account.balance();
                (sum != i128::from(recorded) || recorded < 0).then_some(BalanceMismatch {
                    account_id: id,
                    recorded,
                    computed: sum,
                })
            })
            .collect()
    }
}
