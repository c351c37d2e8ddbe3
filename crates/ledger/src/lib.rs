//! Ledger domain: accounts, balance movements and transaction records.
//!
//! Pure domain logic only: no IO, no locking, no persistence concerns. The
//! infra layer decides *when* a movement runs; this crate decides *whether* it
//! may and what it produces.

pub mod account;
pub mod transaction;

pub use account::{Account, AccountFilter, AccountUpdate, Movement};
pub use transaction::{Metadata, Transaction, TransactionKind, validate_amount};
