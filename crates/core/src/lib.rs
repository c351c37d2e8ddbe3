//! `tillbook-core` — shared building blocks for the ledger.
//!
//! Typed identifiers, the `Entity` trait and the error taxonomy every other
//! crate reports through. No storage, no locking, no IO.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{LedgerError, LedgerResult};
pub use id::{AccountId, TransactionId, UserId};
