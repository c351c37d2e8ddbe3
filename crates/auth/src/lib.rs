//! `tillbook-auth` — identity records and credential handling.
//!
//! This crate is intentionally decoupled from storage: it knows how to build a
//! user, hash and check a password, and issue/verify bearer tokens. Uniqueness
//! and lookup live with the entity store.

pub mod claims;
pub mod credentials;
pub mod token;
pub mod user;

pub use claims::{TokenClaims, TokenValidationError, validate_claims};
pub use credentials::{hash_password, verify_password};
pub use token::{TokenError, TokenIssuer};
pub use user::User;
