//! Infrastructure layer: the in-memory store and the services built on it.

pub mod config;
pub mod engine;
pub mod registrar;
pub mod store;


use std::sync::Arc;

use tillbook_auth::TokenIssuer;

pub use config::{ConfigError, LedgerConfig};
pub use engine::{BalanceMismatch, LedgerEngine};
pub use registrar::{IdentityRegistrar, Session};
pub use store::{EntityStore, Tables};

/// One store plus the two services that operate on it.
///
/// The store is created here and handed to both services explicitly; nothing
/// is process-global, so independent instances never share state.
#[derive(Debug, Clone)]
pub struct Tillbook {
    store: Arc<EntityStore>,
    engine: LedgerEngine,
    registrar: IdentityRegistrar,
}

impl Tillbook {
    pub fn new(config: &LedgerConfig) -> Self {
        Self::with_store(Arc::new(EntityStore::new()), config)
    }

    pub fn with_store(store: Arc<EntityStore>, config: &LedgerConfig) -> Self {
        let tokens = Arc::new(TokenIssuer::new(
            config.token_secret.as_bytes(),
            config.token_ttl(),
        ));

        let engine = LedgerEngine::new(store.clone()).with_lock_timeout(config.lock_timeout());
        let registrar =
            IdentityRegistrar::new(store.clone(), tokens).with_lock_timeout(config.lock_timeout());

        Self {
            store,
            engine,
            registrar,
        }
    }

    pub fn store(&self) -> &Arc<EntityStore> {
        &self.store
    }

    pub fn engine(&self) -> &LedgerEngine {
        &self.engine
    }

    pub fn registrar(&self) -> &IdentityRegistrar {
        &self.registrar
    }
}
