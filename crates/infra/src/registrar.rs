//! Identity registrar: user registration, lookup, login and caller resolution.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use tillbook_auth::{TokenIssuer, User, hash_password, verify_password};
use tillbook_core::{Entity, LedgerError, LedgerResult, UserId};

use crate::store::EntityStore;

/// A successful login: the user and a bearer token for it.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
}

/// User-facing half of the store: the email index and credentials.
#[derive(Debug, Clone)]
pub struct IdentityRegistrar {
    store: Arc<EntityStore>,
    tokens: Arc<TokenIssuer>,
    lock_timeout: Option<Duration>,
}

impl IdentityRegistrar {
    pub fn new(store: Arc<EntityStore>, tokens: Arc<TokenIssuer>) -> Self {
        Self {
            store,
            tokens,
            lock_timeout: None,
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Create a user. Fails with `DuplicateEmail` if the email is taken.
    ///
    /// The credential is hashed before the lock is taken; the uniqueness check
    /// and both inserts happen under one write hold.
    pub fn register(&self, email: &str, password: &str, name: &str) -> LedgerResult<User> {
        let hash = hash_password(password)?;
        let user = User::register(email, hash, name, Utc::now())?;

        let mut tables = self.store.write_within(self.lock_timeout)?;
        if tables.email_owner(email).is_some() {
            warn!(email, "registration rejected: email already registered");
            return Err(LedgerError::DuplicateEmail);
        }
        tables.insert_user(user.clone());
        drop(tables);

        info!(user_id = %user.id(), "user registered");
        Ok(user)
    }

    pub fn lookup_by_email(&self, email: &str) -> LedgerResult<User> {
        self.store
            .read()
            .user_by_email(email)
            .cloned()
            .ok_or(LedgerError::NotFound)
    }

    pub fn lookup_by_id(&self, id: UserId) -> LedgerResult<User> {
        self.store
            .read()
            .user(&id)
            .cloned()
            .ok_or(LedgerError::NotFound)
    }

    pub fn set_user_active(&self, id: UserId, active: bool) -> LedgerResult<User> {
        let mut tables = self.store.write_within(self.lock_timeout)?;
        let user = tables.user_mut(&id).ok_or(LedgerError::NotFound)?;
        user.set_active(active, Utc::now());
        info!(user_id = %id, active, "user activation changed");
        Ok(user.clone())
    }

    /// Check credentials and issue a bearer token.
    ///
    /// Unknown email and wrong password are reported identically.
    pub fn authenticate(&self, email: &str, password: &str) -> LedgerResult<Session> {
        let user = self.lookup_by_email(email).map_err(|_| {
            warn!("login rejected: unknown email");
            LedgerError::Unauthenticated
        })?;

        if !verify_password(password, user.password_hash()) {
            warn!(user_id = %user.id(), "login rejected: bad credentials");
            return Err(LedgerError::Unauthenticated);
        }
        if !user.is_active() {
            warn!(user_id = %user.id(), "login rejected: user inactive");
            return Err(LedgerError::UserInactive);
        }

        let token = self.tokens.issue(*user.id(), Utc::now()).map_err(|e| {
            warn!(error = %e, "token signing failed");
            LedgerError::Unauthenticated
        })?;

        info!(user_id = %user.id(), "user authenticated");
        Ok(Session { user, token })
    }

    /// Resolve a bearer token to the caller's user id.
    pub fn resolve_caller(&self, token: &str) -> LedgerResult<UserId> {
        let user_id = self.tokens.verify(token, Utc::now()).map_err(|e| {
            warn!(error = %e, "bearer token rejected");
            LedgerError::Unauthenticated
        })?;

        if self.store.read().user(&user_id).is_none() {
            warn!(user_id = %user_id, "bearer token names an unknown user");
            return Err(LedgerError::Unauthenticated);
        }
        Ok(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registrar() -> IdentityRegistrar {
        let tokens = Arc::new(TokenIssuer::new(b"test-secret", chrono::Duration::hours(1)));
        IdentityRegistrar::new(Arc::new(EntityStore::new()), tokens)
    }

    #[test]
    fn duplicate_email_keeps_the_first_registration() {
        let registrar = registrar();
        let first = registrar.register("dup@example.com", "pw-one", "First").unwrap();

        assert_eq!(
            registrar.register("dup@example.com", "pw-two", "Second").unwrap_err(),
            LedgerError::DuplicateEmail
        );

        let resolved = registrar.lookup_by_email("dup@example.com").unwrap();
        assert_eq!(resolved.id(), first.id());
        assert_eq!(resolved.name(), "First");
        assert_eq!(registrar.store.read().user_count(), 1);
    }

    #[test]
    fn email_matching_is_case_sensitive() {
        let registrar = registrar();
        registrar.register("Case@example.com", "pw", "Upper").unwrap();
        registrar.register("case@example.com", "pw", "Lower").unwrap();
        assert_eq!(
            registrar.lookup_by_email("CASE@example.com").unwrap_err(),
            LedgerError::NotFound
        );
    }

    #[test]
    fn lookups_fail_with_not_found() {
        let registrar = registrar();
        assert_eq!(
            registrar.lookup_by_id(UserId::new()).unwrap_err(),
            LedgerError::NotFound
        );
        assert_eq!(
            registrar.lookup_by_email("nobody@example.com").unwrap_err(),
            LedgerError::NotFound
        );
    }

    #[test]
    fn stored_user_never_holds_the_raw_password() {
        let registrar = registrar();
        let user = registrar.register("h@example.com", "plain-text", "H").unwrap();
        let stored = registrar.lookup_by_id(*user.id()).unwrap();
        assert_ne!(stored.password_hash(), "plain-text");
        assert!(verify_password("plain-text", stored.password_hash()));
    }

    #[test]
    fn login_round_trips_through_a_bearer_token() {
        let registrar = registrar();
        let user = registrar.register("login@example.com", "hunter2", "L").unwrap();

        let session = registrar.authenticate("login@example.com", "hunter2").unwrap();
        assert_eq!(session.user.id(), user.id());
        assert_eq!(registrar.resolve_caller(&session.token), Ok(*user.id()));
    }

    #[test]
    fn bad_credentials_are_indistinguishable() {
        let registrar = registrar();
        registrar.register("who@example.com", "right", "W").unwrap();

        assert_eq!(
            registrar.authenticate("who@example.com", "wrong").unwrap_err(),
            LedgerError::Unauthenticated
        );
        assert_eq!(
            registrar.authenticate("nobody@example.com", "right").unwrap_err(),
            LedgerError::Unauthenticated
        );
    }

    #[test]
    fn inactive_user_cannot_log_in() {
        let registrar = registrar();
        let user = registrar.register("off@example.com", "pw", "Off").unwrap();
        registrar.set_user_active(*user.id(), false).unwrap();

        assert_eq!(
            registrar.authenticate("off@example.com", "pw").unwrap_err(),
            LedgerError::UserInactive
        );
    }

    #[test]
    fn foreign_or_garbage_tokens_do_not_resolve() {
        let registrar = registrar();
        assert_eq!(
            registrar.resolve_caller("garbage").unwrap_err(),
            LedgerError::Unauthenticated
        );

        // Validly signed, but for a user this store has never seen.
        let stray = TokenIssuer::new(b"test-secret", chrono::Duration::hours(1))
            .issue(UserId::new(), Utc::now())
            .unwrap();
        assert_eq!(
            registrar.resolve_caller(&stray).unwrap_err(),
            LedgerError::Unauthenticated
        );
    }

    #[test]
    fn empty_credentials_are_rejected() {
        let registrar = registrar();
        assert!(matches!(
            registrar.register("", "pw", "X"),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            registrar.register("x@example.com", "", "X"),
            Err(LedgerError::Validation(_))
        ));
    }
}
