//! Authentication seam.
//!
//! The ledger only needs to know *who* is signed in. [`AuthProvider`] is that
//! contract; [`AuthState`] is the in-process implementation every provider in
//! this crate delegates to, and [`Session`] is the explicit identity passed
//! into each ledger call.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::{CollectionPath, LedgerError, ResultLedger, Subscription};

pub use accounts::{Accounts, AccountsBuilder, MIN_PASSWORD_LEN};

mod accounts;

/// A signed-in user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}

pub trait AuthProvider: Send + Sync {
    /// The user currently signed in, if any.
    fn current_user(&self) -> Option<Identity>;

    /// Calls `callback` with the current user right away and again after
    /// every sign-in, sign-out or profile change.
    fn on_auth_state_changed<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(Option<Identity>) + Send + 'static;
}

/// Shared sign-in state.
#[derive(Clone, Debug)]
pub struct AuthState {
    current: Arc<watch::Sender<Option<Identity>>>,
}

impl Default for AuthState {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthState {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            current: Arc::new(current),
        }
    }

    pub fn sign_in(&self, identity: Identity) {
        tracing::debug!("user {} signed in", identity.uid);
        self.current.send_replace(Some(identity));
    }

    pub fn sign_out(&self) {
        if let Some(previous) = self.current.send_replace(None) {
            tracing::debug!("user {} signed out", previous.uid);
        }
    }
}

impl AuthProvider for AuthState {
    fn current_user(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }

    fn on_auth_state_changed<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(Option<Identity>) + Send + 'static,
    {
        let mut receiver = self.current.subscribe();
        Subscription::spawn(callback, |feed| async move {
            loop {
                let current = receiver.borrow_and_update().clone();
                if !feed.deliver(current) {
                    return;
                }
                if receiver.changed().await.is_err() {
                    return;
                }
            }
        })
    }
}

/// The authenticated user a ledger call acts for.
///
/// Every collection a session touches lives under `users/{uid}/`, so a
/// session can never reach another user's data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    identity: Identity,
}

impl Session {
    pub fn new(identity: Identity) -> ResultLedger<Self> {
        if identity.uid.trim().is_empty() {
            return Err(LedgerError::Unauthenticated);
        }
        Ok(Self { identity })
    }

    /// Session of whoever is signed in on `auth`.
    pub fn require(auth: &impl AuthProvider) -> ResultLedger<Self> {
        auth.current_user()
            .ok_or(LedgerError::Unauthenticated)
            .and_then(Self::new)
    }

    pub fn uid(&self) -> &str {
        &self.identity.uid
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub(crate) fn transactions_path(&self) -> CollectionPath {
        CollectionPath::transactions(self.uid())
    }

    pub(crate) fn archive_path(&self) -> CollectionPath {
        CollectionPath::deleted_transactions(self.uid())
    }
}
