//! Per-user income/expense ledger kept in sync with a document store.
//!
//! [`Ledger`] is the entry point. It streams a user's transactions together
//! with a derived [`Summary`], creates and edits transactions from a
//! [`TransactionDraft`], and soft deletes them into an archive collection.
//! Storage goes through the [`RemoteStore`] trait ([`MemoryStore`],
//! [`SqlStore`]); identity goes through [`AuthProvider`] and [`Session`].

pub use auth::{
    Accounts, AccountsBuilder, AuthProvider, AuthState, Identity, MIN_PASSWORD_LEN, Session,
};
pub use commands::TransactionDraft;
pub use error::{AuthError, LedgerError, StoreError};
pub use money::{Amount, MAX_AMOUNT};
pub use ops::{Ledger, LedgerView, decode_archive};
pub use store::{
    CollectionPath, Direction, Document, Fields, MemoryStore, OrderBy, RemoteStore,
    SnapshotStream, SqlStore, SqlStoreBuilder, StoreResult,
};
pub use subscription::Subscription;
pub use summary::Summary;
pub use transactions::{
    DATE_FIELD, DELETED_AT_FIELD, DeletedTransaction, Transaction, TransactionKind,
    TransactionRecord,
};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

mod auth;
mod commands;
mod documents;
mod error;
mod money;
mod ops;
mod revisions;
mod store;
mod subscription;
mod summary;
mod transactions;
mod users;
mod util;

pub type ResultLedger<T> = Result<T, LedgerError>;
