//! The module contains the errors the ledger can return.
//!
//! The errors are:
//!
//! - [`Unauthenticated`] returned when no user is signed in.
//! - [`Validation`] returned when a draft is malformed, before any I/O.
//! - [`NotFound`] returned when an operation targets a missing record.
//! - [`Persistence`] returned when a write or read against the store fails.
//! - [`Sync`] delivered to an observer when its snapshot stream fails.
//! - [`PartialFailure`] returned when a soft delete archived the record but
//!   could not remove it from the live collection.
//!
//!  [`Unauthenticated`]: LedgerError::Unauthenticated
//!  [`Validation`]: LedgerError::Validation
//!  [`NotFound`]: LedgerError::NotFound
//!  [`Persistence`]: LedgerError::Persistence
//!  [`Sync`]: LedgerError::Sync
//!  [`PartialFailure`]: LedgerError::PartialFailure
use sea_orm::DbErr;
use thiserror::Error;

/// Errors raised by a [`RemoteStore`](crate::RemoteStore) implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("malformed document: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl PartialEq for StoreError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            (Self::Serialization(a), Self::Serialization(b)) => a.to_string() == b.to_string(),
            (Self::Unavailable(a), Self::Unavailable(b)) => a == b,
            _ => false,
        }
    }
}

/// Ledger custom errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("You must be logged in to do this.")]
    Unauthenticated,
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error("Could not save changes: {0}")]
    Persistence(#[source] StoreError),
    #[error("Lost connection to the transaction feed: {0}")]
    Sync(#[source] StoreError),
    #[error("Transaction \"{id}\" was archived but is still listed: {source}")]
    PartialFailure {
        id: String,
        #[source]
        source: StoreError,
    },
}

impl PartialEq for LedgerError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Unauthenticated, Self::Unauthenticated) => true,
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::Persistence(a), Self::Persistence(b)) => a == b,
            (Self::Sync(a), Self::Sync(b)) => a == b,
            (
                Self::PartialFailure {
                    id: a,
                    source: source_a,
                },
                Self::PartialFailure {
                    id: b,
                    source: source_b,
                },
            ) => a == b && source_a == source_b,
            _ => false,
        }
    }
}

/// Errors raised by the account directory.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),
    #[error("Password should be at least {0} characters")]
    WeakPassword(usize),
    #[error("\"{0}\" is already registered!")]
    EmailInUse(String),
    #[error("Wrong email or password")]
    InvalidCredentials,
    #[error("You must be logged in to do this.")]
    Unauthenticated,
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),
    #[error("Could not hash password: {0}")]
    Hashing(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_distinguishable() {
        let errors = [
            LedgerError::Unauthenticated,
            LedgerError::Validation("amount is required".to_string()),
            LedgerError::NotFound("abc".to_string()),
            LedgerError::Persistence(StoreError::Unavailable("offline".to_string())),
            LedgerError::Sync(StoreError::Unavailable("offline".to_string())),
            LedgerError::PartialFailure {
                id: "abc".to_string(),
                source: StoreError::Unavailable("offline".to_string()),
            },
        ];
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        for (i, a) in messages.iter().enumerate() {
            assert!(!a.is_empty());
            for b in &messages[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn partial_failure_compares_id_and_source() {
        let a = LedgerError::PartialFailure {
            id: "x".to_string(),
            source: StoreError::Unavailable("down".to_string()),
        };
        let b = LedgerError::PartialFailure {
            id: "y".to_string(),
            source: StoreError::Unavailable("down".to_string()),
        };
        assert_ne!(a, b);
    }
}
