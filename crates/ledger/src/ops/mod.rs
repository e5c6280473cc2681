//! Ledger Synchronizer operations.
//!
//! [`Ledger`] keeps one user's live transactions and their archive
//! consistent through a [`RemoteStore`]. Reads are live subscriptions or
//! one-shot snapshots; writes are `upsert` and `soft_delete`.

use crate::{Document, LedgerError, ResultLedger, SnapshotStream, Subscription};

pub use archive::decode_archive;
pub use transactions::LedgerView;

mod archive;
mod transactions;

#[derive(Clone, Debug)]
pub struct Ledger<S> {
    store: S,
}

impl<S> Ledger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The store this ledger reads and writes through.
    pub fn store(&self) -> &S {
        &self.store
    }
}

/// Feeds decoded snapshots of `stream` to `observer`.
///
/// A stream error is delivered once as [`LedgerError::Sync`] and ends the
/// subscription; it is never retried.
fn feed_snapshots<T, F>(
    mut stream: SnapshotStream,
    observer: F,
    decode: fn(Vec<Document>) -> T,
) -> Subscription
where
    T: 'static,
    F: FnMut(ResultLedger<T>) + Send + 'static,
{
    Subscription::spawn(observer, move |feed| async move {
        while let Some(snapshot) = stream.next().await {
            match snapshot {
                Ok(documents) => {
                    if !feed.deliver(Ok(decode(documents))) {
                        return;
                    }
                }
                Err(err) => {
                    tracing::error!("snapshot stream failed: {err}");
                    feed.finish(Err(LedgerError::Sync(err)));
                    return;
                }
            }
        }
    })
}
