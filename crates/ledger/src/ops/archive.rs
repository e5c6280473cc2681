use crate::{
    DELETED_AT_FIELD, DeletedTransaction, Document, LedgerError, OrderBy, RemoteStore,
    ResultLedger, Session, Subscription,
    ops::{Ledger, feed_snapshots},
};

/// Decodes an archive snapshot, most recently deleted first.
///
/// Documents that do not decode are logged and left out.
pub fn decode_archive(documents: Vec<Document>) -> Vec<DeletedTransaction> {
    let mut deleted: Vec<DeletedTransaction> = documents
        .into_iter()
        .filter_map(|document| {
            let id = document.id.clone();
            DeletedTransaction::from_document(document)
                .inspect_err(|err| tracing::warn!("skipping malformed archive entry {id}: {err}"))
                .ok()
        })
        .collect();
    deleted.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at));
    deleted
}

fn recently_deleted_first() -> OrderBy {
    OrderBy::descending(DELETED_AT_FIELD)
}

impl<S: RemoteStore> Ledger<S> {
    /// Streams the user's archive, most recently deleted first.
    pub fn subscribe_archive<F>(&self, session: &Session, observer: F) -> Subscription
    where
        F: FnMut(ResultLedger<Vec<DeletedTransaction>>) + Send + 'static,
    {
        let path = session.archive_path();
        tracing::debug!("subscribing to {path}");
        let stream = self.store().subscribe(path, recently_deleted_first());
        feed_snapshots(stream, observer, decode_archive)
    }

    /// One-shot read of the archive.
    pub async fn archive_snapshot(&self, session: &Session) -> ResultLedger<Vec<DeletedTransaction>> {
        let documents = self
            .store()
            .list(&session.archive_path(), &recently_deleted_first())
            .await
            .map_err(LedgerError::Persistence)?;
        Ok(decode_archive(documents))
    }
}
