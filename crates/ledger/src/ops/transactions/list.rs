use crate::{
    LedgerError, RemoteStore, ResultLedger, Session, StoreError, Subscription, Transaction,
    ops::{Ledger, feed_snapshots},
};

use super::{LedgerView, newest_first};

impl<S: RemoteStore> Ledger<S> {
    /// Streams the user's live transactions and their summary.
    ///
    /// `observer` gets the current view right away and a fresh one after
    /// every change. A store failure is delivered once as
    /// [`LedgerError::Sync`] and ends the subscription.
    pub fn subscribe<F>(&self, session: &Session, observer: F) -> Subscription
    where
        F: FnMut(ResultLedger<LedgerView>) + Send + 'static,
    {
        let path = session.transactions_path();
        tracing::debug!("subscribing to {path}");
        let stream = self.store().subscribe(path, newest_first());
        feed_snapshots(stream, observer, LedgerView::from_documents)
    }

    /// One-shot read of the live transactions.
    pub async fn snapshot(&self, session: &Session) -> ResultLedger<LedgerView> {
        let documents = self
            .store()
            .list(&session.transactions_path(), &newest_first())
            .await
            .map_err(LedgerError::Persistence)?;
        Ok(LedgerView::from_documents(documents))
    }

    /// Loads one live transaction, e.g. to prefill an edit form.
    pub async fn transaction(&self, session: &Session, id: &str) -> ResultLedger<Transaction> {
        let document = self
            .store()
            .read(&session.transactions_path(), id)
            .await
            .map_err(LedgerError::Persistence)?
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))?;
        Transaction::from_document(document)
            .map_err(|err| LedgerError::Persistence(StoreError::Serialization(err)))
    }
}
