use chrono::Utc;
use serde_json::Value;

use crate::{DELETED_AT_FIELD, LedgerError, RemoteStore, ResultLedger, Session, ops::Ledger};

impl<S: RemoteStore> Ledger<S> {
    /// Moves a transaction from the live collection into the archive.
    ///
    /// The archive copy is written first and keeps the same id and every
    /// stored field, plus `deletedAt`. If the live document cannot be
    /// removed afterwards the transaction is in both collections and
    /// [`LedgerError::PartialFailure`] is returned; retrying is safe.
    pub async fn soft_delete(&self, session: &Session, transaction_id: &str) -> ResultLedger<()> {
        let live = session.transactions_path();
        let archive = session.archive_path();

        let document = self
            .store()
            .read(&live, transaction_id)
            .await
            .map_err(LedgerError::Persistence)?
            .ok_or_else(|| LedgerError::NotFound(transaction_id.to_string()))?;

        let id = document.id;
        let mut fields = document.fields;
        fields.insert(
            DELETED_AT_FIELD.to_string(),
            Value::from(Utc::now().timestamp_millis()),
        );

        self.store()
            .set(&archive, &id, fields)
            .await
            .map_err(LedgerError::Persistence)?;

        if let Err(source) = self.store().delete(&live, &id).await {
            tracing::warn!("transaction {id} archived but still live: {source}");
            return Err(LedgerError::PartialFailure { id, source });
        }

        tracing::debug!("moved transaction {id} from {live} to {archive}");
        Ok(())
    }
}
