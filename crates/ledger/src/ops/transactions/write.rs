use chrono::Utc;

use crate::{LedgerError, RemoteStore, ResultLedger, Session, TransactionDraft, ops::Ledger};

impl<S: RemoteStore> Ledger<S> {
    /// Creates or edits a transaction and returns its id.
    ///
    /// With `is_edit` and a draft id, the draft's fields are merged into the
    /// stored document: fields the draft does not carry are kept. Otherwise a
    /// new document is created. Validation happens before any I/O.
    pub async fn upsert(
        &self,
        session: &Session,
        draft: &TransactionDraft,
        is_edit: bool,
    ) -> ResultLedger<String> {
        let record = draft.validate(Utc::now())?;
        let fields = record.to_fields()?;
        let path = session.transactions_path();

        let edit_id = draft
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| is_edit && !id.is_empty());

        match edit_id {
            Some(id) => {
                self.store()
                    .merge(&path, id, fields)
                    .await
                    .map_err(LedgerError::Persistence)?;
                tracing::debug!("updated transaction {id} in {path}");
                Ok(id.to_string())
            }
            None => {
                let id = self
                    .store()
                    .create(&path, fields)
                    .await
                    .map_err(LedgerError::Persistence)?;
                tracing::debug!("created transaction {id} in {path}");
                Ok(id)
            }
        }
    }
}
