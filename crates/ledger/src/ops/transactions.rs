use serde::Serialize;

use crate::{DATE_FIELD, Document, OrderBy, Summary, Transaction};

mod delete;
mod list;
mod write;

/// The live transactions of a user, newest first, with their summary.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LedgerView {
    pub transactions: Vec<Transaction>,
    pub summary: Summary,
}

impl LedgerView {
    /// Decodes a snapshot of the live collection.
    ///
    /// Documents that do not decode are logged and left out; they never break
    /// the view. The summary always covers exactly the listed transactions.
    pub fn from_documents(documents: Vec<Document>) -> Self {
        let mut transactions: Vec<Transaction> = documents
            .into_iter()
            .filter_map(|document| {
                let id = document.id.clone();
                Transaction::from_document(document)
                    .inspect_err(|err| tracing::warn!("skipping malformed transaction {id}: {err}"))
                    .ok()
            })
            .collect();
        // Stable, so equal dates keep the store's order.
        transactions.sort_by(|a, b| b.date.cmp(&a.date));

        let summary = Summary::derive(&transactions);
        Self {
            transactions,
            summary,
        }
    }
}

fn newest_first() -> OrderBy {
    OrderBy::descending(DATE_FIELD)
}
