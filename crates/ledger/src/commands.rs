//! Command structs for ledger operations.
//!
//! A [`TransactionDraft`] is the raw, unvalidated content of the
//! add/edit form: every field is kept as the user typed it so a failed save
//! can be retried with the same input.

use chrono::{DateTime, Utc};

use crate::{
    Amount, LedgerError, ResultLedger, Transaction, TransactionKind, TransactionRecord,
    util::{normalize_optional_text, normalize_required_text},
};

/// Candidate transaction for [`Ledger::upsert`](crate::Ledger::upsert).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionDraft {
    /// Id of the stored transaction when editing.
    pub id: Option<String>,
    pub kind: String,
    pub category: String,
    pub amount: String,
    /// Defaults to now.
    pub date: Option<DateTime<Utc>>,
    /// Defaults to empty.
    pub description: Option<String>,
    pub receipt: Option<String>,
}

impl TransactionDraft {
    #[must_use]
    pub fn new(
        kind: impl Into<String>,
        category: impl Into<String>,
        amount: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            category: category.into(),
            amount: amount.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn receipt(mut self, receipt: impl Into<String>) -> Self {
        self.receipt = Some(receipt.into());
        self
    }

    /// Checks the draft and applies defaults. Performs no I/O.
    pub(crate) fn validate(&self, now: DateTime<Utc>) -> ResultLedger<TransactionRecord> {
        let kind = normalize_required_text(&self.kind);
        let category = normalize_required_text(&self.category);
        let amount = normalize_required_text(&self.amount);

        let (kind, category, amount) = match (kind, category, amount) {
            (Some(kind), Some(category), Some(amount)) => (kind, category, amount),
            (kind, category, amount) => {
                let missing: Vec<&str> = [
                    ("type", kind.is_none()),
                    ("category", category.is_none()),
                    ("amount", amount.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, missing)| missing.then_some(name))
                .collect();
                return Err(LedgerError::Validation(format!(
                    "missing required fields: {}",
                    missing.join(", ")
                )));
            }
        };

        Ok(TransactionRecord {
            kind: TransactionKind::try_from(kind.as_str())?,
            category,
            amount: amount.parse::<Amount>()?,
            date: self.date.unwrap_or(now),
            description: normalize_optional_text(self.description.as_deref()).unwrap_or_default(),
            receipt: normalize_optional_text(self.receipt.as_deref()),
        })
    }
}

/// Prefills an edit form from a stored transaction.
impl From<&Transaction> for TransactionDraft {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: Some(tx.id.clone()),
            kind: tx.kind.as_str().to_string(),
            category: tx.category.clone(),
            amount: tx.amount.value().to_string(),
            date: Some(tx.date),
            description: Some(tx.description.clone()),
            receipt: tx.receipt.clone(),
        }
    }
}
