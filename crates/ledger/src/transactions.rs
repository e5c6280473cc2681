//! Transaction primitives.
//!
//! A `Transaction` is one income or expense entry of a user's live
//! collection; a `DeletedTransaction` is its archived copy after a soft
//! delete. Both are decoded from store documents (see [`TransactionRecord`]
//! for the field layout).

use chrono::{DateTime, Utc, serde::ts_milliseconds};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Amount, Document, Fields, LedgerError, ResultLedger};

/// Field the live collection is ordered by.
pub const DATE_FIELD: &str = "date";
/// Field the archive is ordered by.
pub const DELETED_AT_FIELD: &str = "deletedAt";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionKind {
    Income,
    Expense,
    /// A type written by another client that this ledger does not know.
    /// Counted as expense by [`Summary`](crate::Summary).
    Unrecognized(String),
}

impl TransactionKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Unrecognized(other) => other,
        }
    }

    pub fn is_income(&self) -> bool {
        matches!(self, Self::Income)
    }
}

/// Strict parsing, used for user input.
impl TryFrom<&str> for TransactionKind {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(LedgerError::Validation(format!(
                "invalid transaction type: {other} (expected income or expense)"
            ))),
        }
    }
}

/// Lenient decoding, used for stored documents.
impl From<String> for TransactionKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "income" => Self::Income,
            "expense" => Self::Expense,
            _ => Self::Unrecognized(value),
        }
    }
}

impl From<TransactionKind> for String {
    fn from(kind: TransactionKind) -> Self {
        match kind {
            TransactionKind::Unrecognized(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

/// Stored field layout of a transaction document.
///
/// `date` is kept as integer milliseconds so that stores can order it
/// numerically.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub category: String,
    pub amount: Amount,
    #[serde(with = "ts_milliseconds")]
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub receipt: Option<String>,
}

impl TransactionRecord {
    /// Encodes the record as document fields.
    pub fn to_fields(&self) -> ResultLedger<Fields> {
        match serde_json::to_value(self) {
            Ok(Value::Object(fields)) => Ok(fields),
            Ok(_) => Err(LedgerError::Validation(
                "transaction did not encode to an object".to_string(),
            )),
            Err(err) => Err(LedgerError::Validation(err.to_string())),
        }
    }
}

#[derive(Deserialize)]
struct ArchivedRecord {
    #[serde(flatten)]
    record: TransactionRecord,
    #[serde(rename = "deletedAt", with = "ts_milliseconds")]
    deleted_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub kind: TransactionKind,
    pub category: String,
    pub amount: Amount,
    pub date: DateTime<Utc>,
    pub description: String,
    pub receipt: Option<String>,
}

impl Transaction {
    fn from_record(id: String, record: TransactionRecord) -> Self {
        Self {
            id,
            kind: record.kind,
            category: record.category,
            amount: record.amount,
            date: record.date,
            description: record.description,
            receipt: record.receipt,
        }
    }

    /// Decodes a live collection document.
    pub fn from_document(document: Document) -> Result<Self, serde_json::Error> {
        let record: TransactionRecord = serde_json::from_value(Value::Object(document.fields))?;
        Ok(Self::from_record(document.id, record))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedTransaction {
    pub transaction: Transaction,
    pub deleted_at: DateTime<Utc>,
}

impl DeletedTransaction {
    /// Decodes an archive document.
    pub fn from_document(document: Document) -> Result<Self, serde_json::Error> {
        let archived: ArchivedRecord = serde_json::from_value(Value::Object(document.fields))?;
        Ok(Self {
            transaction: Transaction::from_record(document.id, archived.record),
            deleted_at: archived.deleted_at,
        })
    }

    pub fn id(&self) -> &str {
        &self.transaction.id
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(fields) => fields,
            _ => Fields::new(),
        }
    }

    #[test]
    fn kind_parsing_is_strict_for_input() {
        assert_eq!(
            TransactionKind::try_from(" Income ").unwrap(),
            TransactionKind::Income
        );
        assert!(matches!(
            TransactionKind::try_from("transfer"),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn kind_decoding_is_lenient_for_documents() {
        assert_eq!(
            TransactionKind::from("refund".to_string()),
            TransactionKind::Unrecognized("refund".to_string())
        );
        assert_eq!(String::from(TransactionKind::Expense), "expense");
    }

    #[test]
    fn decodes_document_with_defaults() {
        let doc = Document::new(
            "abc",
            fields(json!({
                "type": "expense",
                "category": "food",
                "amount": 12.5,
                "date": 1_700_000_000_000_i64,
            })),
        );

        let tx = Transaction::from_document(doc).unwrap();
        assert_eq!(tx.id, "abc");
        assert_eq!(tx.kind, TransactionKind::Expense);
        assert_eq!(tx.amount, "12.5".parse().unwrap());
        assert_eq!(tx.date, Utc.timestamp_millis_opt(1_700_000_000_000).unwrap());
        assert_eq!(tx.description, "");
        assert_eq!(tx.receipt, None);
    }

    #[test]
    fn rejects_document_without_date() {
        let doc = Document::new(
            "abc",
            fields(json!({ "type": "expense", "category": "food", "amount": "1" })),
        );
        assert!(Transaction::from_document(doc).is_err());
    }

    #[test]
    fn record_fields_round_trip_through_archive() {
        let record = TransactionRecord {
            kind: TransactionKind::Income,
            category: "salary".to_string(),
            amount: Amount::from_major(1000),
            date: Utc.timestamp_millis_opt(1_000).unwrap(),
            description: "January".to_string(),
            receipt: None,
        };
        let mut fields = record.to_fields().unwrap();
        assert_eq!(fields["date"], json!(1_000));
        assert_eq!(fields["type"], json!("income"));

        fields.insert(DELETED_AT_FIELD.to_string(), json!(2_000));
        let deleted = DeletedTransaction::from_document(Document::new("t1", fields)).unwrap();
        assert_eq!(deleted.id(), "t1");
        assert_eq!(deleted.transaction.description, "January");
        assert_eq!(deleted.deleted_at, Utc.timestamp_millis_opt(2_000).unwrap());
    }
}
