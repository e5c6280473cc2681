//! The Remote Store seam.
//!
//! The ledger never talks to a concrete backend: it only needs a document
//! store that can list a collection in order, write single documents and
//! announce which collection changed. Everything else (live snapshots,
//! cancellation) is built on top of those primitives here.

use std::{cmp::Ordering, fmt};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};

use crate::StoreError;

pub use memory::MemoryStore;
pub use sql::{SqlStore, SqlStoreBuilder};

mod memory;
mod sql;

pub type StoreResult<T> = Result<T, StoreError>;

/// Field map of a document.
pub type Fields = Map<String, Value>;

/// Slash separated path of a collection, e.g. `users/{uid}/transactions`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Live transactions of a user.
    pub fn transactions(uid: &str) -> Self {
        Self(format!("users/{uid}/transactions"))
    }

    /// Soft-deleted transactions of a user.
    pub fn deleted_transactions(uid: &str) -> Self {
        Self(format!("users/{uid}/deletedTransactions"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored document: its id inside the collection and its fields.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Ordering requested for a collection listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Ascending,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Descending,
        }
    }

    /// Compares two documents on the order field.
    ///
    /// Documents missing the field always sort last, regardless of direction;
    /// ties are broken by id so listings are deterministic.
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let ordering = match (a.fields.get(&self.field), b.fields.get(&self.field)) {
            (Some(x), Some(y)) => {
                let ordering = compare_values(x, y);
                match self.direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        ordering.then_with(|| a.id.cmp(&b.id))
    }

    /// Sorts documents in place.
    pub fn sort(&self, documents: &mut [Document]) {
        documents.sort_by(|a, b| self.compare(a, b));
    }
}

fn value_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => {
                let x = x.as_f64().unwrap_or(f64::NAN);
                let y = y.as_f64().unwrap_or(f64::NAN);
                x.total_cmp(&y)
            }
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => value_rank(a).cmp(&value_rank(b)),
    }
}

/// A document database with change notification.
///
/// Implementations are cheap handles (`Clone`) over shared state, like a
/// database connection pool.
#[async_trait]
pub trait RemoteStore: Clone + Send + Sync + 'static {
    /// Lists every document of a collection in the requested order.
    async fn list(&self, path: &CollectionPath, order_by: &OrderBy) -> StoreResult<Vec<Document>>;

    /// Creates a document with a store-assigned id and returns the id.
    async fn create(&self, path: &CollectionPath, fields: Fields) -> StoreResult<String>;

    /// Writes a document at `id`, replacing it entirely if present.
    async fn set(&self, path: &CollectionPath, id: &str, fields: Fields) -> StoreResult<()>;

    /// Overwrites the given fields of the document at `id`, leaving other
    /// fields untouched. A missing document is created.
    async fn merge(&self, path: &CollectionPath, id: &str, fields: Fields) -> StoreResult<()>;

    /// Reads one document.
    async fn read(&self, path: &CollectionPath, id: &str) -> StoreResult<Option<Document>>;

    /// Deletes one document. Deleting a missing document is not an error.
    async fn delete(&self, path: &CollectionPath, id: &str) -> StoreResult<()>;

    /// Receiver of the paths of collections that changed.
    fn changes(&self) -> broadcast::Receiver<CollectionPath>;

    /// Opens a live, ordered view of a collection.
    ///
    /// The stream yields the full ordered collection once immediately and
    /// again after every change to `path`. The first error is yielded and
    /// ends the stream. Must be called from within a tokio runtime.
    fn subscribe(&self, path: CollectionPath, order_by: OrderBy) -> SnapshotStream {
        let store = self.clone();
        let mut changes = self.changes();
        let (sender, receiver) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            loop {
                let snapshot = store.list(&path, &order_by).await;
                let failed = snapshot.is_err();
                if sender.send(snapshot).is_err() || failed {
                    return;
                }

                loop {
                    match changes.recv().await {
                        Ok(changed) if changed == path => break,
                        Ok(_) => continue,
                        // Missed notifications: a fresh listing covers them.
                        Err(broadcast::error::RecvError::Lagged(_)) => break,
                        Err(broadcast::error::RecvError::Closed) => return,
                    }
                }
            }
        });

        SnapshotStream { receiver, task }
    }
}

/// Live snapshots of one collection. Dropping the stream stops its watcher.
#[derive(Debug)]
pub struct SnapshotStream {
    receiver: mpsc::UnboundedReceiver<StoreResult<Vec<Document>>>,
    task: JoinHandle<()>,
}

impl SnapshotStream {
    /// Waits for the next snapshot. `None` once the stream has ended.
    pub async fn next(&mut self) -> Option<StoreResult<Vec<Document>>> {
        self.receiver.recv().await
    }
}

impl Drop for SnapshotStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}
