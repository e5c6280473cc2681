//! In-process [`RemoteStore`].
//!
//! Keeps every collection in memory and notifies subscribers on each write.
//! Used by tests and by the CLI when the database is configured as `memory`.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::sync::{Mutex, broadcast};
use uuid::Uuid;

use super::{CollectionPath, Document, Fields, OrderBy, RemoteStore, StoreResult};

const CHANGES_CAPACITY: usize = 64;

type Collections = HashMap<CollectionPath, BTreeMap<String, Fields>>;

#[derive(Clone, Debug)]
pub struct MemoryStore {
    collections: Arc<Mutex<Collections>>,
    changes: broadcast::Sender<CollectionPath>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGES_CAPACITY);
        Self {
            collections: Arc::new(Mutex::new(HashMap::new())),
            changes,
        }
    }

    fn notify(&self, path: &CollectionPath) {
        // No receivers is fine: nobody is watching.
        let _ = self.changes.send(path.clone());
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn list(&self, path: &CollectionPath, order_by: &OrderBy) -> StoreResult<Vec<Document>> {
        let guard = self.collections.lock().await;
        let mut documents: Vec<Document> = guard
            .get(path)
            .map(|collection| {
                collection
                    .iter()
                    .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default();
        order_by.sort(&mut documents);
        Ok(documents)
    }

    async fn create(&self, path: &CollectionPath, fields: Fields) -> StoreResult<String> {
        let id = Uuid::new_v4().simple().to_string();
        {
            let mut guard = self.collections.lock().await;
            guard
                .entry(path.clone())
                .or_default()
                .insert(id.clone(), fields);
        }
        self.notify(path);
        Ok(id)
    }

    async fn set(&self, path: &CollectionPath, id: &str, fields: Fields) -> StoreResult<()> {
        {
            let mut guard = self.collections.lock().await;
            guard
                .entry(path.clone())
                .or_default()
                .insert(id.to_string(), fields);
        }
        self.notify(path);
        Ok(())
    }

    async fn merge(&self, path: &CollectionPath, id: &str, fields: Fields) -> StoreResult<()> {
        {
            let mut guard = self.collections.lock().await;
            let stored = guard
                .entry(path.clone())
                .or_default()
                .entry(id.to_string())
                .or_default();
            stored.extend(fields);
        }
        self.notify(path);
        Ok(())
    }

    async fn read(&self, path: &CollectionPath, id: &str) -> StoreResult<Option<Document>> {
        let guard = self.collections.lock().await;
        Ok(guard
            .get(path)
            .and_then(|collection| collection.get(id))
            .map(|fields| Document::new(id, fields.clone())))
    }

    async fn delete(&self, path: &CollectionPath, id: &str) -> StoreResult<()> {
        let removed = {
            let mut guard = self.collections.lock().await;
            guard
                .get_mut(path)
                .and_then(|collection| collection.remove(id))
                .is_some()
        };
        if removed {
            self.notify(path);
        }
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<CollectionPath> {
        self.changes.subscribe()
    }
}
