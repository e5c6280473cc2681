//! [`RemoteStore`] on top of sea-orm.
//!
//! Documents live in the `documents` table as JSON text. Each write runs in a
//! DB transaction that also bumps the collection revision, then notifies
//! in-process subscribers. With a poll interval, revisions bumped by other
//! processes are noticed as well.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveValue, ConnectionTrait, DatabaseConnection, DatabaseTransaction, QueryFilter,
    TransactionTrait, prelude::*,
};
use tokio::{sync::broadcast, task::JoinHandle};
use uuid::Uuid;

use crate::{StoreError, documents, revisions, util::lock, with_tx};

use super::{CollectionPath, Document, Fields, OrderBy, RemoteStore, StoreResult};

const CHANGES_CAPACITY: usize = 256;

type Revisions = Arc<Mutex<HashMap<String, i64>>>;

#[derive(Clone, Debug)]
pub struct SqlStore {
    database: DatabaseConnection,
    changes: broadcast::Sender<CollectionPath>,
    seen: Revisions,
    _poller: Option<Arc<Poller>>,
}

#[derive(Debug)]
struct Poller(JoinHandle<()>);

impl Drop for Poller {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl SqlStore {
    /// Return a builder for `SqlStore`. Help to build the struct.
    pub fn builder() -> SqlStoreBuilder {
        SqlStoreBuilder::default()
    }

    /// Records a committed revision and wakes subscribers of `path`.
    fn committed(&self, path: &CollectionPath, revision: i64) {
        lock(&self.seen).insert(path.to_string(), revision);
        let _ = self.changes.send(path.clone());
    }

    async fn find(
        &self,
        db: &impl ConnectionTrait,
        path: &CollectionPath,
        id: &str,
    ) -> StoreResult<Option<documents::Model>> {
        Ok(
            documents::Entity::find_by_id((path.to_string(), id.to_string()))
                .one(db)
                .await?,
        )
    }

    async fn upsert_row(
        &self,
        db_tx: &DatabaseTransaction,
        path: &CollectionPath,
        id: &str,
        fields: &Fields,
    ) -> StoreResult<()> {
        let exists = self.find(db_tx, path, id).await?.is_some();
        let row = documents::ActiveModel {
            path: ActiveValue::Set(path.to_string()),
            id: ActiveValue::Set(id.to_string()),
            fields: ActiveValue::Set(serde_json::to_string(fields)?),
            updated_at: ActiveValue::Set(Utc::now()),
        };
        if exists {
            row.update(db_tx).await?;
        } else {
            row.insert(db_tx).await?;
        }
        Ok(())
    }
}

fn parse_document(model: documents::Model) -> StoreResult<Document> {
    let fields: Fields = serde_json::from_str(&model.fields)?;
    Ok(Document::new(model.id, fields))
}

async fn bump_revision(db_tx: &DatabaseTransaction, path: &CollectionPath) -> StoreResult<i64> {
    let current = revisions::Entity::find_by_id(path.to_string())
        .one(db_tx)
        .await?;
    match current {
        Some(model) => {
            let next = model.revision + 1;
            revisions::ActiveModel {
                path: ActiveValue::Set(model.path),
                revision: ActiveValue::Set(next),
            }
            .update(db_tx)
            .await?;
            Ok(next)
        }
        None => {
            revisions::ActiveModel {
                path: ActiveValue::Set(path.to_string()),
                revision: ActiveValue::Set(1),
            }
            .insert(db_tx)
            .await?;
            Ok(1)
        }
    }
}

async fn load_revisions(database: &DatabaseConnection) -> StoreResult<HashMap<String, i64>> {
    Ok(revisions::Entity::find()
        .all(database)
        .await?
        .into_iter()
        .map(|model| (model.path, model.revision))
        .collect())
}

async fn poll_revisions(
    database: DatabaseConnection,
    changes: broadcast::Sender<CollectionPath>,
    seen: Revisions,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        let current = match load_revisions(&database).await {
            Ok(current) => current,
            Err(err) => {
                tracing::warn!("revision poll failed: {err}");
                continue;
            }
        };

        let changed: Vec<String> = {
            let mut seen = lock(&seen);
            current
                .into_iter()
                .filter_map(|(path, revision)| {
                    let previous = seen.insert(path.clone(), revision);
                    (previous != Some(revision)).then_some(path)
                })
                .collect()
        };

        for path in changed {
            tracing::debug!("collection {path} changed outside this process");
            let _ = changes.send(CollectionPath::new(path));
        }
    }
}

#[async_trait]
impl RemoteStore for SqlStore {
    async fn list(&self, path: &CollectionPath, order_by: &OrderBy) -> StoreResult<Vec<Document>> {
        let models = documents::Entity::find()
            .filter(documents::Column::Path.eq(path.as_str()))
            .all(&self.database)
            .await?;
        let mut documents = models
            .into_iter()
            .map(parse_document)
            .collect::<StoreResult<Vec<_>>>()?;
        order_by.sort(&mut documents);
        Ok(documents)
    }

    async fn create(&self, path: &CollectionPath, fields: Fields) -> StoreResult<String> {
        let id = Uuid::new_v4().simple().to_string();
        let revision = with_tx!(self, |db_tx| {
            documents::ActiveModel {
                path: ActiveValue::Set(path.to_string()),
                id: ActiveValue::Set(id.clone()),
                fields: ActiveValue::Set(serde_json::to_string(&fields)?),
                updated_at: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await?;
            bump_revision(&db_tx, path).await
        })?;
        self.committed(path, revision);
        Ok(id)
    }

    async fn set(&self, path: &CollectionPath, id: &str, fields: Fields) -> StoreResult<()> {
        let revision = with_tx!(self, |db_tx| {
            self.upsert_row(&db_tx, path, id, &fields).await?;
            bump_revision(&db_tx, path).await
        })?;
        self.committed(path, revision);
        Ok(())
    }

    async fn merge(&self, path: &CollectionPath, id: &str, fields: Fields) -> StoreResult<()> {
        let revision = with_tx!(self, |db_tx| {
            let mut merged = match self.find(&db_tx, path, id).await? {
                Some(model) => parse_document(model)?.fields,
                None => Fields::new(),
            };
            merged.extend(fields);
            self.upsert_row(&db_tx, path, id, &merged).await?;
            bump_revision(&db_tx, path).await
        })?;
        self.committed(path, revision);
        Ok(())
    }

    async fn read(&self, path: &CollectionPath, id: &str) -> StoreResult<Option<Document>> {
        self.find(&self.database, path, id)
            .await?
            .map(parse_document)
            .transpose()
    }

    async fn delete(&self, path: &CollectionPath, id: &str) -> StoreResult<()> {
        let revision = with_tx!(self, |db_tx| {
            let result = documents::Entity::delete_by_id((path.to_string(), id.to_string()))
                .exec(&db_tx)
                .await?;
            if result.rows_affected == 0 {
                Ok::<_, StoreError>(None)
            } else {
                bump_revision(&db_tx, path).await.map(Some)
            }
        })?;
        if let Some(revision) = revision {
            self.committed(path, revision);
        }
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<CollectionPath> {
        self.changes.subscribe()
    }
}

/// The builder for `SqlStore`
#[derive(Default)]
pub struct SqlStoreBuilder {
    database: DatabaseConnection,
    poll_interval: Option<Duration>,
}

impl SqlStoreBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> SqlStoreBuilder {
        self.database = db;
        self
    }

    /// Also watch for writes made by other processes, checking every `interval`.
    pub fn poll_interval(mut self, interval: Duration) -> SqlStoreBuilder {
        self.poll_interval = Some(interval);
        self
    }

    /// Construct `SqlStore`
    ///
    /// Spawns the revision poller when a poll interval was set, so it must be
    /// awaited inside a tokio runtime.
    pub async fn build(self) -> StoreResult<SqlStore> {
        let (changes, _) = broadcast::channel(CHANGES_CAPACITY);
        let seen: Revisions = Arc::new(Mutex::new(load_revisions(&self.database).await?));

        let poller = self
            .poll_interval
            .filter(|interval| !interval.is_zero())
            .map(|interval| {
                let task = tokio::spawn(poll_revisions(
                    self.database.clone(),
                    changes.clone(),
                    Arc::clone(&seen),
                    interval,
                ));
                Arc::new(Poller(task))
            });

        Ok(SqlStore {
            database: self.database,
            changes,
            seen,
            _poller: poller,
        })
    }
}
