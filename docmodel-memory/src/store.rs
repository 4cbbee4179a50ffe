//! In-memory storage implementation for document stores.
//!
//! Documents are kept as BSON values in per-collection ordered maps behind an async-aware
//! read-write lock. A collection's natural order is ascending document id.

use std::{collections::{BTreeMap, HashMap}, sync::Arc};
use async_trait::async_trait;
use mea::rwlock::RwLock;
use bson::{Uuid, Bson};
use tracing::debug;

use docmodel_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    batch::BatchOp,
    error::{DocumentStoreError, DocumentStoreResult},
    mutation::Patch,
    query::Query,
};

use crate::evaluator::{DocumentEvaluator, compare_documents};

type CollectionMap = BTreeMap<String, (Uuid, Bson)>;
type StoreMap = HashMap<String, CollectionMap>;

/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, so clones share the
/// same data.
///
/// Queries scan every document in a collection; there are no indexes. Patches and batches hold
/// the write lock for their whole duration, which makes them atomic with respect to every other
/// operation on the store.
///
/// # Example
///
/// ```ignore
/// use docmodel_memory::InMemoryStore;
/// use docmodel::backend::StoreBackend;
/// use bson::{Uuid, Bson, doc};
///
/// let store = InMemoryStore::new();
///
/// let id = Uuid::new();
/// let doc = Bson::Document(doc! { "name": "Alice", "age": 30 });
/// store.insert_documents(vec![(id, doc)], "users").await?;
///
/// let docs = store.get_documents(vec![id], "users").await?;
/// assert_eq!(docs.len(), 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> (document id -> (id, document))
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }
}

fn insert_into(store: &mut StoreMap, collection: &str, id: Uuid, document: Bson) -> DocumentStoreResult<()> {
    let collection_map = store
        .entry(collection.to_string())
        .or_default();
    let key = id.to_string();

    if collection_map.contains_key(&key) {
        return Err(DocumentStoreError::DocumentAlreadyExists(key, collection.to_string()));
    }

    collection_map.insert(key, (id, document));

    Ok(())
}

fn patch_in(store: &mut StoreMap, collection: &str, id: Uuid, patch: &Patch) -> DocumentStoreResult<()> {
    let key = id.to_string();
    let document = store
        .get_mut(collection)
        .and_then(|collection_map| collection_map.get_mut(&key))
        .ok_or_else(|| DocumentStoreError::DocumentNotFound(key.clone(), collection.to_string()))?;

    match &mut document.1 {
        Bson::Document(document) => patch.apply_to(document),
        _ => Err(DocumentStoreError::InvalidDocument(format!(
            "Document {key} in collection {collection} is not a document"
        ))),
    }
}

fn delete_from(store: &mut StoreMap, collection: &str, id: Uuid) -> DocumentStoreResult<()> {
    let key = id.to_string();
    let removed = store
        .get_mut(collection)
        .and_then(|collection_map| collection_map.remove(&key));

    match removed {
        Some(_) => Ok(()),
        None => Err(DocumentStoreError::DocumentNotFound(key, collection.to_string())),
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_documents(&self, documents: Vec<(Uuid, Bson)>, collection: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;

        for (id, doc) in documents {
            insert_into(&mut store, collection, id, doc)?;
        }

        Ok(())
    }

    async fn patch_documents(&self, patches: Vec<(Uuid, Patch)>, collection: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;

        for (id, patch) in patches {
            patch_in(&mut store, collection, id, &patch)?;
        }

        Ok(())
    }

    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;

        for id in ids {
            delete_from(&mut store, collection, id)?;
        }

        Ok(())
    }

    async fn get_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<Vec<(Uuid, Bson)>> {
        let store = self.store.read().await;
        let collection_map = match store.get(collection) {
            Some(col) => col,
            None => return Ok(vec![]),
        };

        Ok(
            ids.into_iter()
                .filter_map(|id| collection_map.get(&id.to_string()).cloned())
                .collect()
        )
    }

    async fn query_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<(Uuid, Bson)>> {
        let store = self.store.read().await;
        let collection_map = match store.get(collection) {
            Some(col) => col,
            None => return Ok(vec![]),
        };

        let mut rows = Vec::new();

        for row in collection_map.values() {
            let keep = match &query.filter {
                Some(filter) => DocumentEvaluator::matches(&row.1, filter)?,
                None => true,
            };

            if keep {
                rows.push(row);
            }
        }

        // Stable, so ties keep id order
        if !query.sort.is_empty() {
            rows.sort_by(|a, b| compare_documents(&a.1, &b.1, &query.sort));
        }

        Ok(
            rows.into_iter()
                .take(query.limit.filter(|limit| *limit > 0).unwrap_or(usize::MAX))
                .cloned()
                .collect()
        )
    }

    async fn commit_batch(&self, operations: Vec<BatchOp>) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let mut staged = (*store).clone();
        let count = operations.len();

        for operation in operations {
            match operation {
                BatchOp::Insert { collection, id, document } => {
                    insert_into(&mut staged, &collection, id, document)?
                }
                BatchOp::Update { collection, id, patch } => {
                    patch_in(&mut staged, &collection, id, &patch)?
                }
                BatchOp::Delete { collection, id } => delete_from(&mut staged, &collection, id)?,
            }
        }

        *store = staged;

        debug!(count, "applied write batch in memory");

        Ok(())
    }

    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.store
            .write()
            .await
            .entry(name.to_string())
            .or_default();

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;

        if store.remove(name).is_none() {
            return Err(DocumentStoreError::CollectionNotFound(name.to_string()));
        }

        Ok(())
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        let mut names = self.store
            .read()
            .await
            .keys()
            .cloned()
            .collect::<Vec<_>>();

        names.sort();

        Ok(names)
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}
