use std::collections::HashMap;
use async_trait::async_trait;
use futures::TryStreamExt;
use bson::{Document, Bson, Uuid, de::deserialize_from_bson, doc};
use mongodb::{
    Client, ClientSession, Collection as MongoCollection,
    error::Error as MongoError,
    options::{ClientOptions, FindOptions},
};
use tracing::{debug, warn};
use docmodel_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    batch::BatchOp,
    error::{DocumentStoreError, DocumentStoreResult},
    mutation::{FieldUpdate, Patch},
    query::{Query, QueryVisitor},
};

use crate::{sanitizer::ValueSanitizer, query::MongoQueryTranslator};

fn backend_error(err: MongoError) -> DocumentStoreError {
    DocumentStoreError::Backend(err.to_string())
}

fn is_duplicate_key(err: &MongoError) -> bool {
    err.to_string().contains("E11000")
}

/// Fails with `DocumentNotFound` unless every id in `ids` was deleted.
pub(crate) fn ensure_deleted(deleted: u64, ids: &[Uuid], collection: &str) -> DocumentStoreResult<()> {
    let mut requested = ids.to_vec();
    requested.sort_by_key(|id| id.to_string());
    requested.dedup();

    if deleted < requested.len() as u64 {
        return Err(DocumentStoreError::DocumentNotFound(
            requested
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            collection.to_string(),
        ));
    }

    Ok(())
}

/// Translates a patch into an update document using `$set`, `$inc` and `$unset`.
///
/// Returns `None` for an empty patch, which MongoDB would reject.
pub(crate) fn update_document(patch: &Patch) -> Option<Document> {
    let mut set = Document::new();
    let mut inc = Document::new();
    let mut unset = Document::new();

    for (field, update) in patch.iter() {
        let field = ValueSanitizer::sanitize_string(field);

        match update {
            FieldUpdate::Set(value) => {
                set.insert(field, ValueSanitizer::sanitize_value(value));
            }
            FieldUpdate::Increment(delta) => {
                inc.insert(field, delta.clone());
            }
            FieldUpdate::Remove => {
                unset.insert(field, "");
            }
        }
    }

    let mut update = Document::new();

    for (operator, fields) in [("$set", set), ("$inc", inc), ("$unset", unset)] {
        if !fields.is_empty() {
            update.insert(operator, fields);
        }
    }

    (!update.is_empty()).then_some(update)
}

/// MongoDB document storage backend.
///
/// Documents are stored with their id in `_id` as a UUID binary. Batches run in a multi-document
/// transaction, which requires a replica set or sharded cluster.
#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(&ValueSanitizer::sanitize_string(collection_name))
    }

    fn prepare_document(&self, id: &Uuid, document: &Bson) -> DocumentStoreResult<Document> {
        let document = document
            .as_document()
            .ok_or_else(|| DocumentStoreError::InvalidDocument("Expected document".into()))?;

        let mut prepared = ValueSanitizer::sanitize_document(document);
        prepared.insert("_id", Bson::from(*id));

        Ok(prepared)
    }

    fn restore_document(&self, mut document: Document) -> DocumentStoreResult<(Uuid, Bson)> {
        let id = document
            .remove("_id")
            .ok_or_else(|| DocumentStoreError::InvalidDocument("Stored document has no _id".into()))?;
        let id = deserialize_from_bson::<Uuid>(id)?;

        Ok((id, Bson::Document(ValueSanitizer::restore_document(&document))))
    }

    async fn insert(
        &self,
        id: Uuid,
        document: &Bson,
        collection: &str,
        session: &mut ClientSession,
    ) -> DocumentStoreResult<()> {
        self.get_collection(collection)
            .insert_one(self.prepare_document(&id, document)?)
            .session(&mut *session)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    DocumentStoreError::DocumentAlreadyExists(id.to_string(), collection.to_string())
                } else {
                    backend_error(e)
                }
            })?;

        Ok(())
    }

    async fn patch(
        &self,
        id: Uuid,
        patch: &Patch,
        collection: &str,
        session: &mut ClientSession,
    ) -> DocumentStoreResult<()> {
        let target = self.get_collection(collection);

        let matched = match update_document(patch) {
            Some(update) => {
                target
                    .update_one(doc! { "_id": id }, update)
                    .session(&mut *session)
                    .await
                    .map_err(backend_error)?
                    .matched_count
            }
            None => {
                target
                    .count_documents(doc! { "_id": id })
                    .session(&mut *session)
                    .await
                    .map_err(backend_error)?
            }
        };

        if matched == 0 {
            return Err(DocumentStoreError::DocumentNotFound(id.to_string(), collection.to_string()));
        }

        Ok(())
    }

    async fn delete(
        &self,
        id: Uuid,
        collection: &str,
        session: &mut ClientSession,
    ) -> DocumentStoreResult<()> {
        let deleted = self.get_collection(collection)
            .delete_one(doc! { "_id": id })
            .session(&mut *session)
            .await
            .map_err(backend_error)?
            .deleted_count;

        ensure_deleted(deleted, &[id], collection)
    }

    async fn apply(&self, operation: &BatchOp, session: &mut ClientSession) -> DocumentStoreResult<()> {
        match operation {
            BatchOp::Insert { collection, id, document } => {
                self.insert(*id, document, collection, session).await
            }
            BatchOp::Update { collection, id, patch } => {
                self.patch(*id, patch, collection, session).await
            }
            BatchOp::Delete { collection, id } => self.delete(*id, collection, session).await,
        }
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn insert_documents(&self, documents: Vec<(Uuid, Bson)>, collection: &str) -> DocumentStoreResult<()> {
        if documents.is_empty() {
            return Ok(());
        }

        self.get_collection(collection)
            .insert_many(
                documents
                    .iter()
                    .map(|(id, doc)| self.prepare_document(id, doc))
                    .collect::<DocumentStoreResult<Vec<Document>>>()?,
            )
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    DocumentStoreError::DocumentAlreadyExists(
                        documents
                            .iter()
                            .map(|(id, _)| id.to_string())
                            .collect::<Vec<_>>()
                            .join(", "),
                        collection.to_string(),
                    )
                } else {
                    backend_error(e)
                }
            })?;

        Ok(())
    }

    async fn patch_documents(&self, patches: Vec<(Uuid, Patch)>, collection: &str) -> DocumentStoreResult<()> {
        let target = self.get_collection(collection);

        for (id, patch) in patches {
            let matched = match update_document(&patch) {
                Some(update) => target
                    .update_one(doc! { "_id": id }, update)
                    .await
                    .map_err(backend_error)?
                    .matched_count,
                None => target
                    .count_documents(doc! { "_id": id })
                    .await
                    .map_err(backend_error)?,
            };

            if matched == 0 {
                return Err(DocumentStoreError::DocumentNotFound(id.to_string(), collection.to_string()));
            }
        }

        Ok(())
    }

    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<()> {
        let deleted = self.get_collection(collection)
            .delete_many(doc! { "_id": { "$in": ids.clone() } })
            .await
            .map_err(backend_error)?
            .deleted_count;

        ensure_deleted(deleted, &ids, collection)
    }

    async fn get_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<Vec<(Uuid, Bson)>> {
        let mut found = self.get_collection(collection)
            .find(doc! { "_id": { "$in": ids.clone() } })
            .await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)?
            .into_iter()
            .map(|doc| self.restore_document(doc))
            .collect::<DocumentStoreResult<HashMap<Uuid, Bson>>>()?;

        // Requested order
        Ok(
            ids.into_iter()
                .filter_map(|id| found.remove(&id).map(|doc| (id, doc)))
                .collect()
        )
    }

    async fn query_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<(Uuid, Bson)>> {
        let mut options = FindOptions::default();

        // Zero is unbounded, as it is for MongoDB itself
        if let Some(limit) = query.limit.filter(|limit| *limit > 0) {
            options.limit = Some(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        options.sort = Some(MongoQueryTranslator::sort_document(&query.sort));

        let filter = match &query.filter {
            Some(expr) => MongoQueryTranslator.visit_expr(expr)?,
            None => doc! {},
        };

        debug!(collection, %filter, "running find");

        self.get_collection(collection)
            .find(filter)
            .with_options(options)
            .await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)?
            .into_iter()
            .map(|doc| self.restore_document(doc))
            .collect()
    }

    async fn commit_batch(&self, operations: Vec<BatchOp>) -> DocumentStoreResult<()> {
        let mut session = self.client
            .start_session()
            .await
            .map_err(backend_error)?;

        session.start_transaction().await.map_err(backend_error)?;

        for operation in &operations {
            if let Err(err) = self.apply(operation, &mut session).await {
                if let Err(abort) = session.abort_transaction().await {
                    warn!(error = %abort, "failed to abort write batch transaction");
                }

                return Err(err);
            }
        }

        session.commit_transaction().await.map_err(backend_error)?;

        debug!(count = operations.len(), "committed write batch transaction");

        Ok(())
    }

    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        if self.list_collections().await?.iter().any(|existing| existing == name) {
            return Ok(());
        }

        self.client
            .database(&self.database)
            .create_collection(ValueSanitizer::sanitize_string(name))
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.get_collection(name)
            .drop()
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        let mut names = self.client
            .database(&self.database)
            .list_collection_names()
            .await
            .map_err(backend_error)?
            .iter()
            .map(|name| ValueSanitizer::restore_string(name))
            .collect::<Vec<_>>();

        names.sort();

        Ok(names)
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(MongoDbStore::new(
            Client::with_options(
                ClientOptions::parse(&self.dsn)
                    .await
                    .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            )
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}
