//! Storage backend abstraction.
//!
//! [`StoreBackend`] is the seam between records and whatever actually stores documents. Records
//! never talk to a database directly; they build a [`Query`], a [`Patch`] or a list of
//! [`BatchOp`]s and hand them to the backend. Everything a backend promises (atomic patches,
//! atomic batches, result order) is the backend's to honor.
//!
//! - [`StoreBackend`]: the core async trait
//! - [`DynStoreBackend`]: object-safe mirror used behind `Box<dyn ...>` and `&dyn ...`
//! - [`StoreBackendBuilder`]: factory used by connection configuration
//!
//! ```ignore
//! use docmodel::backend::StoreBackend;
//! use bson::{Uuid, Bson, doc};
//!
//! let backend = InMemoryStore::new();
//! let id = Uuid::new();
//! backend
//!     .insert_documents(vec![(id, Bson::Document(doc! { "name": "Alice" }))], "users")
//!     .await?;
//! ```

use async_trait::async_trait;
use bson::{Bson, Uuid};
use std::fmt::Debug;

use crate::{batch::BatchOp, error::DocumentStoreResult, mutation::Patch, query::Query};

/// Abstract interface for document storage backends.
///
/// Implementations must be safe to share between tasks. Identifiers are generated by callers and
/// are unique per collection.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts new documents into a collection, creating the collection if needed.
    ///
    /// # Errors
    ///
    /// [`DocumentAlreadyExists`](crate::error::DocumentStoreError::DocumentAlreadyExists) if an id
    /// is already taken.
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Applies field-level patches. Each patch is applied to its document atomically.
    ///
    /// # Errors
    ///
    /// [`DocumentNotFound`](crate::error::DocumentStoreError::DocumentNotFound) if a target
    /// document does not exist.
    async fn patch_documents(
        &self,
        patches: Vec<(Uuid, Patch)>,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Deletes documents by id.
    ///
    /// # Errors
    ///
    /// [`DocumentNotFound`](crate::error::DocumentStoreError::DocumentNotFound) if a document does
    /// not exist.
    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<()>;

    /// Fetches documents by id. Missing ids are omitted from the result.
    async fn get_documents(
        &self,
        ids: Vec<Uuid>,
        collection: &str,
    ) -> DocumentStoreResult<Vec<(Uuid, Bson)>>;

    /// Runs a query against a collection.
    ///
    /// Matching documents are returned sorted by [`Query::sort`], ties and unsorted queries in
    /// the backend's natural order, and truncated to [`Query::limit`]. A missing collection
    /// yields no rows.
    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<(Uuid, Bson)>>;

    /// Applies every operation in `operations` or none of them.
    async fn commit_batch(&self, operations: Vec<BatchOp>) -> DocumentStoreResult<()>;

    /// Creates an empty collection. Creating an existing collection is not an error.
    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()>;

    /// Drops a collection and every document in it.
    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()>;

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>>;

    /// Releases connections and other resources. The default does nothing.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
pub trait DynStoreBackend: Send + Sync + Debug {
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()>;
    async fn patch_documents(
        &self,
        patches: Vec<(Uuid, Patch)>,
        collection: &str,
    ) -> DocumentStoreResult<()>;
    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<()>;
    async fn get_documents(
        &self,
        ids: Vec<Uuid>,
        collection: &str,
    ) -> DocumentStoreResult<Vec<(Uuid, Bson)>>;
    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<(Uuid, Bson)>>;
    async fn commit_batch(&self, operations: Vec<BatchOp>) -> DocumentStoreResult<()>;
    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()>;
    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()>;
    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>>;
    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()>;
}

#[async_trait]
impl<B: StoreBackend + Send + Sync + 'static> DynStoreBackend for B {
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        StoreBackend::insert_documents(self, documents, collection).await
    }

    async fn patch_documents(
        &self,
        patches: Vec<(Uuid, Patch)>,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        StoreBackend::patch_documents(self, patches, collection).await
    }

    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<()> {
        StoreBackend::delete_documents(self, ids, collection).await
    }

    async fn get_documents(
        &self,
        ids: Vec<Uuid>,
        collection: &str,
    ) -> DocumentStoreResult<Vec<(Uuid, Bson)>> {
        StoreBackend::get_documents(self, ids, collection).await
    }

    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<(Uuid, Bson)>> {
        StoreBackend::query_documents(self, query, collection).await
    }

    async fn commit_batch(&self, operations: Vec<BatchOp>) -> DocumentStoreResult<()> {
        StoreBackend::commit_batch(self, operations).await
    }

    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        StoreBackend::create_collection(self, name).await
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        StoreBackend::drop_collection(self, name).await
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        StoreBackend::list_collections(self).await
    }

    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()> {
        StoreBackend::shutdown(*self).await
    }
}

#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
