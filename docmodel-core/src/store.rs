//! Main entry point for working with models over a backend.
//!
//! This module exposes three store types:
//!
//! - [`DocumentStore`] - Typed store owning a specific backend implementation
//! - [`DynDocumentStore`] - Dynamic dispatch store for runtime backend selection
//! - [`DynDocumentStoreRef`] - Borrowed store for temporary use
//!
//! Each hands out [`Record`]s for model types, untyped [`Collection`]s and [`WriteBatch`]es bound
//! to its backend.
//!
//! # Example
//!
//! ```ignore
//! use docmodel::prelude::*;
//!
//! let store = DocumentStore::new(InMemoryStore::new());
//! let id = store.model::<TestModel>().values(["1", "test", "test"]).save().await?;
//! ```

use tracing::info;

use crate::{
    backend::{DynStoreBackend, StoreBackend},
    batch::WriteBatch,
    collection::Collection,
    error::DocumentStoreResult,
    model::Model,
    record::Record,
};

/// A document store bound to a specific backend implementation.
///
/// # Example
///
/// ```ignore
/// let store = DocumentStore::new(my_backend);
/// let users = store.model::<User>();
/// ```
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
}

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a new document store with the given backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Creates a new collection with the given name.
    pub async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        StoreBackend::create_collection(&self.backend, name).await
    }

    /// Drops a collection and its documents.
    pub async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        StoreBackend::drop_collection(&self.backend, name).await
    }

    /// Lists all collections in the store.
    pub async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        StoreBackend::list_collections(&self.backend).await
    }

    /// Shuts down the store and releases backend resources.
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown operation fails.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        StoreBackend::shutdown(self.backend).await?;

        info!("document store shut down");

        Ok(())
    }
}

impl<B: StoreBackend + 'static> DocumentStore<B> {
    /// Starts a new record for the model type `M`.
    pub fn model<M: Model>(&self) -> Record<'_, M> {
        Record::new(&self.backend)
    }

    /// Gets an untyped collection with the given name.
    pub fn collection(&self, name: &str) -> Collection<'_> {
        Collection::new(name.to_string(), &self.backend)
    }

    /// Starts an empty write batch against this store's backend.
    pub fn start_batch_write(&self) -> WriteBatch<'_> {
        WriteBatch::new(&self.backend)
    }
}

#[derive(Debug)]
pub struct DynDocumentStore {
    backend: Box<dyn DynStoreBackend>,
}

impl DynDocumentStore {
    /// Creates a new dynamic document store with the given backend trait object.
    pub fn new(backend: Box<dyn DynStoreBackend>) -> Self {
        Self { backend }
    }

    /// Starts a new record for the model type `M`.
    pub fn model<M: Model>(&self) -> Record<'_, M> {
        Record::new(&*self.backend)
    }

    /// Gets an untyped collection with the given name.
    pub fn collection(&self, name: &str) -> Collection<'_> {
        Collection::new(name.to_string(), &*self.backend)
    }

    /// Starts an empty write batch against this store's backend.
    pub fn start_batch_write(&self) -> WriteBatch<'_> {
        WriteBatch::new(&*self.backend)
    }

    pub async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.backend
            .create_collection(name)
            .await
    }

    pub async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.backend.drop_collection(name).await
    }

    pub async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        self.backend.list_collections().await
    }

    /// Shuts down the store and releases backend resources.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown_boxed().await?;

        info!("document store shut down");

        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DynDocumentStoreRef<'a> {
    backend: &'a dyn DynStoreBackend,
}

impl<'a> DynDocumentStoreRef<'a> {
    /// Creates a reference to a dynamic document store.
    pub fn new(backend: &'a dyn DynStoreBackend) -> Self {
        Self { backend }
    }

    pub fn model<M: Model>(&self) -> Record<'a, M> {
        Record::new(self.backend)
    }

    pub fn collection(&self, name: &str) -> Collection<'a> {
        Collection::new(name.to_string(), self.backend)
    }

    pub fn start_batch_write(&self) -> WriteBatch<'a> {
        WriteBatch::new(self.backend)
    }

    pub async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.backend
            .create_collection(name)
            .await
    }

    pub async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.backend.drop_collection(name).await
    }

    pub async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        self.backend.list_collections().await
    }
}

/// Conversion trait for borrowing any store as a [`DynDocumentStoreRef`].
pub trait AsDynDocumentStore {
    fn as_dyn(&self) -> DynDocumentStoreRef<'_>;
}

/// Conversion trait for turning any store into an owned [`DynDocumentStore`].
pub trait IntoDynDocumentStore {
    fn into_dyn(self) -> DynDocumentStore;
}

impl<B: StoreBackend + 'static> AsDynDocumentStore for DocumentStore<B> {
    fn as_dyn(&self) -> DynDocumentStoreRef<'_> {
        DynDocumentStoreRef::new(&self.backend)
    }
}

impl AsDynDocumentStore for DynDocumentStore {
    fn as_dyn(&self) -> DynDocumentStoreRef<'_> {
        DynDocumentStoreRef::new(&*self.backend)
    }
}

impl AsDynDocumentStore for DynDocumentStoreRef<'_> {
    fn as_dyn(&self) -> DynDocumentStoreRef<'_> {
        DynDocumentStoreRef::new(self.backend)
    }
}

impl<B: StoreBackend + 'static> IntoDynDocumentStore for DocumentStore<B> {
    fn into_dyn(self) -> DynDocumentStore {
        DynDocumentStore::new(Box::new(self.backend))
    }
}

impl IntoDynDocumentStore for DynDocumentStore {
    fn into_dyn(self) -> DynDocumentStore {
        self
    }
}
