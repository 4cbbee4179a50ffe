//! Active-record style models over pluggable document stores.
//!
//! This crate is the primary entry point for users of docmodel. It re-exports the core types from
//! the sub-crates, the `#[derive(Model)]` macro and the available storage backends.
//!
//! # Features
//!
//! - **Declarative models** - A collection name and an ordered list of fillable fields per type
//! - **Chained queries** - `where_condition`, `order_by`, `limit`, then `fetch` or `fetch_one`
//! - **Field-level updates** - `set`, `increment` and `remove`, applied atomically by `update`
//! - **Write batches** - Stage saves, updates and deletes and commit them all or nothing
//! - **Multiple backends** - In-memory and MongoDB storage behind one trait
//!
//! # Quick Start
//!
//! ```ignore
//! use docmodel::{prelude::*, memory::InMemoryStore};
//!
//! #[derive(Model)]
//! #[model(collection = "test-collection", fillables = ["id", "firstname", "lastname"])]
//! pub struct TestModel;
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let store = DocumentStore::new(InMemoryStore::new());
//!
//!     store
//!         .model::<TestModel>()
//!         .values(["1", "test", "test"])
//!         .save()
//!         .await?;
//!
//!     let found = store
//!         .model::<TestModel>()
//!         .where_condition("id", "==", "1")
//!         .fetch_one()
//!         .await?;
//!
//!     assert!(!found.is_empty());
//!
//!     store.shutdown().await
//! }
//! ```
//!
//! # Batches
//!
//! ```ignore
//! let mut batch = store.start_batch_write();
//!
//! let id = store.model::<TestModel>().values(["5", "a", "b"]).save_in(&mut batch)?;
//! store.model::<TestModel>().doc(id).set("firstname", "z").update_in(&mut batch).await?;
//!
//! batch.commit().await?;
//! ```
//!
//! # Default connection
//!
//! Applications that do not want to thread a store through their code can install one globally:
//!
//! ```ignore
//! docmodel::configure(&ConnectionConfig::Memory).await?;
//!
//! let mut record = docmodel::connection::model::<TestModel>()?;
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - `mongodb` - Persistent MongoDB backend (requires the `mongodb` feature)

#[allow(unused_extern_crates)]
extern crate self as docmodel;

pub mod config;
pub mod prelude;

pub use docmodel_core::{
    backend, batch, collection, connection, document, error, model, mutation, query, record, store,
};
pub use docmodel_macros::Model;

pub use config::{ConnectionConfig, configure};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docmodel_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docmodel_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
