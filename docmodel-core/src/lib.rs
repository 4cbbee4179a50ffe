//! Active-record style models over pluggable document stores.
//!
//! This crate is the core of the docmodel project and provides:
//!
//! - **Models** ([`model`]) - Schema descriptors naming a collection and its fillable fields
//! - **Records** ([`record`]) - Chainable conditions, ordering, limits and field updates with
//!   fetch, save, update and delete operations
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing storage backends
//! - **Query and filtering API** ([`query`]) - Filter expressions, operators and sort keys
//! - **Field updates** ([`mutation`]) - Patches applied atomically per document
//! - **Write batches** ([`batch`]) - Explicit all-or-nothing write queues
//! - **Collections** ([`collection`]) - Untyped access to a single collection
//! - **Results** ([`document`]) - Snapshots and result sets returned by reads
//! - **Document store** ([`store`]) - Typed and dynamic store handles
//! - **Default connection** ([`connection`]) - Process-wide store configured once
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use docmodel_core::{model::Model, store::DocumentStore};
//!
//! pub struct TestModel;
//!
//! impl Model for TestModel {
//!     fn collection_name() -> &'static str {
//!         "test-collection"
//!     }
//!
//!     fn fillables() -> &'static [&'static str] {
//!         &["id", "firstname", "lastname"]
//!     }
//! }
//!
//! let store = DocumentStore::new(backend);
//! store.model::<TestModel>().values(["1", "test", "test"]).save().await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_core;

pub mod backend;
pub mod batch;
pub mod collection;
pub mod connection;
pub mod document;
pub mod error;
pub mod model;
pub mod mutation;
pub mod query;
pub mod record;
pub mod store;
