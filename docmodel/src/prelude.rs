//! Convenient re-exports of commonly used types from docmodel.
//!
//! ```ignore
//! use docmodel::prelude::*;
//! ```
//!
//! This provides access to:
//! - The `Model` trait and its derive macro
//! - Records, stores and write batches
//! - Store backends and builders
//! - Query construction and field updates
//! - Error types

pub use docmodel_macros::Model;
pub use docmodel_core::{
    model::Model,
    record::Record,
    batch::{BatchOp, WriteBatch},
    collection::Collection,
    document::{DocumentSnapshot, ResultSet},
    store::{DocumentStore, DynDocumentStore, DynDocumentStoreRef, AsDynDocumentStore, IntoDynDocumentStore},
    backend::{StoreBackend, DynStoreBackend, StoreBackendBuilder},
    query::{Query, QueryVisitor, Expr, Sort, SortDirection, FieldOp, QueryBuilder, Filter},
    mutation::{FieldUpdate, Patch},
    error::{DocumentStoreError, DocumentStoreResult},
};
pub use crate::config::ConnectionConfig;
