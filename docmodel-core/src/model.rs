//! Model schema descriptors.
//!
//! A model is a type that names its collection and the ordered list of fields that positional
//! values bind to. Nothing is looked up at runtime: the schema comes from the trait impl, usually
//! generated by `#[derive(Model)]`.
//!
//! ```ignore
//! use docmodel::prelude::*;
//!
//! #[derive(Model)]
//! #[model(collection = "test-collection", fillables = ["id", "firstname", "lastname"], timestamps = false)]
//! pub struct TestModel;
//! ```

use bson::{Bson, Document};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Field written with the record's creation time when timestamps are enabled.
pub const CREATED_AT: &str = "created_at";
/// Field written as `null` on insert when timestamps are enabled.
pub const UPDATED_AT: &str = "updated_at";
/// Field written as `null` on insert when soft delete is enabled.
pub const DELETED_AT: &str = "deleted_at";

/// Schema descriptor for a persisted model.
pub trait Model: Send + Sync + 'static {
    /// Name of the collection the model's documents live in.
    fn collection_name() -> &'static str;

    /// Field names, in the order positional values bind to them.
    fn fillables() -> &'static [&'static str];

    /// Whether `save` adds `created_at`/`updated_at`.
    fn timestamps() -> bool {
        true
    }

    /// Whether `save` adds a `deleted_at` field.
    fn soft_delete() -> bool {
        false
    }
}

/// Binds positional `values` to `fillables` by position.
///
/// Fillables past the last value are left out of the result.
///
/// # Errors
///
/// Returns [`DocumentStoreError::InvalidDocument`] when there are more values than fillables.
pub fn bind_fillables(fillables: &[&str], values: &[Bson]) -> DocumentStoreResult<Document> {
    if values.len() > fillables.len() {
        return Err(DocumentStoreError::InvalidDocument(format!(
            "{} values supplied for {} fillable fields",
            values.len(),
            fillables.len()
        )));
    }

    Ok(fillables
        .iter()
        .zip(values)
        .map(|(field, value)| (field.to_string(), value.clone()))
        .collect())
}
