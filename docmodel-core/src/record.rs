//! Active-record style access to a model's collection.
//!
//! A [`Record`] is one model instance: the positional values it will be saved with, plus the
//! conditions, sort keys, limit and pending field updates accumulated by its chain methods.
//! Terminal operations (`fetch`, `fetch_one`, `save`, `update`, `delete` and their batched
//! counterparts) turn that state into backend calls.
//!
//! Accumulators are taken at the start of each terminal operation, so they are empty afterwards
//! whether the operation succeeded or not.
//!
//! ```ignore
//! let id = store.model::<TestModel>().values(["1", "test", "test"]).save().await?;
//!
//! let found = store
//!     .model::<TestModel>()
//!     .where_condition("id", "==", "1")
//!     .fetch_one()
//!     .await?;
//!
//! store
//!     .model::<TestModel>()
//!     .doc(id)
//!     .increment("visits", 1)
//!     .update()
//!     .await?;
//! ```

use bson::{Bson, DateTime as BsonDateTime, Document, Uuid};
use chrono::{DateTime, Utc};
use std::{fmt, marker::PhantomData, mem};
use tracing::debug;

use crate::{
    backend::DynStoreBackend,
    batch::{BatchOp, WriteBatch},
    collection::Collection,
    document::ResultSet,
    error::{DocumentStoreError, DocumentStoreResult},
    model::{CREATED_AT, DELETED_AT, Model, UPDATED_AT, bind_fillables},
    mutation::{FieldUpdate, Patch, is_numeric},
    query::{Expr, FieldOp, Query, Sort, SortDirection},
};

pub struct Record<'a, M: Model> {
    collection: Collection<'a>,
    values: Vec<Bson>,
    created_at: DateTime<Utc>,
    doc_id: Option<Uuid>,
    filters: Vec<Expr>,
    sorts: Vec<Sort>,
    limit: Option<usize>,
    patch: Patch,
    // First malformed condition or id, reported by the next terminal operation.
    deferred: Option<DocumentStoreError>,
    _marker: PhantomData<M>,
}

impl<'a, M: Model> Record<'a, M> {
    pub(crate) fn new(backend: &'a dyn DynStoreBackend) -> Self {
        Self {
            collection: Collection::new(M::collection_name().to_string(), backend),
            values: Vec::new(),
            created_at: Utc::now(),
            doc_id: None,
            filters: Vec::new(),
            sorts: Vec::new(),
            limit: None,
            patch: Patch::new(),
            deferred: None,
            _marker: PhantomData,
        }
    }

    pub fn collection_name(&self) -> &str {
        self.collection.name()
    }

    /// When this record was constructed. Saved as `created_at` if the model keeps timestamps.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn bound_id(&self) -> Option<&Uuid> {
        self.doc_id.as_ref()
    }

    pub fn pending_filters(&self) -> &[Expr] {
        &self.filters
    }

    pub fn pending_sorts(&self) -> &[Sort] {
        &self.sorts
    }

    pub fn pending_limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn pending_patch(&self) -> &Patch {
        &self.patch
    }

    /// Sets the positional values bound to [`Model::fillables`] on save, replacing earlier ones.
    pub fn values<I>(mut self, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Bson>,
    {
        self.values = values
            .into_iter()
            .map(Into::into)
            .collect();
        self
    }

    /// Appends one positional value.
    pub fn value(mut self, value: impl Into<Bson>) -> Self {
        self.values.push(value.into());
        self
    }

    /// Binds the record to an existing document. Point lookups, updates and deletes then target
    /// this document directly.
    pub fn doc(mut self, id: Uuid) -> Self {
        self.doc_id = Some(id);
        self
    }

    /// Like [`Record::doc`], taking the identifier in its text form.
    pub fn doc_str(mut self, id: &str) -> Self {
        match Uuid::parse_str(id) {
            Ok(id) => self.doc_id = Some(id),
            Err(err) => self.defer(DocumentStoreError::InvalidDocument(format!(
                "Invalid document id '{id}': {err}"
            ))),
        }
        self
    }

    /// Adds a `field <op> value` condition.
    ///
    /// The operator is not checked here; an unsupported one fails the next terminal operation.
    pub fn where_condition(
        mut self,
        field: impl Into<String>,
        op: impl AsRef<str>,
        value: impl Into<Bson>,
    ) -> Self {
        match op.as_ref().parse::<FieldOp>() {
            Ok(op) => self.filters.push(Expr::field(field.into(), op, value.into())),
            Err(err) => self.defer(err),
        }
        self
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.filters.push(Expr::field(field.into(), FieldOp::Eq, value.into()));
        self
    }

    /// Adds an arbitrary filter expression, ANDed with the other conditions.
    pub fn filter(mut self, expr: Expr) -> Self {
        self.filters.push(expr);
        self
    }

    pub fn order_by(self, field: impl Into<String>) -> Self {
        self.order_by_direction(field, SortDirection::Asc)
    }

    pub fn order_by_desc(self, field: impl Into<String>) -> Self {
        self.order_by_direction(field, SortDirection::Desc)
    }

    pub fn order_by_direction(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sorts.push(Sort { field: field.into(), direction });
        self
    }

    /// Caps the number of rows `fetch` returns. `None` or `0` removes the cap.
    pub fn limit(mut self, limit: impl Into<Option<usize>>) -> Self {
        self.limit = limit.into().filter(|limit| *limit > 0);
        self
    }

    pub fn set(self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.set_with(field, FieldUpdate::Set(value.into()))
    }

    /// Adds `delta` to the field on the backend side. A non-numeric delta fails `update`.
    pub fn increment(self, field: impl Into<String>, delta: impl Into<Bson>) -> Self {
        self.set_with(field, FieldUpdate::Increment(delta.into()))
    }

    /// Removes the field from the document.
    pub fn remove(self, field: impl Into<String>) -> Self {
        self.set_with(field, FieldUpdate::Remove)
    }

    /// Records a pending update for `field`, replacing any earlier one for the same field.
    pub fn set_with(mut self, field: impl Into<String>, update: FieldUpdate) -> Self {
        self.patch.insert(field, update);
        self
    }

    /// The document `save` would write: bound fillables plus timestamp fields.
    ///
    /// # Errors
    ///
    /// [`DocumentStoreError::InvalidDocument`] if there are more values than fillables.
    pub fn attributes(&self) -> DocumentStoreResult<Document> {
        let mut document = bind_fillables(M::fillables(), &self.values)?;

        if M::timestamps() {
            document.insert(CREATED_AT, BsonDateTime::from_chrono(self.created_at));
            document.insert(UPDATED_AT, Bson::Null);
        }
        if M::soft_delete() {
            document.insert(DELETED_AT, Bson::Null);
        }

        Ok(document)
    }

    /// Looks up at most one document.
    ///
    /// With a bound id this is a point lookup and the conditions are ignored. Otherwise the
    /// conditions and sort keys run as a query capped at one row. The bound id and limit are kept;
    /// conditions and sort keys are cleared.
    pub async fn fetch_one(&mut self) -> DocumentStoreResult<ResultSet> {
        let query = self.take_query(Some(1))?;

        let rows = match self.doc_id {
            Some(id) => self
                .collection
                .get(vec![id])
                .await?
                .into_iter()
                .take(1)
                .collect(),
            None => self.collection.query(query).await?,
        };

        debug!(collection = self.collection.name(), found = rows.len(), "fetched one");

        ResultSet::from_rows(rows)
    }

    /// Returns every matching document in backend order, up to the limit if one is set.
    /// Conditions, sort keys and the limit are cleared.
    pub async fn fetch(&mut self) -> DocumentStoreResult<ResultSet> {
        let limit = self.limit.take();
        let query = self.take_query(limit)?;
        let rows = self.collection.query(query).await?;

        debug!(collection = self.collection.name(), found = rows.len(), "fetched");

        ResultSet::from_rows(rows)
    }

    /// Inserts the record as a new document and returns its id.
    pub async fn save(&mut self) -> DocumentStoreResult<Uuid> {
        let id = Uuid::new();
        let document = self.attributes()?;

        self.collection
            .insert(vec![(id, Bson::Document(document))])
            .await?;

        debug!(collection = self.collection.name(), %id, "saved");

        Ok(id)
    }

    /// Stages the insert in `batch` instead of writing it.
    ///
    /// The returned id is the one the document will have once the batch commits.
    pub fn save_in(&mut self, batch: &mut WriteBatch<'_>) -> DocumentStoreResult<Uuid> {
        let id = Uuid::new();
        let document = self.attributes()?;

        batch.push(BatchOp::Insert {
            collection: self.collection.name().to_string(),
            id,
            document: Bson::Document(document),
        });

        Ok(id)
    }

    /// Applies the pending field updates to one document as a single atomic patch.
    ///
    /// The target is the bound id, or else the first document matching the conditions and sort
    /// keys. Conditions, sort keys, pending updates and the bound id are cleared.
    ///
    /// # Errors
    ///
    /// [`DocumentStoreError::NoMatch`] when no bound id is set and nothing matches, and
    /// [`DocumentStoreError::InvalidDocument`] for a non-numeric increment.
    pub async fn update(&mut self) -> DocumentStoreResult<()> {
        let (id, patch) = self.resolve_update().await?;
        let fields = patch.len();

        self.collection.patch(vec![(id, patch)]).await?;

        debug!(collection = self.collection.name(), %id, fields, "updated");

        Ok(())
    }

    /// Resolves the target like [`Record::update`] but stages the patch in `batch`.
    pub async fn update_in(&mut self, batch: &mut WriteBatch<'_>) -> DocumentStoreResult<()> {
        let (id, patch) = self.resolve_update().await?;

        batch.push(BatchOp::Update {
            collection: self.collection.name().to_string(),
            id,
            patch,
        });

        Ok(())
    }

    /// Deletes the bound document, or every document `fetch` would return.
    ///
    /// Matches are deleted one at a time. The first failure stops the loop and is returned;
    /// documents deleted before it stay deleted. Use [`Record::delete_in`] for an all-or-nothing
    /// delete. Soft-delete models are removed physically as well.
    ///
    /// Returns the number of documents deleted.
    pub async fn delete(&mut self) -> DocumentStoreResult<usize> {
        let ids = self.resolve_targets().await?;
        let mut deleted = 0;

        for id in ids {
            self.collection.delete(vec![id]).await?;
            deleted += 1;
        }

        debug!(collection = self.collection.name(), deleted, "deleted");

        Ok(deleted)
    }

    /// Stages a delete of every target [`Record::delete`] would remove. Returns how many were
    /// staged.
    pub async fn delete_in(&mut self, batch: &mut WriteBatch<'_>) -> DocumentStoreResult<usize> {
        let ids = self.resolve_targets().await?;
        let count = ids.len();

        for id in ids {
            batch.push(BatchOp::Delete {
                collection: self.collection.name().to_string(),
                id,
            });
        }

        Ok(count)
    }

    fn defer(&mut self, err: DocumentStoreError) {
        if self.deferred.is_none() {
            self.deferred = Some(err);
        }
    }

    fn take_query(&mut self, limit: Option<usize>) -> DocumentStoreResult<Query> {
        let filters = mem::take(&mut self.filters);
        let sort = mem::take(&mut self.sorts);

        if let Some(err) = self.deferred.take() {
            return Err(err);
        }

        Ok(Query {
            filter: Expr::all(filters),
            limit,
            sort,
        })
    }

    async fn resolve_update(&mut self) -> DocumentStoreResult<(Uuid, Patch)> {
        let patch = mem::take(&mut self.patch);
        let bound = self.doc_id.take();
        let query = self.take_query(Some(1))?;

        if let Some((field, _)) = patch.iter().find(|(_, update)| {
            matches!(update, FieldUpdate::Increment(delta) if !is_numeric(delta))
        }) {
            return Err(DocumentStoreError::InvalidDocument(format!(
                "Cannot increment '{field}' by a non-numeric value"
            )));
        }

        let id = match bound {
            Some(id) => id,
            None => self
                .collection
                .query(query)
                .await?
                .into_iter()
                .next()
                .map(|(id, _)| id)
                .ok_or_else(|| DocumentStoreError::NoMatch(self.collection.name().to_string()))?,
        };

        Ok((id, patch))
    }

    async fn resolve_targets(&mut self) -> DocumentStoreResult<Vec<Uuid>> {
        let bound = self.doc_id.take();
        let limit = self.limit.take();
        let query = self.take_query(limit)?;

        if M::soft_delete() {
            debug!(
                collection = self.collection.name(),
                "soft delete declared; removing documents physically"
            );
        }

        Ok(match bound {
            Some(id) => vec![id],
            None => self
                .collection
                .query(query)
                .await?
                .into_iter()
                .map(|(id, _)| id)
                .collect(),
        })
    }
}

impl<M: Model> fmt::Debug for Record<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("collection", &self.collection.name())
            .field("values", &self.values)
            .field("doc_id", &self.doc_id)
            .field("filters", &self.filters)
            .field("sorts", &self.sorts)
            .field("limit", &self.limit)
            .field("patch", &self.patch)
            .finish()
    }
}
