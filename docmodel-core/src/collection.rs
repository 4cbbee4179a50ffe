//! Untyped access to a single collection.
//!
//! A [`Collection`] pairs a collection name with a backend reference. Records use it for every
//! backend call; it is also handy on its own when raw BSON is all you need.
//!
//! ```ignore
//! let users = store.collection("users");
//! users.insert(vec![(Uuid::new(), Bson::Document(doc! { "name": "Alice" }))]).await?;
//! let rows = users.query(Query::builder().filter(Filter::eq("name", "Alice")).build()).await?;
//! ```

use bson::{Bson, Uuid};

use crate::{
    backend::DynStoreBackend,
    error::DocumentStoreResult,
    mutation::Patch,
    query::Query,
};

#[derive(Debug, Clone)]
pub struct Collection<'a> {
    name: String,
    backend: &'a dyn DynStoreBackend,
}

impl<'a> Collection<'a> {
    pub(crate) fn new(name: String, backend: &'a dyn DynStoreBackend) -> Self {
        Self { name, backend }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts new documents under the given ids.
    ///
    /// # Errors
    ///
    /// Fails if an id already exists or the backend rejects the write.
    pub async fn insert(&self, documents: Vec<(Uuid, Bson)>) -> DocumentStoreResult<()> {
        self.backend
            .insert_documents(documents, &self.name)
            .await
    }

    /// Applies field-level patches to existing documents.
    pub async fn patch(&self, patches: Vec<(Uuid, Patch)>) -> DocumentStoreResult<()> {
        self.backend
            .patch_documents(patches, &self.name)
            .await
    }

    pub async fn delete<U>(&self, ids: Vec<U>) -> DocumentStoreResult<()>
    where
        U: Into<Uuid> + Send + Sync + 'static,
    {
        self.backend
            .delete_documents(
                ids.into_iter()
                    .map(Into::into)
                    .collect(),
                &self.name,
            )
            .await
    }

    /// Retrieves documents by id. Ids that do not exist are omitted.
    pub async fn get<U>(&self, ids: Vec<U>) -> DocumentStoreResult<Vec<(Uuid, Bson)>>
    where
        U: Into<Uuid> + Send + Sync + 'static,
    {
        self.backend
            .get_documents(
                ids.into_iter()
                    .map(Into::into)
                    .collect(),
                &self.name,
            )
            .await
    }

    pub async fn query(&self, query: Query) -> DocumentStoreResult<Vec<(Uuid, Bson)>> {
        self.backend
            .query_documents(query, &self.name)
            .await
    }
}
