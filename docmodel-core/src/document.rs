//! Documents as returned by reads.
//!
//! Reads produce a [`ResultSet`]: an emptiness flag plus `(id, data)` pairs in the order the
//! backend returned them. Both types serialize to the `{ empty, docs: [{ id, data }] }` shape.

use bson::{Bson, Document, Uuid, de::deserialize_from_bson};
use serde::{Deserialize, Serialize};
use serde_json::{Value, to_value};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// A stored document together with its identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub id: Uuid,
    pub data: Document,
}

impl DocumentSnapshot {
    pub fn new(id: Uuid, data: Document) -> Self {
        Self { id, data }
    }

    /// Builds a snapshot from a backend row, rejecting bodies that are not documents.
    pub fn from_row(id: Uuid, body: Bson) -> DocumentStoreResult<Self> {
        match body {
            Bson::Document(data) => Ok(Self { id, data }),
            other => Err(DocumentStoreError::InvalidDocument(format!(
                "Expected document body for {id}, found {:?}",
                other.element_type()
            ))),
        }
    }

    /// Returns the identifier in its text form.
    pub fn id_string(&self) -> String {
        self.id.to_string()
    }

    pub fn get(&self, field: &str) -> Option<&Bson> {
        self.data.get(field)
    }

    /// Decodes the document body into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Serialization`] if the body does not fit `T`.
    pub fn deserialize<T>(&self) -> DocumentStoreResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        Ok(deserialize_from_bson(Bson::Document(self.data.clone()))?)
    }
}

/// The outcome of `fetch` or `fetch_one`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub empty: bool,
    pub docs: Vec<DocumentSnapshot>,
}

impl ResultSet {
    pub fn empty() -> Self {
        Self { empty: true, docs: Vec::new() }
    }

    /// Wraps `docs`, deriving the emptiness flag from them.
    pub fn from_docs(docs: Vec<DocumentSnapshot>) -> Self {
        Self { empty: docs.is_empty(), docs }
    }

    /// Builds a result set from backend rows.
    pub fn from_rows(rows: Vec<(Uuid, Bson)>) -> DocumentStoreResult<Self> {
        Ok(Self::from_docs(
            rows.into_iter()
                .map(|(id, body)| DocumentSnapshot::from_row(id, body))
                .collect::<DocumentStoreResult<Vec<_>>>()?,
        ))
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn first(&self) -> Option<&DocumentSnapshot> {
        self.docs.first()
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.docs.iter().map(|doc| doc.id).collect()
    }

    /// Decodes every document body into `T`, keeping result order.
    pub fn deserialize<T>(&self) -> DocumentStoreResult<Vec<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        self.docs.iter().map(DocumentSnapshot::deserialize).collect()
    }

    /// Renders the result set as JSON with ids in their text form.
    pub fn to_json(&self) -> DocumentStoreResult<Value> {
        let docs = self
            .docs
            .iter()
            .map(|doc| {
                Ok(serde_json::json!({
                    "id": doc.id_string(),
                    "data": to_value(&doc.data)?,
                }))
            })
            .collect::<DocumentStoreResult<Vec<Value>>>()?;

        Ok(serde_json::json!({ "empty": self.empty, "docs": docs }))
    }
}

impl IntoIterator for ResultSet {
    type Item = DocumentSnapshot;
    type IntoIter = std::vec::IntoIter<DocumentSnapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.docs.into_iter()
    }
}
