//! Batched writes committed atomically.
//!
//! A [`WriteBatch`] is an explicit handle: records stage writes into it with `save_in`,
//! `update_in` and `delete_in`, and [`WriteBatch::commit`] hands the whole queue to the backend
//! in one call. Committing consumes the batch, so a queue is replayed at most once and two
//! sessions never share one.
//!
//! ```ignore
//! let mut batch = store.start_batch_write();
//!
//! let first = store.model::<TestModel>().values(["5", "a", "b"]).save_in(&mut batch)?;
//! store.model::<TestModel>().values(["6", "c", "d"]).save_in(&mut batch)?;
//! store.model::<TestModel>().doc(first).set("firstname", "z").update_in(&mut batch).await?;
//!
//! batch.commit().await?;
//! ```

use bson::{Bson, Uuid};
use tracing::{debug, info};

use crate::{
    backend::DynStoreBackend,
    error::DocumentStoreResult,
    mutation::Patch,
};

/// A write staged in a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    Insert {
        collection: String,
        id: Uuid,
        document: Bson,
    },
    Update {
        collection: String,
        id: Uuid,
        patch: Patch,
    },
    Delete {
        collection: String,
        id: Uuid,
    },
}

impl BatchOp {
    pub fn collection(&self) -> &str {
        match self {
            BatchOp::Insert { collection, .. }
            | BatchOp::Update { collection, .. }
            | BatchOp::Delete { collection, .. } => collection,
        }
    }

    pub fn id(&self) -> &Uuid {
        match self {
            BatchOp::Insert { id, .. } | BatchOp::Update { id, .. } | BatchOp::Delete { id, .. } => id,
        }
    }
}

/// A queue of writes bound to one backend.
#[derive(Debug)]
pub struct WriteBatch<'a> {
    backend: &'a dyn DynStoreBackend,
    operations: Vec<BatchOp>,
}

impl<'a> WriteBatch<'a> {
    pub(crate) fn new(backend: &'a dyn DynStoreBackend) -> Self {
        Self { backend, operations: Vec::new() }
    }

    /// Appends an operation to the queue.
    pub fn push(&mut self, operation: BatchOp) {
        debug!(
            collection = operation.collection(),
            id = %operation.id(),
            queued = self.operations.len() + 1,
            "staged batch operation"
        );
        self.operations.push(operation);
    }

    pub fn operations(&self) -> &[BatchOp] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Applies every staged operation as one atomic write.
    ///
    /// An empty batch commits without contacting the backend.
    ///
    /// # Errors
    ///
    /// Returns whatever the backend reported. The batch is consumed either way; nothing staged in
    /// it survives a failed commit.
    pub async fn commit(self) -> DocumentStoreResult<()> {
        if self.operations.is_empty() {
            return Ok(());
        }

        let count = self.operations.len();
        self.backend.commit_batch(self.operations).await?;

        info!(count, "committed write batch");

        Ok(())
    }
}
