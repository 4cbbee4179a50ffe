//! Process-wide default connection.
//!
//! Applications that do not want to pass a store around configure one here at startup and reach
//! it from anywhere afterwards. Configuring is one-shot: the first store wins and later calls are
//! ignored.
//!
//! ```ignore
//! docmodel::connection::configure(DocumentStore::new(InMemoryStore::new()).into_dyn());
//!
//! let found = docmodel::connection::model::<TestModel>()?
//!     .where_eq("id", "1")
//!     .fetch_one()
//!     .await?;
//! ```

use std::sync::OnceLock;
use tracing::{info, warn};

use crate::{
    batch::WriteBatch,
    error::{DocumentStoreError, DocumentStoreResult},
    model::Model,
    record::Record,
    store::DynDocumentStore,
};

static CONNECTION: OnceLock<DynDocumentStore> = OnceLock::new();

/// Installs `store` as the default connection.
///
/// Returns `true` if this call installed it, `false` if a connection was already configured.
/// A rejected store is dropped; use [`try_configure`] to get it back and shut it down.
pub fn configure(store: DynDocumentStore) -> bool {
    try_configure(store).is_ok()
}

/// Like [`configure`], handing a rejected store back to the caller.
pub fn try_configure(store: DynDocumentStore) -> Result<(), DynDocumentStore> {
    match CONNECTION.set(store) {
        Ok(()) => {
            info!("default connection configured");
            Ok(())
        }
        Err(rejected) => {
            warn!("default connection already configured; keeping the existing one");
            Err(rejected)
        }
    }
}

pub fn is_configured() -> bool {
    CONNECTION.get().is_some()
}

/// The default connection.
///
/// # Errors
///
/// [`DocumentStoreError::ConfigurationMissing`] if [`configure`] has not been called.
pub fn connection() -> DocumentStoreResult<&'static DynDocumentStore> {
    CONNECTION
        .get()
        .ok_or(DocumentStoreError::ConfigurationMissing)
}

/// Starts a record for `M` on the default connection.
pub fn model<M: Model>() -> DocumentStoreResult<Record<'static, M>> {
    Ok(connection()?.model::<M>())
}

/// Starts a write batch on the default connection.
pub fn start_batch_write() -> DocumentStoreResult<WriteBatch<'static>> {
    Ok(connection()?.start_batch_write())
}
