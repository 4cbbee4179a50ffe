//! Connection configuration.
//!
//! A [`ConnectionConfig`] names a backend and its settings. It deserializes from JSON (or any
//! serde format) so applications can keep it in their own config files:
//!
//! ```json
//! { "backend": "memory" }
//! { "backend": "mongodb", "dsn": "mongodb://localhost:27017", "database": "app" }
//! ```

use serde::{Deserialize, Serialize};
use tracing::info;

use docmodel_core::{
    backend::StoreBackendBuilder,
    connection,
    error::DocumentStoreResult,
    store::{DocumentStore, DynDocumentStore, IntoDynDocumentStore},
};
use docmodel_memory::InMemoryStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum ConnectionConfig {
    Memory,
    /// Requires the `mongodb` feature.
    #[cfg(feature = "mongodb")]
    #[serde(rename = "mongodb")]
    MongoDb { dsn: String, database: String },
}

impl ConnectionConfig {
    pub fn from_json(json: &str) -> DocumentStoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            ConnectionConfig::Memory => "memory",
            #[cfg(feature = "mongodb")]
            ConnectionConfig::MongoDb { .. } => "mongodb",
        }
    }

    /// Builds the configured backend and wraps it in a store.
    ///
    /// # Errors
    ///
    /// Whatever the backend's builder reports, usually
    /// [`Initialization`](docmodel_core::error::DocumentStoreError::Initialization).
    pub async fn connect(&self) -> DocumentStoreResult<DynDocumentStore> {
        let store = match self {
            ConnectionConfig::Memory => DocumentStore::new(InMemoryStore::builder().build().await?).into_dyn(),
            #[cfg(feature = "mongodb")]
            ConnectionConfig::MongoDb { dsn, database } => DocumentStore::new(
                docmodel_mongodb::MongoDbStore::builder(dsn, database)
                    .build()
                    .await?,
            )
            .into_dyn(),
        };

        info!(backend = self.backend_name(), "connected document store");

        Ok(store)
    }
}

/// Connects `config` and installs it as the default connection.
///
/// Does nothing if a default connection is already installed. Returns whether this call installed
/// one.
pub async fn configure(config: &ConnectionConfig) -> DocumentStoreResult<bool> {
    if connection::is_configured() {
        return Ok(false);
    }

    install(config.connect().await?).await
}

/// Installs `store` as the default connection, shutting it down if another caller got there first.
async fn install(store: DynDocumentStore) -> DocumentStoreResult<bool> {
    match connection::try_configure(store) {
        Ok(()) => Ok(true),
        Err(rejected) => {
            rejected.shutdown().await?;
            Ok(false)
        }
    }
}
