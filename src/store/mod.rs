pub mod document;
pub mod postgres;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{error, info};

use crate::config::{ConfigError, StorageBackend, StorageConfig};
use crate::models::StockAnalysisRecord;

pub use document::DocumentStockStore;
pub use postgres::PgStockStore;

/// Row cap for every list query.
pub const MAX_LIST_LIMIT: i64 = 100;

/// Width of the `symbol` column; both backends refuse longer symbols.
pub const MAX_SYMBOL_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Uninitialized => "uninitialized",
            ConnectionState::Initializing => "initializing",
            ConnectionState::Ready => "ready",
            ConnectionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage connection is {0}")]
    Unavailable(ConnectionState),
    #[error("{0}")]
    Backend(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(value: sqlx::Error) -> Self {
        StorageError::Backend(value.to_string())
    }
}

#[derive(Debug, Error)]
pub enum StorageInitError {
    #[error("storage configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("could not connect to storage: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("could not prepare storage schema: {0}")]
    Schema(#[source] sqlx::Error),
    #[error("storage initialization already attempted (state: {0})")]
    AlreadyAttempted(ConnectionState),
}

/// Persistence contract shared by the relational and document backends.
#[async_trait]
pub trait StockStore: Send + Sync {
    async fn insert(
        &self,
        record: StockAnalysisRecord,
    ) -> Result<StockAnalysisRecord, StorageError>;

    /// Newest-first, at most `limit` records.
    async fn list_recent(&self, limit: i64) -> Result<Vec<StockAnalysisRecord>, StorageError>;

    /// Newest-first records for one symbol, at most `limit`.
    async fn list_by_symbol(
        &self,
        symbol: &str,
        limit: i64,
    ) -> Result<Vec<StockAnalysisRecord>, StorageError>;

    fn backend_name(&self) -> &'static str;
}

struct HandleInner {
    state: ConnectionState,
    store: Option<Arc<dyn StockStore>>,
}

/// Shared handle to the configured store, passed to handlers through app state.
///
/// Operations only reach the store once the handle is `Ready`; every other
/// state fails fast with `StorageError::Unavailable`.
#[derive(Clone)]
pub struct StorageHandle {
    inner: Arc<RwLock<HandleInner>>,
}

impl StorageHandle {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HandleInner {
                state: ConnectionState::Uninitialized,
                store: None,
            })),
        }
    }

    /// Wrap an already constructed store in a ready handle.
    pub fn with_store(store: Arc<dyn StockStore>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HandleInner {
                state: ConnectionState::Ready,
                store: Some(store),
            })),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.read().state
    }

    /// Connect the configured backend. Runs once; the caller decides what to do
    /// with a failure.
    pub async fn initialize(&self, config: &StorageConfig) -> Result<(), StorageInitError> {
        {
            let mut inner = self.inner.write();
            if inner.state != ConnectionState::Uninitialized {
                return Err(StorageInitError::AlreadyAttempted(inner.state));
            }
            inner.state = ConnectionState::Initializing;
        }
        info!("Initializing {:?} storage", config.backend);

        let result = connect(config).await;

        let mut inner = self.inner.write();
        match result {
            Ok(store) => {
                info!("✅ Storage ready ({})", store.backend_name());
                inner.state = ConnectionState::Ready;
                inner.store = Some(store);
                Ok(())
            }
            Err(e) => {
                error!("Storage initialization failed: {}", e);
                inner.state = ConnectionState::Failed;
                Err(e)
            }
        }
    }

    pub fn store(&self) -> Result<Arc<dyn StockStore>, StorageError> {
        let inner = self.inner.read();
        match (&inner.store, inner.state) {
            (Some(store), ConnectionState::Ready) => Ok(store.clone()),
            (_, state) => Err(StorageError::Unavailable(state)),
        }
    }
}

impl Default for StorageHandle {
    fn default() -> Self {
        Self::new()
    }
}

async fn connect(config: &StorageConfig) -> Result<Arc<dyn StockStore>, StorageInitError> {
    match config.backend {
        StorageBackend::Document => Ok(Arc::new(DocumentStockStore::new())),
        StorageBackend::Postgres => {
            let settings = config
                .database
                .as_ref()
                .ok_or(ConfigError::Missing("DATABASE_URL"))?;
            let store = PgStockStore::connect(
                settings,
                config.max_connections,
                config.acquire_timeout,
            )
            .await?;
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn document_config() -> StorageConfig {
        StorageConfig {
            backend: StorageBackend::Document,
            database: None,
            max_connections: 1,
            acquire_timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_uninitialized_handle_fails_fast() {
        let handle = StorageHandle::new();
        assert_eq!(handle.state(), ConnectionState::Uninitialized);
        assert!(matches!(
            handle.store(),
            Err(StorageError::Unavailable(ConnectionState::Uninitialized))
        ));
    }

    #[tokio::test]
    async fn test_initialize_document_backend_becomes_ready() {
        let handle = StorageHandle::new();
        handle.initialize(&document_config()).await.unwrap();

        assert_eq!(handle.state(), ConnectionState::Ready);
        assert_eq!(handle.store().unwrap().backend_name(), "document");
    }

    #[tokio::test]
    async fn test_initialize_runs_once() {
        let handle = StorageHandle::new();
        handle.initialize(&document_config()).await.unwrap();

        let second = handle.initialize(&document_config()).await;
        assert!(matches!(
            second,
            Err(StorageInitError::AlreadyAttempted(ConnectionState::Ready))
        ));
    }

    #[tokio::test]
    async fn test_failed_initialization_is_terminal() {
        let handle = StorageHandle::new();
        let config = StorageConfig {
            backend: StorageBackend::Postgres,
            database: None,
            max_connections: 1,
            acquire_timeout: Duration::from_secs(1),
        };

        let result = handle.initialize(&config).await;
        assert!(matches!(result, Err(StorageInitError::Config(_))));
        assert_eq!(handle.state(), ConnectionState::Failed);
        assert!(matches!(
            handle.store(),
            Err(StorageError::Unavailable(ConnectionState::Failed))
        ));
    }
}
