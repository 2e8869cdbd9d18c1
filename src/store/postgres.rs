use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::config::DatabaseSettings;
use crate::db::stock_analysis_queries;
use crate::models::StockAnalysisRecord;
use crate::store::{StockStore, StorageError, StorageInitError};

/// Relational backend: one row per record in `stock_analysis_results`.
#[derive(Clone)]
pub struct PgStockStore {
    pool: PgPool,
}

impl PgStockStore {
    /// Open the pool, run a test query and create the table if it is missing.
    pub async fn connect(
        settings: &DatabaseSettings,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, StorageInitError> {
        let options = settings.connect_options().map_err(StorageInitError::Connect)?;

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect_with(options)
            .await
            .map_err(StorageInitError::Connect)?;

        stock_analysis_queries::ping(&pool)
            .await
            .map_err(StorageInitError::Connect)?;
        info!("Database connection established ({} max connections)", max_connections);

        stock_analysis_queries::ensure_table(&pool)
            .await
            .map_err(StorageInitError::Schema)?;
        info!("Table stock_analysis_results is ready");

        Ok(Self { pool })
    }
}

#[async_trait]
impl StockStore for PgStockStore {
    async fn insert(
        &self,
        record: StockAnalysisRecord,
    ) -> Result<StockAnalysisRecord, StorageError> {
        Ok(stock_analysis_queries::insert(&self.pool, record).await?)
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<StockAnalysisRecord>, StorageError> {
        Ok(stock_analysis_queries::fetch_recent(&self.pool, limit).await?)
    }

    async fn list_by_symbol(
        &self,
        symbol: &str,
        limit: i64,
    ) -> Result<Vec<StockAnalysisRecord>, StorageError> {
        Ok(stock_analysis_queries::fetch_by_symbol(&self.pool, symbol, limit).await?)
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
