use serde_json::Value;
use tracing::info;

use crate::errors::AppError;
use crate::models::StockAnalysisRecord;
use crate::services::record_normalizer::{self, NumericPolicy};
use crate::store::{StorageHandle, MAX_LIST_LIMIT};

pub async fn create(
    storage: &StorageHandle,
    payload: &Value,
    policy: NumericPolicy,
) -> Result<StockAnalysisRecord, AppError> {
    // Validate before touching storage so a bad payload never reaches the backend.
    let record = record_normalizer::normalize(payload, policy)?;
    let store = storage
        .store()
        .map_err(|e| AppError::storage("Failed to save stock analysis", e))?;

    let saved = store
        .insert(record)
        .await
        .map_err(|e| AppError::storage("Failed to save stock analysis", e))?;
    info!("Saved analysis for {} at {}", saved.symbol, saved.last_analysis_timestamp);
    Ok(saved)
}

pub async fn fetch_recent(storage: &StorageHandle) -> Result<Vec<StockAnalysisRecord>, AppError> {
    let store = storage
        .store()
        .map_err(|e| AppError::storage("Failed to fetch stock analyses", e))?;
    store
        .list_recent(MAX_LIST_LIMIT)
        .await
        .map_err(|e| AppError::storage("Failed to fetch stock analyses", e))
}

pub async fn fetch_for_symbol(
    storage: &StorageHandle,
    symbol: &str,
) -> Result<Vec<StockAnalysisRecord>, AppError> {
    if symbol.trim().is_empty() {
        return Err(AppError::Validation("missing symbol".into()));
    }
    let store = storage
        .store()
        .map_err(|e| AppError::storage("Failed to fetch stock analyses", e))?;
    store
        .list_by_symbol(symbol, MAX_LIST_LIMIT)
        .await
        .map_err(|e| AppError::storage("Failed to fetch stock analyses", e))
}
