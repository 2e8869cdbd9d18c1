use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::models::StockAnalysisRecord;
use crate::store::{StockStore, StorageError, MAX_SYMBOL_LEN};

/// Document backend: items addressed by partition key (`symbol`) and sort key
/// (`last_analysis_timestamp`). Writing an existing key replaces the item.
#[derive(Clone, Default)]
pub struct DocumentStockStore {
    partitions: Arc<DashMap<String, BTreeMap<DateTime<Utc>, StockAnalysisRecord>>>,
}

impl DocumentStockStore {
    pub fn new() -> Self {
        Self {
            partitions: Arc::new(DashMap::new()),
        }
    }

    /// Total number of items across all partitions.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.partitions.iter().map(|p| p.value().len()).sum()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn cap(limit: i64) -> usize {
    usize::try_from(limit).unwrap_or(0)
}

#[async_trait]
impl StockStore for DocumentStockStore {
    async fn insert(
        &self,
        record: StockAnalysisRecord,
    ) -> Result<StockAnalysisRecord, StorageError> {
        if record.symbol.chars().count() > MAX_SYMBOL_LEN {
            return Err(StorageError::Backend(format!(
                "value too long for type character varying({})",
                MAX_SYMBOL_LEN
            )));
        }
        self.partitions
            .entry(record.symbol.clone())
            .or_default()
            .insert(record.last_analysis_timestamp, record.clone());
        Ok(record)
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<StockAnalysisRecord>, StorageError> {
        let limit = cap(limit);

        // The newest `limit` items of each partition are enough to find the global top `limit`.
        let mut items: Vec<StockAnalysisRecord> = self
            .partitions
            .iter()
            .flat_map(|partition| {
                partition
                    .value()
                    .values()
                    .rev()
                    .take(limit)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();

        items.sort_by(|a, b| {
            b.last_analysis_timestamp
                .cmp(&a.last_analysis_timestamp)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        items.truncate(limit);
        Ok(items)
    }

    async fn list_by_symbol(
        &self,
        symbol: &str,
        limit: i64,
    ) -> Result<Vec<StockAnalysisRecord>, StorageError> {
        let items = match self.partitions.get(symbol) {
            Some(partition) => partition.values().rev().take(cap(limit)).cloned().collect(),
            None => Vec::new(),
        };
        Ok(items)
    }

    fn backend_name(&self) -> &'static str {
        "document"
    }
}
