use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// One analysis data point for a symbol. `symbol` is the partition key and
// `last_analysis_timestamp` the sort key in the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StockAnalysisRecord {
    pub symbol: String,
    pub last_analysis_timestamp: DateTime<Utc>,
    pub price: Option<f64>,
    pub volume: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub one_year_target: Option<f64>,
    pub news_summaries_json: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StockAnalysisCreated {
    pub message: String,
    pub data: StockAnalysisRecord,
}

impl StockAnalysisCreated {
    pub fn new(data: StockAnalysisRecord) -> Self {
        Self {
            message: "Stock analysis saved".to_string(),
            data,
        }
    }
}
