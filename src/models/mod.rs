mod stock_analysis;

pub use stock_analysis::{StockAnalysisCreated, StockAnalysisRecord};
