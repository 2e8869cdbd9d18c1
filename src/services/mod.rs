pub mod record_normalizer;
pub mod stock_analysis_service;
