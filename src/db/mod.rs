pub mod stock_analysis_queries;
