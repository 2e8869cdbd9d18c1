use sqlx::PgPool;
use crate::models::StockAnalysisRecord;
use crate::store::MAX_SYMBOL_LEN;

const COLUMNS: &str = "symbol, last_analysis_timestamp, price, volume, pe_ratio,
                       dividend_yield, one_year_target, news_summaries_json";

pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn ensure_table(pool: &PgPool) -> Result<(), sqlx::Error> {
    let sql = format!(
        "CREATE TABLE IF NOT EXISTS stock_analysis_results (
            symbol VARCHAR({MAX_SYMBOL_LEN}) NOT NULL,
            last_analysis_timestamp TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            price DOUBLE PRECISION,
            volume DOUBLE PRECISION,
            pe_ratio DOUBLE PRECISION,
            dividend_yield DOUBLE PRECISION,
            one_year_target DOUBLE PRECISION,
            news_summaries_json TEXT
        )");
    sqlx::query(&sql)
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_stock_analysis_results_timestamp
         ON stock_analysis_results (last_analysis_timestamp DESC)")
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn insert(pool: &PgPool, input: StockAnalysisRecord)
-> Result<StockAnalysisRecord, sqlx::Error> {
    let sql = format!(
        "INSERT INTO stock_analysis_results ({COLUMNS})
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING {COLUMNS}");
    sqlx::query_as::<_, StockAnalysisRecord>(&sql)
        .bind(input.symbol)
        .bind(input.last_analysis_timestamp)
        .bind(input.price)
        .bind(input.volume)
        .bind(input.pe_ratio)
        .bind(input.dividend_yield)
        .bind(input.one_year_target)
        .bind(input.news_summaries_json)
        .fetch_one(pool)
        .await
}

pub async fn fetch_recent(pool: &PgPool, limit: i64)
-> Result<Vec<StockAnalysisRecord>, sqlx::Error> {
    let sql = format!(
        "SELECT {COLUMNS}
         FROM stock_analysis_results
         ORDER BY last_analysis_timestamp DESC
         LIMIT $1");
    sqlx::query_as::<_, StockAnalysisRecord>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await
}

pub async fn fetch_by_symbol(pool: &PgPool, symbol: &str, limit: i64)
-> Result<Vec<StockAnalysisRecord>, sqlx::Error> {
    let sql = format!(
        "SELECT {COLUMNS}
         FROM stock_analysis_results
         WHERE symbol = $1
         ORDER BY last_analysis_timestamp DESC
         LIMIT $2");
    sqlx::query_as::<_, StockAnalysisRecord>(&sql)
        .bind(symbol)
        .bind(limit)
        .fetch_all(pool)
        .await
}
