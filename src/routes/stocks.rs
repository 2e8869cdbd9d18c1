use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use http::{Method, StatusCode};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::models::{StockAnalysisCreated, StockAnalysisRecord};
use crate::services;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(fetch_recent).put(create_analysis).post(create_analysis))
        .route("/:symbol", get(fetch_for_symbol))
}

pub async fn fetch_recent(
    State(state): State<AppState>
) -> Result<Json<Vec<StockAnalysisRecord>>, AppError> {
    info!("GET /api/stocks - Fetching recent stock analyses");
    let records = services::stock_analysis_service::fetch_recent(&state.storage).await
        .map_err(|e| {
            error!("Failed to fetch stock analyses: {}", e);
            e
        })?;
    Ok(Json(records))
}

pub async fn create_analysis(
    method: Method,
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<StockAnalysisCreated>), AppError> {
    info!("{} /api/stocks - Saving stock analysis", method);
    let Json(payload) = payload.map_err(|e| {
        warn!("Rejected stock analysis body: {}", e.body_text());
        AppError::from(e)
    })?;

    let record = services::stock_analysis_service::create(
        &state.storage,
        &payload,
        state.numeric_policy,
    ).await
        .map_err(|e| {
            match &e {
                AppError::Validation(msg) => warn!("Rejected stock analysis: {}", msg),
                _ => error!("Failed to save stock analysis: {}", e),
            }
            e
        })?;
    Ok((StatusCode::CREATED, Json(StockAnalysisCreated::new(record))))
}

pub async fn fetch_for_symbol(
    Path(symbol): Path<String>,
    State(state): State<AppState>
) -> Result<Json<Vec<StockAnalysisRecord>>, AppError> {
    info!("GET /api/stocks/{} - Fetching stock analyses", symbol);
    let records = services::stock_analysis_service::fetch_for_symbol(&state.storage, &symbol).await
        .map_err(|e| {
            error!("Failed to fetch stock analyses for {}: {}", symbol, e);
            e
        })?;
    Ok(Json(records))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;

    use crate::app::create_app;
    use crate::services::record_normalizer::NumericPolicy;
    use crate::state::AppState;
    use crate::store::{DocumentStockStore, StorageHandle};
    use super::*;

    fn app_with(storage: StorageHandle) -> Router {
        create_app(AppState {
            storage,
            numeric_policy: NumericPolicy::Truthy,
        })
    }

    fn document_app() -> Router {
        app_with(StorageHandle::with_store(Arc::new(DocumentStockStore::new())))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn put_json(body: Value) -> Request<Body> {
        Request::builder()
            .method("PUT")
            .uri("/api/stocks")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_put_returns_created_record() {
        let app = document_app();
        let (status, body) = send(
            &app,
            put_json(json!({ "symbol": "AAPL", "price": 150.2, "volume": 1000000 })),
        ).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Stock analysis saved");
        assert_eq!(body["data"]["symbol"], "AAPL");
        assert_eq!(body["data"]["price"], 150.2);
        assert_eq!(body["data"]["dividend_yield"], Value::Null);
    }

    #[tokio::test]
    async fn test_put_without_symbol_is_bad_request() {
        let app = document_app();
        let (status, body) = send(&app, put_json(json!({}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("symbol"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let app = document_app();
        let request = Request::builder()
            .method("PUT")
            .uri("/api/stocks")
            .header("content-type", "application/json")
            .body(Body::from("{\"symbol\": "))
            .unwrap();
        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_get_on_empty_store_returns_empty_array() {
        let app = document_app();
        let (status, body) = send(&app, get("/api/stocks")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_get_returns_at_most_one_hundred() {
        let app = document_app();
        for i in 0..101 {
            let ts = format!("2024-02-01T10:{:02}:{:02}Z", i / 60, i % 60);
            let (status, _) = send(
                &app,
                put_json(json!({ "symbol": format!("S{}", i % 7), "timestamp": ts })),
            ).await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, body) = send(&app, get("/api/stocks")).await;
        assert_eq!(status, StatusCode::OK);
        let records = body.as_array().unwrap();
        assert_eq!(records.len(), 100);
        assert_eq!(records[0]["last_analysis_timestamp"], "2024-02-01T10:01:40Z");
    }

    #[tokio::test]
    async fn test_get_by_symbol() {
        let app = document_app();
        send(&app, put_json(json!({ "symbol": "AMD", "pe_ratio": 44.0 }))).await;
        send(&app, put_json(json!({ "symbol": "INTC" }))).await;

        let (status, body) = send(&app, get("/api/stocks/AMD")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["pe_ratio"], 44.0);
    }

    #[tokio::test]
    async fn test_post_is_accepted_like_put() {
        let app = document_app();
        let request = Request::builder()
            .method("POST")
            .uri("/api/stocks")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "symbol": "IBM" }).to_string()))
            .unwrap();
        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["symbol"], "IBM");
    }

    #[tokio::test]
    async fn test_oversized_symbol_is_a_storage_error() {
        let app = document_app();
        let (status, body) = send(&app, put_json(json!({ "symbol": "A".repeat(21) }))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to save stock analysis");
        assert!(body["details"].as_str().unwrap().contains("character varying(20)"));
    }

    #[tokio::test]
    async fn test_unready_storage_returns_server_error() {
        let app = app_with(StorageHandle::new());

        let (status, body) = send(&app, get("/api/stocks")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Storage unavailable");
        assert!(body["details"].as_str().unwrap().contains("uninitialized"));

        let (status, _) = send(&app, put_json(json!({ "symbol": "AAPL" }))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let (status, body) = send(&app, get("/health")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["storage"], "uninitialized");
    }

    #[tokio::test]
    async fn test_health_reports_backend() {
        let app = document_app();
        let (status, body) = send(&app, get("/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["backend"], "document");
    }
}
