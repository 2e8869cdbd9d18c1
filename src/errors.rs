use axum::extract::rejection::JsonRejection;
use axum::response::IntoResponse;
use axum::Json;
use http::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::store::StorageError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("{context}: {source}")]
    Storage {
        context: &'static str,
        #[source]
        source: StorageError,
    },
}

impl AppError {
    /// Attach the failed operation to a storage error, splitting out the
    /// not-ready case so it reports as unavailable rather than a backend fault.
    pub fn storage(context: &'static str, source: StorageError) -> Self {
        match source {
            StorageError::Unavailable(state) => {
                AppError::StorageUnavailable(format!("storage connection is {}", state))
            }
            other => AppError::Storage { context, source: other },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::StorageUnavailable(_) | AppError::Storage { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let body = match self {
            AppError::Validation(msg) => ErrorBody { error: msg, details: None },
            AppError::StorageUnavailable(msg) => ErrorBody {
                error: "Storage unavailable".to_string(),
                details: Some(msg),
            },
            AppError::Storage { context, source } => ErrorBody {
                error: context.to_string(),
                details: Some(source.to_string()),
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(value: JsonRejection) -> Self {
        AppError::Validation(value.body_text())
    }
}
