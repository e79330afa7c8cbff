use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

use crate::storage::StorageError;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self.0.downcast_ref::<StorageError>() {
            Some(StorageError::Validation(_)) => StatusCode::BAD_REQUEST,
            Some(StorageError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Some(StorageError::Conflict(_)) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Tell axum how to convert `AppError` into a response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(%status, err = %self.0, "Request failed");
        } else {
            warn!(%status, err = %self.0, "Request rejected");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

// This enables using `?` on anything convertible to `anyhow::Error`, storage
// errors included, inside handlers.
impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
