use crate::error::PrepError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use tracing::error;

/// Error body returned by every endpoint.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Handler error: a [`PrepError`] mapped onto an HTTP status.
#[derive(Debug)]
pub struct ApiError(pub PrepError);

impl From<PrepError> for ApiError {
    fn from(err: PrepError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            PrepError::NotFound { .. } => StatusCode::NOT_FOUND,
            PrepError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("request failed: {}", self.0);
        }
        let body = ErrorBody {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub(crate) type ApiResult<T> = std::result::Result<T, ApiError>;
