// src/engine/response.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::engine::ExecutionResult;
use crate::error::ExecutionError;

/// Body of every non-200 execute response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl From<&ExecutionError> for ErrorBody {
    fn from(err: &ExecutionError) -> Self {
        Self {
            error: err.to_string(),
        }
    }
}

impl IntoResponse for ExecutionResult {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

impl IntoResponse for ExecutionError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(ErrorBody::from(&self))).into_response()
    }
}
