// src/error.rs

use axum::http::StatusCode;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Classification of a failed execution request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    InvalidTarget,
    NotExecutable,
    Timeout,
    SpawnFailure,
}

/// Every way a request can fail before or during execution.
///
/// `InvalidTarget` and `NotExecutable` are raised by the validator and
/// guarantee that no process was spawned.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("{0}")]
    InvalidTarget(String),

    #[error("Not an executable file: {0}")]
    NotExecutable(String),

    #[error("Command timed out")]
    Timeout(Duration),

    #[error("{0}")]
    SpawnFailure(String),
}

impl ExecutionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecutionError::InvalidTarget(_) => ErrorKind::InvalidTarget,
            ExecutionError::NotExecutable(_) => ErrorKind::NotExecutable,
            ExecutionError::Timeout(_) => ErrorKind::Timeout,
            ExecutionError::SpawnFailure(_) => ErrorKind::SpawnFailure,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::InvalidTarget | ErrorKind::NotExecutable => StatusCode::BAD_REQUEST,
            ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::SpawnFailure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExecutionError>;
