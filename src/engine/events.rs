use crate::execution_id::ExecutionId;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionEventKind {
    ExecutionCreated,
    ValidationStarted,
    ValidationFailed,
    ValidationSucceeded,
    ExecutionStarted,
    ExecutionFinished,
    ExecutionTimedOut,
    ExecutionFailed,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExecutionEvent {
    pub execution_id: ExecutionId,
    pub kind: ExecutionEventKind,
    pub timestamp: SystemTime,
}

impl ExecutionEvent {
    pub fn new(execution_id: &ExecutionId, kind: ExecutionEventKind) -> Self {
        Self {
            execution_id: execution_id.clone(),
            kind,
            timestamp: SystemTime::now(),
        }
    }
}
