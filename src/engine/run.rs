use tracing::Instrument;

use crate::{
    engine::{
        events::{ExecutionEvent, ExecutionEventKind},
        execute::CommandRunner,
        registry::ExecutableRegistry,
        request::{ExecutionRequest, Target},
        sink::EventSink,
        validate::validate_request,
        ExecutionResult,
    },
    error::{ExecutionError, Result},
    execution_id::ExecutionId,
};

/// Validate a request and, if it passes, hand it to the runner.
///
/// Lifecycle events are emitted into `sink` as the request progresses. A
/// request that fails validation never reaches `runner`.
pub async fn run_execution(
    registry: &ExecutableRegistry,
    runner: &dyn CommandRunner,
    request: ExecutionRequest,
    sink: &mut dyn EventSink,
) -> Result<ExecutionResult> {
    let execution_id = ExecutionId::new();

    let span = match &request.target {
        Target::Alias(alias) => {
            tracing::info_span!("execution", execution_id = %execution_id, alias = %alias)
        }
        Target::Path(path) => {
            tracing::info_span!("execution", execution_id = %execution_id, path = %path.display())
        }
    };

    run_inner(registry, runner, request, sink, execution_id)
        .instrument(span)
        .await
}

async fn run_inner(
    registry: &ExecutableRegistry,
    runner: &dyn CommandRunner,
    request: ExecutionRequest,
    sink: &mut dyn EventSink,
    execution_id: ExecutionId,
) -> Result<ExecutionResult> {
    // ---- execution created ----
    sink.emit(ExecutionEvent::new(&execution_id, ExecutionEventKind::ExecutionCreated));

    // ---- validation ----
    sink.emit(ExecutionEvent::new(&execution_id, ExecutionEventKind::ValidationStarted));

    let command = match validate_request(registry, request) {
        Ok(command) => command,
        Err(e) => {
            tracing::info!(kind = ?e.kind(), error = %e, "request rejected");
            sink.emit(ExecutionEvent::new(&execution_id, ExecutionEventKind::ValidationFailed));
            return Err(e);
        }
    };

    sink.emit(ExecutionEvent::new(&execution_id, ExecutionEventKind::ValidationSucceeded));

    // ---- execution ----
    sink.emit(ExecutionEvent::new(&execution_id, ExecutionEventKind::ExecutionStarted));

    let outcome = runner.run(&command).await;

    let finished = match &outcome {
        Ok(_) => ExecutionEventKind::ExecutionFinished,
        Err(ExecutionError::Timeout(limit)) => {
            tracing::warn!(limit_secs = limit.as_secs_f64(), "execution exceeded its time limit");
            ExecutionEventKind::ExecutionTimedOut
        }
        Err(e) => {
            tracing::error!(error = %e, "execution failed");
            ExecutionEventKind::ExecutionFailed
        }
    };
    sink.emit(ExecutionEvent::new(&execution_id, finished));

    outcome
}
