use crate::engine::events::ExecutionEvent;
use crate::engine::sink::EventSink;

/// Forwards lifecycle events to `tracing` at debug level.
///
/// This is the sink used by the HTTP runtime; it holds no state.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingEventSink;

impl EventSink for LoggingEventSink {
    fn emit(&mut self, event: ExecutionEvent) {
        tracing::debug!(
            execution_id = %event.execution_id,
            kind = ?event.kind,
            "execution event"
        );
    }
}
