use crate::engine::events::ExecutionEvent;

/// Receives lifecycle events for a single request.
pub trait EventSink: Send {
    fn emit(&mut self, event: ExecutionEvent);
}
