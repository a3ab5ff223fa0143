//! Contract between event producers and the subscriber buffer.

use crate::events::Event;

/// Error returned when the subscriber buffer rejects a batch.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The subscriber went away; the producer should stop.
    #[error("subscriber buffer closed")]
    Closed,

    /// A row could not be marshalled into wire form. Raised by sinks that
    /// encode eagerly on append.
    #[error("failed to encode event for the wire")]
    Encoding(#[from] serde_json::Error),
}

/// Receives produced events, one batch at a time.
///
/// A batch is visible to downstream fan-out all-or-none. `append` is allowed
/// to block indefinitely for backpressure; producers that need to remain
/// cancellable check their cancellation signal between calls, not inside one.
pub trait EventSink {
    fn append(&mut self, events: &[Event]) -> Result<(), SinkError>;
}
