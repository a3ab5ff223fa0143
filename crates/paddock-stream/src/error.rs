use paddock_types::{SinkError, StoreError};

/// Error surfaced by projection and snapshot production.
///
/// The core never retries and never partially publishes: any error aborts
/// the whole projection or snapshot, and the caller decides whether to drop
/// the batch (subscribers re-sync via the next snapshot).
#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    /// A catalog read failed, including rows the changeset implies must
    /// exist.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The subscriber buffer rejected an append.
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// The subscriber cancelled its snapshot.
    #[error("snapshot cancelled by the subscriber")]
    Cancelled,
}
