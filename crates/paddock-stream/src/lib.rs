//! # paddock-stream: Catalog change-to-event translation
//!
//! This crate turns committed catalog mutations into the event stream
//! subscribers follow, and materialises point-in-time snapshots for new
//! subscribers.
//!
//! ## Pipeline
//!
//! - [`classify`]: reduces a raw changeset to the dirty nodes and dirty
//!   service instances whose health view must be rebuilt
//! - [`project_changes`]: rebuilds the node + instance + checks join for
//!   every dirty row and emits register/deregister events
//! - [`connect_overlay`]: derives the connect-topic twins of a health batch,
//!   re-keying proxies to the service they front
//! - [`snapshot`]: streams the current state of one topic+key subscription
//!   into an [`EventSink`](paddock_types::EventSink)
//!
//! ## Guarantees
//!
//! Projection is synchronous, holds no state between transactions, and
//! either produces the complete batch for a commit or fails whole - the
//! caller drops the batch on error and subscribers re-sync from the next
//! snapshot. Within a batch, node-pass events precede instance-pass events
//! and the connect overlay forms the tail; batches are ordered by commit
//! index.

pub mod classify;
pub mod connect;
pub mod error;
pub mod project;
pub mod sink;
pub mod snapshot;

#[cfg(test)]
mod tests;

pub use classify::{DirtySets, classify};
pub use connect::connect_overlay;
pub use error::ProjectionError;
pub use project::project_changes;
pub use sink::BufferSink;
pub use snapshot::{CancelToken, SubscriptionRequest, snapshot};
