//! # paddock-store: In-memory transactional catalog store
//!
//! The catalog holds three tables - nodes, service instances, and health
//! checks - behind a single handle supporting many concurrent readers and
//! one committing writer at a time.
//!
//! ## Key properties
//!
//! - **Point-in-time reads**: [`Catalog::read`] snapshots the committed
//!   tables; the snapshot never observes later commits.
//! - **Changeset capture**: every mutation staged on a [`WriteTxn`] is
//!   recorded with its full before/after row images, in input order. The
//!   [`Commit`] returned by [`WriteTxn::commit`] carries the changeset plus
//!   the writer's own read view, which is what the event translation core
//!   projects from.
//! - **Cascades are visible**: deleting a node deletes its services and
//!   checks, deleting a service deletes its service-scoped checks, and every
//!   cascaded row appears in the changeset as its own change.
//!
//! ## Example
//!
//! ```ignore
//! let catalog = Catalog::new();
//! let mut txn = catalog.write();
//! txn.upsert_node(node)?;
//! txn.upsert_service(instance)?;
//! let commit = txn.commit();
//! // project commit.changeset against &commit ...
//! ```

mod state;
mod txn;

pub use txn::{Catalog, Commit, ReadTxn, WriteTxn};
