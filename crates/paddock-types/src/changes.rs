//! Committed changesets - the mutation log of one catalog transaction.
//!
//! Every write transaction records each row mutation with its full before
//! and after images. The changeset is handed to the event translation core
//! after commit, which reduces it to subscriber-visible events.

use serde::{Deserialize, Serialize};

use crate::catalog::{HealthCheck, Node, ServiceInstance};
use crate::ids::CommitIndex;

/// One row mutation, captured as before/after images.
///
/// Exactly one of the three shapes holds:
/// - create: `before` is `None`, `after` is `Some`
/// - update: both are `Some`
/// - delete: `before` is `Some`, `after` is `None`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change<T> {
    pub before: Option<T>,
    pub after: Option<T>,
}

impl<T> Change<T> {
    pub fn create(after: T) -> Self {
        Self {
            before: None,
            after: Some(after),
        }
    }

    pub fn update(before: T, after: T) -> Self {
        Self {
            before: Some(before),
            after: Some(after),
        }
    }

    pub fn delete(before: T) -> Self {
        Self {
            before: Some(before),
            after: None,
        }
    }

    pub fn is_create(&self) -> bool {
        self.before.is_none() && self.after.is_some()
    }

    pub fn is_update(&self) -> bool {
        self.before.is_some() && self.after.is_some()
    }

    pub fn is_delete(&self) -> bool {
        self.after.is_none()
    }

    /// The row image that carries the current identity: `after` if present,
    /// else `before` (deletes only have a before image).
    pub fn current(&self) -> &T {
        self.after
            .as_ref()
            .or(self.before.as_ref())
            .expect("a change carries at least one row image")
    }
}

/// A mutation to one of the three catalog tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableChange {
    Node(Change<Node>),
    Service(Change<ServiceInstance>),
    Check(Change<HealthCheck>),
}

/// The ordered set of row mutations committed by one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changeset {
    /// Commit index of the transaction that produced these changes.
    pub index: CommitIndex,
    /// Mutations in input order.
    pub changes: Vec<TableChange>,
}

impl Changeset {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}
