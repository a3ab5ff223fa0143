//! Identifier newtypes and tenancy partitioning.
//!
//! All identifiers are lightweight `String` newtypes. They exist for type
//! safety at the seams: a check id can never be passed where a node name is
//! expected, and dirty-set keys sort deterministically.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

// ============================================================================
// Commit index
// ============================================================================

/// Monotonically increasing index of a committed catalog transaction.
///
/// Every event produced by a projection carries the index of the transaction
/// that committed the mutations; snapshot events carry the index of the
/// snapshot read. Subscribers resume live streaming at `index + 1`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct CommitIndex(u64);

impl CommitIndex {
    pub const ZERO: CommitIndex = CommitIndex(0);

    pub fn new(index: u64) -> Self {
        Self(index)
    }

    /// Returns the index as a `u64`.
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns the index of the next committed transaction.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl Display for CommitIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CommitIndex {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<CommitIndex> for u64 {
    fn from(index: CommitIndex) -> Self {
        index.0
    }
}

// ============================================================================
// Tenancy
// ============================================================================

/// Opaque partition identifier disambiguating otherwise-identical
/// identifiers across tenants.
///
/// Routing between scopes is the caller's concern; the catalog treats the
/// scope as part of every row identity and every lookup key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TenancyScope {
    pub partition: String,
    pub namespace: String,
}

impl TenancyScope {
    pub fn new(partition: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            namespace: namespace.into(),
        }
    }
}

impl Default for TenancyScope {
    fn default() -> Self {
        Self::new("default", "default")
    }
}

impl Display for TenancyScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.partition, self.namespace)
    }
}

// ============================================================================
// String identifiers
// ============================================================================

/// Name of a catalog node. Unique within a [`TenancyScope`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeName(String);

impl NodeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for NodeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeName {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for NodeName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Name of a service. The routing key subscribers filter on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ServiceName(String);

impl ServiceName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ServiceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ServiceName {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for ServiceName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identifier of one service instance on one node.
///
/// An instance is identified by (node, instance id, scope); the same id may
/// appear on different nodes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for InstanceId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for InstanceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identifier of a health check. Unique per (node, scope).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CheckId(String);

impl CheckId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CheckId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CheckId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for CheckId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
