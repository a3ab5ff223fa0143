//! Read contract between the catalog store and the event translation core.
//!
//! [`CatalogView`] is the point-in-time read surface the core projects from.
//! Two things implement it: read snapshots, and the committing writer's own
//! transaction (the projector must see the post-mutation rows before the
//! commit becomes visible to new readers).

use crate::catalog::{HealthCheck, Node, ServiceInstance};
use crate::ids::{CommitIndex, InstanceId, NodeName, ServiceName, TenancyScope};

/// Error surfaced by catalog reads.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("node {name} is not registered in scope {scope}")]
    MissingNode { name: NodeName, scope: TenancyScope },

    #[error("service instance {id} on node {node} is not registered in scope {scope}")]
    MissingService {
        node: NodeName,
        id: InstanceId,
        scope: TenancyScope,
    },
}

/// A consistent read view over the three catalog tables.
///
/// All listings return rows in the tables' sorted key order, so a given
/// store state always yields the same sequence. Rows are returned by value;
/// implementations never hand out references into their own tables.
pub trait CatalogView {
    /// The commit index this view reads at.
    fn index(&self) -> CommitIndex;

    /// Looks up a node by name.
    fn node(&self, name: &NodeName, scope: &TenancyScope) -> Result<Node, StoreError>;

    /// Looks up one service instance.
    fn instance(
        &self,
        node: &NodeName,
        id: &InstanceId,
        scope: &TenancyScope,
    ) -> Result<ServiceInstance, StoreError>;

    /// Every service instance currently registered on a node.
    fn instances_on_node(
        &self,
        node: &NodeName,
        scope: &TenancyScope,
    ) -> Result<Vec<ServiceInstance>, StoreError>;

    /// Every health check registered against a node, both node-scoped and
    /// service-scoped.
    fn checks_on_node(
        &self,
        node: &NodeName,
        scope: &TenancyScope,
    ) -> Result<Vec<HealthCheck>, StoreError>;

    /// Every instance of a service across all nodes, joined with its node row.
    fn instances_by_service(
        &self,
        service: &ServiceName,
        scope: &TenancyScope,
    ) -> Result<Vec<(Node, ServiceInstance)>, StoreError>;

    /// Every connect-reachable instance of a service: connect-native
    /// instances registered under the name, plus proxies whose destination
    /// is the name.
    fn connect_instances_by_service(
        &self,
        service: &ServiceName,
        scope: &TenancyScope,
    ) -> Result<Vec<(Node, ServiceInstance)>, StoreError>;
}
