//! Committed catalog tables and the read queries over them.

use std::collections::BTreeMap;

use paddock_types::{
    CatalogView, CommitIndex, HealthCheck, InstanceId, Node, NodeName, ServiceInstance,
    ServiceKind, ServiceName, StoreError, TenancyScope,
};

pub(crate) type NodeKey = (TenancyScope, NodeName);
pub(crate) type ServiceKey = (TenancyScope, NodeName, InstanceId);
pub(crate) type CheckKey = (TenancyScope, NodeName, paddock_types::CheckId);

/// The three catalog tables plus the commit index, as one cloneable value.
///
/// `BTreeMap` keys give every listing a deterministic sorted order. Cloning
/// the whole state is how snapshots are taken; rows are plain values.
#[derive(Debug, Clone, Default)]
pub(crate) struct CatalogState {
    pub index: CommitIndex,
    pub nodes: BTreeMap<NodeKey, Node>,
    pub services: BTreeMap<ServiceKey, ServiceInstance>,
    pub checks: BTreeMap<CheckKey, HealthCheck>,
}

impl CatalogView for CatalogState {
    fn index(&self) -> CommitIndex {
        self.index
    }

    fn node(&self, name: &NodeName, scope: &TenancyScope) -> Result<Node, StoreError> {
        self.nodes
            .get(&(scope.clone(), name.clone()))
            .cloned()
            .ok_or_else(|| StoreError::MissingNode {
                name: name.clone(),
                scope: scope.clone(),
            })
    }

    fn instance(
        &self,
        node: &NodeName,
        id: &InstanceId,
        scope: &TenancyScope,
    ) -> Result<ServiceInstance, StoreError> {
        self.services
            .get(&(scope.clone(), node.clone(), id.clone()))
            .cloned()
            .ok_or_else(|| StoreError::MissingService {
                node: node.clone(),
                id: id.clone(),
                scope: scope.clone(),
            })
    }

    fn instances_on_node(
        &self,
        node: &NodeName,
        scope: &TenancyScope,
    ) -> Result<Vec<ServiceInstance>, StoreError> {
        Ok(self
            .services
            .values()
            .filter(|sn| sn.node == *node && sn.scope == *scope)
            .cloned()
            .collect())
    }

    fn checks_on_node(
        &self,
        node: &NodeName,
        scope: &TenancyScope,
    ) -> Result<Vec<HealthCheck>, StoreError> {
        Ok(self
            .checks
            .values()
            .filter(|check| check.node == *node && check.scope == *scope)
            .cloned()
            .collect())
    }

    fn instances_by_service(
        &self,
        service: &ServiceName,
        scope: &TenancyScope,
    ) -> Result<Vec<(Node, ServiceInstance)>, StoreError> {
        self.join_nodes(
            self.services
                .values()
                .filter(|sn| sn.service == *service && sn.scope == *scope),
        )
    }

    fn connect_instances_by_service(
        &self,
        service: &ServiceName,
        scope: &TenancyScope,
    ) -> Result<Vec<(Node, ServiceInstance)>, StoreError> {
        self.join_nodes(self.services.values().filter(|sn| {
            sn.scope == *scope
                && ((sn.connect_native && sn.service == *service)
                    || (sn.kind == ServiceKind::ConnectProxy
                        && sn.proxy_destination.as_ref() == Some(service)))
        }))
    }
}

impl CatalogState {
    /// Joins each instance with its node row. A service row without its node
    /// means the tables are inconsistent; the lookup error is surfaced.
    fn join_nodes<'a>(
        &self,
        instances: impl Iterator<Item = &'a ServiceInstance>,
    ) -> Result<Vec<(Node, ServiceInstance)>, StoreError> {
        instances
            .map(|sn| {
                let node = self.node(&sn.node, &sn.scope)?;
                Ok((node, sn.clone()))
            })
            .collect()
    }
}
