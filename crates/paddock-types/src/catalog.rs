//! Catalog rows: nodes, service instances, and health checks.
//!
//! These are the three tables the translation core reads. Rows are plain
//! values; the store hands out copies, never references into its own tables.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{CheckId, InstanceId, NodeName, ServiceName, TenancyScope};

/// A registered node (machine or host) in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: NodeName,
    pub address: String,
    pub meta: BTreeMap<String, String>,
    pub scope: TenancyScope,
}

impl Node {
    /// A node record carrying only its identity.
    ///
    /// Deregistration payloads are permitted to omit address and metadata;
    /// subscribers key on the name alone.
    pub fn named(name: NodeName, scope: TenancyScope) -> Self {
        Self {
            name,
            address: String::new(),
            meta: BTreeMap::new(),
            scope,
        }
    }
}

/// The kind of a service instance.
///
/// `ConnectProxy` instances front another service; their events are routed
/// on the connect topic under the destination's name. Further kinds (mesh
/// gateways, ingress) slot in here as new variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ServiceKind {
    #[default]
    Typical,
    ConnectProxy,
}

/// One instance of a service registered on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstance {
    pub node: NodeName,
    pub id: InstanceId,
    pub service: ServiceName,
    pub kind: ServiceKind,
    /// The instance speaks the connect protocol natively (no sidecar).
    pub connect_native: bool,
    /// The service a connect proxy fronts. `Some` iff kind is `ConnectProxy`.
    pub proxy_destination: Option<ServiceName>,
    pub address: String,
    pub port: u16,
    pub scope: TenancyScope,
}

impl ServiceInstance {
    /// Whether events for this instance also belong on the connect topic.
    pub fn is_connect_enabled(&self) -> bool {
        self.kind == ServiceKind::ConnectProxy || self.connect_native
    }
}

/// Health status of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckStatus {
    Passing,
    Warning,
    Critical,
}

/// A health check registered against a node or a single service instance.
///
/// `instance: None` makes the check node-scoped: it applies to every service
/// instance on the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub node: NodeName,
    pub id: CheckId,
    pub instance: Option<InstanceId>,
    pub status: CheckStatus,
    pub output: String,
    pub scope: TenancyScope,
}

impl HealthCheck {
    /// Whether the check applies to every instance on its node.
    pub fn is_node_scoped(&self) -> bool {
        self.instance.is_none()
    }

    /// Whether the check applies to the given service instance.
    ///
    /// Node-scoped checks apply to all instances on their node; service-scoped
    /// checks only to the instance they name.
    pub fn applies_to(&self, instance: &ServiceInstance) -> bool {
        self.node == instance.node
            && self.scope == instance.scope
            && match &self.instance {
                None => true,
                Some(id) => *id == instance.id,
            }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn instance(node: &str, id: &str) -> ServiceInstance {
        ServiceInstance {
            node: node.into(),
            id: id.into(),
            service: "web".into(),
            kind: ServiceKind::Typical,
            connect_native: false,
            proxy_destination: None,
            address: "10.0.0.1".to_owned(),
            port: 8080,
            scope: TenancyScope::default(),
        }
    }

    fn check(node: &str, id: &str, instance: Option<&str>) -> HealthCheck {
        HealthCheck {
            node: node.into(),
            id: id.into(),
            instance: instance.map(InstanceId::from),
            status: CheckStatus::Passing,
            output: String::new(),
            scope: TenancyScope::default(),
        }
    }

    #[test]
    fn node_scoped_check_applies_to_every_instance_on_its_node() {
        let serf = check("n1", "serf-health", None);
        assert!(serf.is_node_scoped());
        assert!(serf.applies_to(&instance("n1", "web-1")));
        assert!(serf.applies_to(&instance("n1", "api-1")));
        assert!(!serf.applies_to(&instance("n2", "web-1")));
    }

    #[test]
    fn service_scoped_check_applies_only_to_its_instance() {
        let c = check("n1", "web-http", Some("web-1"));
        assert!(!c.is_node_scoped());
        assert!(c.applies_to(&instance("n1", "web-1")));
        assert!(!c.applies_to(&instance("n1", "web-2")));
    }

    #[test]
    fn checks_do_not_cross_tenancy_scopes() {
        let mut other = instance("n1", "web-1");
        other.scope = TenancyScope::new("team-a", "prod");
        assert!(!check("n1", "serf-health", None).applies_to(&other));
    }

    #[test_case(ServiceKind::Typical, false => false; "typical instance")]
    #[test_case(ServiceKind::Typical, true => true; "connect native")]
    #[test_case(ServiceKind::ConnectProxy, false => true; "proxy")]
    #[test_case(ServiceKind::ConnectProxy, true => true; "native proxy")]
    fn connect_eligibility(kind: ServiceKind, native: bool) -> bool {
        let mut sn = instance("n1", "web-1");
        sn.kind = kind;
        sn.connect_native = native;
        if kind == ServiceKind::ConnectProxy {
            sn.proxy_destination = Some("web".into());
        }
        sn.is_connect_enabled()
    }
}
