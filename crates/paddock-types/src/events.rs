//! Subscriber-visible events.
//!
//! An [`Event`] is the unit handed to the subscriber buffer: a topic, a
//! routing key, the commit index of the originating transaction, and a
//! tagged payload. The only payload shape today is [`ServiceHealthUpdate`];
//! the [`Payload`] enum leaves room for further shapes without touching the
//! envelope.

use serde::{Deserialize, Serialize};

use crate::catalog::{HealthCheck, Node, ServiceInstance};
use crate::ids::{CommitIndex, ServiceName};

/// The topics the catalog publishes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Topic {
    /// Health updates for every service instance, keyed by service name.
    ServiceHealth,
    /// Health updates for connect-enabled instances, keyed by the name the
    /// connect subscriber dials: the destination for proxies, the service
    /// name itself for connect-native instances.
    ServiceHealthConnect,
}

/// Whether an event announces or retracts an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventOp {
    Register,
    Deregister,
}

/// The projected join of a node, one of its service instances, and every
/// health check that applies to that instance.
///
/// Built by value at projection time; never holds references into the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckServiceNode {
    pub node: Node,
    pub service: ServiceInstance,
    /// Node-scoped checks of the instance's node, then the instance's own
    /// service-scoped checks. Empty for deregistrations.
    pub checks: Vec<HealthCheck>,
}

/// A register or deregister of one service instance with its full health view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHealthUpdate {
    pub op: EventOp,
    pub value: CheckServiceNode,
}

/// Tagged event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    ServiceHealth(ServiceHealthUpdate),
}

/// One event on the change feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub topic: Topic,
    /// Routing key subscribers filter on. Normally the instance's service
    /// name; rewritten to the proxy destination on the connect topic.
    pub key: ServiceName,
    pub index: CommitIndex,
    pub payload: Payload,
}

impl Event {
    /// The service-health payload, if that is what this event carries.
    pub fn service_health(&self) -> Option<&ServiceHealthUpdate> {
        match &self.payload {
            Payload::ServiceHealth(update) => Some(update),
        }
    }

    pub fn op(&self) -> Option<EventOp> {
        self.service_health().map(|update| update.op)
    }
}
