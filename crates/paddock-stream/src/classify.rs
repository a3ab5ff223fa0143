//! Reduction of a raw changeset to the rows whose health view went stale.
//!
//! A check mutation can never be projected on its own: subscribers receive
//! the full node+instance+checks join, so the join has to be recomputed for
//! every row the mutation touches. Classification boils the changeset down
//! to the nodes and instances that need that recomputation, keeping the row
//! mutation itself where one happened so the projector can tell deletions
//! and renames apart from mere check movement.

use std::collections::BTreeMap;

use paddock_types::{
    Change, HealthCheck, InstanceId, Node, NodeName, ServiceInstance, TableChange, TenancyScope,
};

/// Key of a dirty node: the scope disambiguates identical names across
/// tenants.
pub type NodeKey = (TenancyScope, NodeName);

/// Key of a dirty service instance.
pub type InstanceKey = (TenancyScope, NodeName, InstanceId);

/// The rows one changeset made stale.
///
/// A `None` value is a mark-only entry: the row itself did not change, but a
/// check touching it did. A `Some` value carries the row's own mutation. The
/// first recorded mutation wins; marks never displace a mutation.
#[derive(Debug, Default)]
pub struct DirtySets {
    pub nodes: BTreeMap<NodeKey, Option<Change<Node>>>,
    pub instances: BTreeMap<InstanceKey, Option<Change<ServiceInstance>>>,
}

impl DirtySets {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.instances.is_empty()
    }

    /// Whether the node's own row was deleted (as opposed to merely marked).
    pub fn node_deleted(&self, key: &NodeKey) -> bool {
        matches!(self.nodes.get(key), Some(Some(change)) if change.is_delete())
    }

    fn mark_node(&mut self, scope: &TenancyScope, name: &NodeName) {
        self.nodes
            .entry((scope.clone(), name.clone()))
            .or_insert(None);
    }

    fn record_node(&mut self, change: &Change<Node>) {
        let row = change.current();
        let slot = self
            .nodes
            .entry((row.scope.clone(), row.name.clone()))
            .or_insert(None);
        if slot.is_none() {
            *slot = Some(change.clone());
        }
    }

    fn mark_instance(&mut self, check: &HealthCheck, instance: &InstanceId) {
        self.instances
            .entry((check.scope.clone(), check.node.clone(), instance.clone()))
            .or_insert(None);
    }

    fn record_instance(&mut self, change: &Change<ServiceInstance>) {
        let row = change.current();
        let slot = self
            .instances
            .entry((row.scope.clone(), row.node.clone(), row.id.clone()))
            .or_insert(None);
        if slot.is_none() {
            *slot = Some(change.clone());
        }
    }
}

/// Classifies a committed changeset into dirty nodes and dirty instances.
pub fn classify(changes: &[TableChange]) -> DirtySets {
    let mut dirty = DirtySets::default();

    for change in changes {
        match change {
            TableChange::Node(change) => dirty.record_node(change),
            TableChange::Service(change) => dirty.record_instance(change),
            TableChange::Check(change) => classify_check(&mut dirty, change),
        }
    }

    dirty
}

fn classify_check(dirty: &mut DirtySets, change: &Change<HealthCheck>) {
    if change.is_update() {
        let (Some(before), Some(after)) = (&change.before, &change.after) else {
            return;
        };
        match (&before.instance, &after.instance) {
            // Service-scoped on both sides: the affected instance(s) need a
            // rebuild. A re-targeted check affects both its old and new
            // instance.
            (Some(old), Some(new)) => {
                dirty.mark_instance(after, new);
                if old != new {
                    dirty.mark_instance(before, old);
                }
            }
            // A node-scoped side means the check's reach crossed the whole
            // node on one side of the update; every instance on it must be
            // rebuilt.
            _ => {
                dirty.mark_node(&before.scope, &before.node);
                dirty.mark_node(&after.scope, &after.node);
            }
        }
        return;
    }

    // Creates and deletes are symmetric: the one row image that exists
    // decides the scope of the damage.
    let check = change.current();
    match &check.instance {
        None => dirty.mark_node(&check.scope, &check.node),
        Some(instance) => dirty.mark_instance(check, instance),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paddock_types::{CheckId, CheckStatus};

    fn scope() -> TenancyScope {
        TenancyScope::default()
    }

    fn node(name: &str) -> Node {
        Node::named(name.into(), scope())
    }

    fn instance(node: &str, id: &str, service: &str) -> ServiceInstance {
        ServiceInstance {
            node: node.into(),
            id: id.into(),
            service: service.into(),
            kind: paddock_types::ServiceKind::Typical,
            connect_native: false,
            proxy_destination: None,
            address: String::new(),
            port: 80,
            scope: scope(),
        }
    }

    fn check(node: &str, id: &str, instance: Option<&str>) -> HealthCheck {
        HealthCheck {
            node: node.into(),
            id: CheckId::from(id),
            instance: instance.map(InstanceId::from),
            status: CheckStatus::Passing,
            output: String::new(),
            scope: scope(),
        }
    }

    fn node_key(name: &str) -> NodeKey {
        (scope(), name.into())
    }

    fn instance_key(node: &str, id: &str) -> InstanceKey {
        (scope(), node.into(), id.into())
    }

    #[test]
    fn empty_changeset_classifies_to_nothing() {
        assert!(classify(&[]).is_empty());
    }

    #[test]
    fn node_and_service_mutations_are_recorded_with_their_change() {
        let dirty = classify(&[
            TableChange::Node(Change::create(node("n1"))),
            TableChange::Service(Change::delete(instance("n1", "web-1", "web"))),
        ]);

        assert!(matches!(
            dirty.nodes.get(&node_key("n1")),
            Some(Some(change)) if change.is_create()
        ));
        assert!(matches!(
            dirty.instances.get(&instance_key("n1", "web-1")),
            Some(Some(change)) if change.is_delete()
        ));
    }

    #[test]
    fn marks_never_displace_a_recorded_mutation() {
        let dirty = classify(&[
            TableChange::Node(Change::delete(node("n1"))),
            TableChange::Check(Change::delete(check("n1", "serf-health", None))),
        ]);
        assert!(dirty.node_deleted(&node_key("n1")));
    }

    #[test]
    fn a_mutation_upgrades_an_earlier_mark() {
        let dirty = classify(&[
            TableChange::Check(Change::delete(check("n1", "serf-health", None))),
            TableChange::Node(Change::delete(node("n1"))),
        ]);
        assert!(dirty.node_deleted(&node_key("n1")));
    }

    #[test]
    fn the_first_recorded_mutation_wins() {
        let first = Change::update(node("n1"), node("n1"));
        let dirty = classify(&[
            TableChange::Node(first),
            TableChange::Node(Change::delete(node("n1"))),
        ]);
        assert!(!dirty.node_deleted(&node_key("n1")));
    }

    #[test]
    fn service_scoped_check_update_marks_its_instance_only() {
        let before = check("n1", "web-http", Some("web-1"));
        let mut after = before.clone();
        after.status = CheckStatus::Critical;
        let dirty = classify(&[TableChange::Check(Change::update(before, after))]);

        assert!(dirty.nodes.is_empty());
        assert_eq!(
            dirty.instances.keys().collect::<Vec<_>>(),
            vec![&instance_key("n1", "web-1")]
        );
        assert!(dirty.instances[&instance_key("n1", "web-1")].is_none());
    }

    #[test]
    fn retargeted_check_marks_both_instances() {
        let before = check("n1", "probe", Some("web-1"));
        let mut after = before.clone();
        after.instance = Some("web-2".into());
        let dirty = classify(&[TableChange::Check(Change::update(before, after))]);

        assert!(dirty.nodes.is_empty());
        assert_eq!(dirty.instances.len(), 2);
        assert!(dirty.instances.contains_key(&instance_key("n1", "web-1")));
        assert!(dirty.instances.contains_key(&instance_key("n1", "web-2")));
    }

    #[test]
    fn scope_transition_marks_the_node() {
        let before = check("n1", "probe", Some("web-1"));
        let mut after = before.clone();
        after.instance = None;
        let dirty = classify(&[TableChange::Check(Change::update(before, after))]);

        assert!(dirty.instances.is_empty());
        assert!(dirty.nodes.contains_key(&node_key("n1")));
        assert!(dirty.nodes[&node_key("n1")].is_none());
    }

    #[test]
    fn check_create_and_delete_are_symmetric() {
        let created = classify(&[TableChange::Check(Change::create(check(
            "n1",
            "serf-health",
            None,
        )))]);
        let deleted = classify(&[TableChange::Check(Change::delete(check(
            "n1",
            "serf-health",
            None,
        )))]);
        assert!(created.nodes.contains_key(&node_key("n1")));
        assert!(deleted.nodes.contains_key(&node_key("n1")));

        let created = classify(&[TableChange::Check(Change::create(check(
            "n1",
            "web-http",
            Some("web-1"),
        )))]);
        assert!(created.instances.contains_key(&instance_key("n1", "web-1")));
        assert!(created.nodes.is_empty());
    }
}
