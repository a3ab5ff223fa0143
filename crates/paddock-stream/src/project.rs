//! Translation of one committed changeset into subscriber events.
//!
//! Projection runs synchronously in the committing writer's context against
//! the writer's own read view, so the rows it joins are exactly the rows the
//! transaction committed. It either returns the complete event batch for the
//! transaction or an error; partial batches are never handed downstream.

use std::collections::BTreeMap;

use paddock_types::{
    CatalogView, Changeset, CheckServiceNode, CommitIndex, Event, EventOp, HealthCheck, InstanceId,
    Node, NodeName, Payload, ServiceHealthUpdate, ServiceInstance, ServiceKind, ServiceName,
    TenancyScope, Topic,
};

use crate::classify::classify;
use crate::connect::connect_overlay;
use crate::error::ProjectionError;

/// Produces the subscriber events for one committed changeset.
///
/// Dirty nodes are processed first (each surviving one re-registers every
/// instance on it), then dirty instances, then the connect overlay for the
/// whole batch is appended. Within one batch events therefore arrive in node
/// pass, instance pass, overlay order; batches across transactions are
/// ordered by their commit index.
pub fn project_changes<V: CatalogView>(
    view: &V,
    changeset: &Changeset,
) -> Result<Vec<Event>, ProjectionError> {
    let dirty = classify(&changeset.changes);
    let index = changeset.index;
    let mut events = Vec::new();

    for (key, mutation) in &dirty.nodes {
        // A deleted node emits nothing of its own: its instances were
        // cascade-deleted in the same changeset and deregister below.
        if matches!(mutation, Some(change) if change.is_delete()) {
            continue;
        }
        let (scope, name) = key;
        register_node_instances(view, index, name, scope, &mut events)?;
    }

    for (key, mutation) in &dirty.instances {
        let (scope, node, id) = key;

        // Deletions go first: the deregistration must go out even when the
        // node row changed in the same transaction.
        if let Some(change) = mutation {
            if change.is_delete() {
                let before = change
                    .before
                    .as_ref()
                    .expect("a delete carries a before image");
                events.push(deregister(index, before));
                continue;
            }
        }

        // The node pass has already re-registered every instance on a dirty,
        // surviving node.
        let node_key = (scope.clone(), node.clone());
        if dirty.nodes.contains_key(&node_key) && !dirty.node_deleted(&node_key) {
            continue;
        }

        if let Some(change) = mutation {
            if let (Some(before), Some(after)) = (&change.before, &change.after) {
                if before.service != after.service {
                    // Subscribers on the old name must see the instance leave.
                    events.push(deregister(index, before));
                }
                if before.kind == ServiceKind::ConnectProxy
                    && before.proxy_destination != after.proxy_destination
                {
                    events.extend(retarget_deregister(index, before));
                }
            }
        }

        events.push(register_instance(view, index, node, id, scope)?);
    }

    let overlay = connect_overlay(&events);
    events.extend(overlay);

    if !events.is_empty() {
        tracing::debug!(
            index = %index,
            events = events.len(),
            "projected committed catalog changes"
        );
    }
    Ok(events)
}

/// Re-registers every instance currently on the node.
///
/// One checks listing is partitioned into the node-scoped prefix shared by
/// every instance and the per-instance service-scoped suffixes, so the node
/// is joined once however many instances it carries.
fn register_node_instances<V: CatalogView>(
    view: &V,
    index: CommitIndex,
    name: &NodeName,
    scope: &TenancyScope,
    events: &mut Vec<Event>,
) -> Result<(), ProjectionError> {
    let node = view.node(name, scope)?;
    let instances = view.instances_on_node(name, scope)?;
    if instances.is_empty() {
        return Ok(());
    }

    let mut node_checks: Vec<HealthCheck> = Vec::new();
    let mut instance_checks: BTreeMap<InstanceId, Vec<HealthCheck>> = BTreeMap::new();
    for check in view.checks_on_node(name, scope)? {
        match &check.instance {
            None => node_checks.push(check),
            Some(id) => instance_checks.entry(id.clone()).or_default().push(check),
        }
    }

    for instance in instances {
        let mut checks = node_checks.clone();
        if let Some(own) = instance_checks.get(&instance.id) {
            checks.extend(own.iter().cloned());
        }
        let key = instance.service.clone();
        events.push(health_event(
            index,
            EventOp::Register,
            key,
            CheckServiceNode {
                node: node.clone(),
                service: instance,
                checks,
            },
        ));
    }
    Ok(())
}

/// Registers one instance with its freshly joined health view.
fn register_instance<V: CatalogView>(
    view: &V,
    index: CommitIndex,
    node_name: &NodeName,
    id: &InstanceId,
    scope: &TenancyScope,
) -> Result<Event, ProjectionError> {
    let node = view.node(node_name, scope)?;
    let instance = view.instance(node_name, id, scope)?;
    let key = instance.service.clone();
    let value = check_service_node(view, node, instance)?;
    Ok(health_event(index, EventOp::Register, key, value))
}

/// Joins one (node, instance) pair with every check that applies to it,
/// node-scoped checks first.
pub(crate) fn check_service_node<V: CatalogView>(
    view: &V,
    node: Node,
    instance: ServiceInstance,
) -> Result<CheckServiceNode, ProjectionError> {
    let (mut checks, service_scoped): (Vec<HealthCheck>, Vec<HealthCheck>) = view
        .checks_on_node(&instance.node, &instance.scope)?
        .into_iter()
        .filter(|check| check.applies_to(&instance))
        .partition(HealthCheck::is_node_scoped);
    checks.extend(service_scoped);
    Ok(CheckServiceNode {
        node,
        service: instance,
        checks,
    })
}

/// The connect subscribers watching a proxy's old destination must see it
/// leave that key. Synthesises the before image's health event, derives its
/// connect twin, and flips the twin to a deregistration. The underlying
/// health event is discarded: the proxy still exists under its own service
/// name and re-registers normally.
fn retarget_deregister(index: CommitIndex, before: &ServiceInstance) -> Vec<Event> {
    let synthetic = health_event(
        index,
        EventOp::Register,
        before.service.clone(),
        minimal_value(before),
    );
    let mut overlay = connect_overlay(std::slice::from_ref(&synthetic));
    for event in &mut overlay {
        let Payload::ServiceHealth(update) = &mut event.payload;
        update.op = EventOp::Deregister;
    }
    overlay
}

fn deregister(index: CommitIndex, before: &ServiceInstance) -> Event {
    health_event(
        index,
        EventOp::Deregister,
        before.service.clone(),
        minimal_value(before),
    )
}

/// A deregistration payload: name-only node, the pre-mutation instance, no
/// checks.
fn minimal_value(instance: &ServiceInstance) -> CheckServiceNode {
    CheckServiceNode {
        node: Node::named(instance.node.clone(), instance.scope.clone()),
        service: instance.clone(),
        checks: Vec::new(),
    }
}

fn health_event(
    index: CommitIndex,
    op: EventOp,
    key: ServiceName,
    value: CheckServiceNode,
) -> Event {
    Event {
        topic: Topic::ServiceHealth,
        key,
        index,
        payload: Payload::ServiceHealth(ServiceHealthUpdate { op, value }),
    }
}
