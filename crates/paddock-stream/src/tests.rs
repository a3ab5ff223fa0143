//! End-to-end tests: a subscriber that applies the snapshot and then every
//! projected batch must converge on the same state a fresh snapshot shows.

use std::collections::BTreeMap;

use paddock_store::{Catalog, Commit};
use paddock_types::{
    CheckId, CheckServiceNode, CheckStatus, CommitIndex, Event, EventOp, HealthCheck, InstanceId,
    Node, NodeName, ServiceInstance, ServiceKind, TenancyScope, Topic,
};

use crate::project_changes;
use crate::sink::BufferSink;
use crate::snapshot::{CancelToken, SubscriptionRequest, snapshot};

// ============================================================================
// Test helpers
// ============================================================================

fn scope() -> TenancyScope {
    TenancyScope::default()
}

fn node(name: &str) -> Node {
    Node {
        name: name.into(),
        address: "10.0.0.1".to_owned(),
        meta: BTreeMap::new(),
        scope: scope(),
    }
}

fn instance(node: &str, id: &str, service: &str) -> ServiceInstance {
    ServiceInstance {
        node: node.into(),
        id: id.into(),
        service: service.into(),
        kind: ServiceKind::Typical,
        connect_native: false,
        proxy_destination: None,
        address: String::new(),
        port: 80,
        scope: scope(),
    }
}

fn proxy(node: &str, id: &str, service: &str, destination: &str) -> ServiceInstance {
    ServiceInstance {
        kind: ServiceKind::ConnectProxy,
        proxy_destination: Some(destination.into()),
        ..instance(node, id, service)
    }
}

fn check(node: &str, id: &str, instance: Option<&str>, status: CheckStatus) -> HealthCheck {
    HealthCheck {
        node: node.into(),
        id: CheckId::from(id),
        instance: instance.map(InstanceId::from),
        status,
        output: String::new(),
        scope: scope(),
    }
}

/// A subscriber's materialised state: instance identity -> latest payload.
type SubscriberView = BTreeMap<(TenancyScope, NodeName, InstanceId), CheckServiceNode>;

fn apply_event(view: &mut SubscriberView, event: &Event, topic: Topic, key: &str) {
    if event.topic != topic || event.key.as_str() != key {
        return;
    }
    let update = event.service_health().unwrap();
    let sn = &update.value.service;
    let identity = (sn.scope.clone(), sn.node.clone(), sn.id.clone());
    match update.op {
        EventOp::Register => {
            view.insert(identity, update.value.clone());
        }
        EventOp::Deregister => {
            view.remove(&identity);
        }
    }
}

fn snapshot_view(catalog: &Catalog, topic: Topic, key: &str) -> (CommitIndex, SubscriberView) {
    let read = catalog.read();
    let request = SubscriptionRequest {
        topic,
        key: key.into(),
        scope: scope(),
        cancel: CancelToken::new(),
    };
    let mut sink = BufferSink::new();
    let index = snapshot(&read, &request, &mut sink).unwrap();

    let mut view = SubscriberView::new();
    for event in sink.events() {
        apply_event(&mut view, event, topic, key);
    }
    (index, view)
}

fn apply_commit(views: &mut [(&mut SubscriberView, Topic, &str)], commit: &Commit) {
    let events = project_changes(commit, &commit.changeset).unwrap();
    for event in &events {
        assert_eq!(event.index, commit.changeset.index);
        for (view, topic, key) in views.iter_mut() {
            apply_event(view, event, *topic, key);
        }
    }
}

fn seeded() -> Catalog {
    let catalog = Catalog::new();
    let mut txn = catalog.write();
    for name in ["n1", "n2"] {
        txn.upsert_node(node(name));
    }
    txn.upsert_service(instance("n1", "web-1", "web")).unwrap();
    txn.upsert_service(instance("n2", "web-2", "web")).unwrap();
    txn.upsert_service(instance("n1", "api-1", "api")).unwrap();
    txn.upsert_service(proxy("n1", "web-proxy", "web-sidecar", "web"))
        .unwrap();
    txn.upsert_check(check("n1", "serf", None, CheckStatus::Passing))
        .unwrap();
    txn.upsert_check(check("n1", "web-http", Some("web-1"), CheckStatus::Passing))
        .unwrap();
    txn.upsert_check(check("n2", "serf", None, CheckStatus::Passing))
        .unwrap();
    txn.commit();
    catalog
}

// ============================================================================
// Convergence
// ============================================================================

#[test]
fn snapshot_plus_event_stream_converges_on_a_fresh_snapshot() {
    let catalog = seeded();

    let (start, mut health) = snapshot_view(&catalog, Topic::ServiceHealth, "web");
    let (_, mut connect) = snapshot_view(&catalog, Topic::ServiceHealthConnect, "web");
    assert_eq!(health.len(), 2);
    assert_eq!(connect.len(), 1);

    let mut last = start;
    let mut commits = Vec::new();

    // A burst of unrelated and related mutations across several commits.
    let mut txn = catalog.write();
    txn.upsert_node(node("n3"));
    txn.upsert_service(instance("n3", "web-3", "web")).unwrap();
    commits.push(txn.commit());

    let mut txn = catalog.write();
    txn.upsert_check(check("n1", "serf", None, CheckStatus::Critical))
        .unwrap();
    commits.push(txn.commit());

    let mut txn = catalog.write();
    txn.upsert_service(instance("n1", "web-1", "web-canary"))
        .unwrap();
    commits.push(txn.commit());

    let mut txn = catalog.write();
    txn.upsert_service(proxy("n1", "web-proxy", "web-sidecar", "api"))
        .unwrap();
    commits.push(txn.commit());

    let mut txn = catalog.write();
    txn.delete_node(&"n2".into(), &scope()).unwrap();
    commits.push(txn.commit());

    let mut txn = catalog.write();
    txn.upsert_check(check("n3", "web-http", Some("web-3"), CheckStatus::Warning))
        .unwrap();
    commits.push(txn.commit());

    for commit in &commits {
        assert!(commit.changeset.index > last);
        last = commit.changeset.index;
        apply_commit(
            &mut [
                (&mut health, Topic::ServiceHealth, "web"),
                (&mut connect, Topic::ServiceHealthConnect, "web"),
            ],
            commit,
        );
    }

    let (end, fresh_health) = snapshot_view(&catalog, Topic::ServiceHealth, "web");
    let (_, fresh_connect) = snapshot_view(&catalog, Topic::ServiceHealthConnect, "web");
    assert_eq!(end, last);
    assert_eq!(health, fresh_health);
    assert_eq!(connect, fresh_connect);

    // The rename and the node deletion removed two of the three registered
    // web instances; the proxy left the connect key when it re-targeted.
    assert_eq!(health.len(), 1);
    assert!(health.keys().any(|(_, _, id)| id.as_str() == "web-3"));
    assert!(connect.is_empty());
}

#[test]
fn projected_events_carry_the_wire_envelope() {
    let catalog = seeded();
    let mut txn = catalog.write();
    txn.upsert_service(instance("n2", "web-2", "web")).unwrap();
    let commit = txn.commit();

    let events = project_changes(&commit, &commit.changeset).unwrap();
    let json = serde_json::to_value(&events[0]).unwrap();
    assert_eq!(json["topic"], "ServiceHealth");
    assert_eq!(json["key"], "web");
    assert_eq!(json["index"], commit.changeset.index.as_u64());
    let update = &json["payload"]["ServiceHealth"];
    assert_eq!(update["op"], "Register");
    assert_eq!(update["value"]["service"]["id"], "web-2");
    assert!(update["value"]["checks"].is_array());
}

#[test]
fn quiet_commits_produce_no_events_for_anyone() {
    let catalog = seeded();
    let commit = catalog.write().commit();
    assert!(commit.changeset.is_empty());
    assert!(project_changes(&commit, &commit.changeset).unwrap().is_empty());
}

#[test]
fn a_subscriber_on_the_new_name_sees_the_rename_arrive() {
    let catalog = seeded();
    let (_, mut canary) = snapshot_view(&catalog, Topic::ServiceHealth, "web-canary");
    assert!(canary.is_empty());

    let mut txn = catalog.write();
    txn.upsert_service(instance("n1", "web-1", "web-canary"))
        .unwrap();
    let commit = txn.commit();
    apply_commit(
        &mut [(&mut canary, Topic::ServiceHealth, "web-canary")],
        &commit,
    );

    let (_, fresh) = snapshot_view(&catalog, Topic::ServiceHealth, "web-canary");
    assert_eq!(canary, fresh);
    assert_eq!(canary.len(), 1);
}
