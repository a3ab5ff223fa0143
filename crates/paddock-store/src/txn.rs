//! The catalog handle and its transactions.

use std::sync::{Mutex, MutexGuard, RwLock};

use paddock_types::{
    CatalogView, Change, Changeset, CheckId, CommitIndex, HealthCheck, InstanceId, Node, NodeName,
    ServiceInstance, ServiceName, StoreError, TableChange, TenancyScope,
};

use crate::state::CatalogState;

/// Shared handle to the catalog tables.
///
/// Reads snapshot the committed state and run concurrently; writes serialise
/// on an internal writer lock so at most one transaction commits at a time.
#[derive(Debug, Default)]
pub struct Catalog {
    state: RwLock<CatalogState>,
    writer: Mutex<()>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a point-in-time read transaction over the committed state.
    ///
    /// The snapshot is immutable; dropping it aborts the read.
    pub fn read(&self) -> ReadTxn {
        let state = self
            .state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        ReadTxn { state }
    }

    /// Opens the single write transaction, blocking until any other writer
    /// commits or aborts.
    pub fn write(&self) -> WriteTxn<'_> {
        let guard = self
            .writer
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let state = self
            .state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        WriteTxn {
            catalog: self,
            _writer: guard,
            state,
            changes: Vec::new(),
        }
    }
}

/// A read-only snapshot of the committed catalog.
#[derive(Debug)]
pub struct ReadTxn {
    state: CatalogState,
}

/// The committing writer's transaction.
///
/// Mutations apply to a working copy of the tables and are recorded with
/// their before/after images in input order. Dropping the transaction
/// without calling [`commit`](Self::commit) aborts it.
#[derive(Debug)]
pub struct WriteTxn<'a> {
    catalog: &'a Catalog,
    _writer: MutexGuard<'a, ()>,
    state: CatalogState,
    changes: Vec<TableChange>,
}

impl WriteTxn<'_> {
    /// Creates or replaces a node row.
    pub fn upsert_node(&mut self, node: Node) {
        let key = (node.scope.clone(), node.name.clone());
        let before = self.state.nodes.insert(key, node.clone());
        self.changes.push(TableChange::Node(Change {
            before,
            after: Some(node),
        }));
    }

    /// Deletes a node and everything registered on it.
    ///
    /// Cascaded service and check deletions are recorded as their own
    /// changes, before the node's.
    pub fn delete_node(&mut self, name: &NodeName, scope: &TenancyScope) -> Result<(), StoreError> {
        if !self.state.nodes.contains_key(&(scope.clone(), name.clone())) {
            return Err(StoreError::MissingNode {
                name: name.clone(),
                scope: scope.clone(),
            });
        }

        let instances: Vec<InstanceId> = self
            .state
            .services
            .values()
            .filter(|sn| sn.node == *name && sn.scope == *scope)
            .map(|sn| sn.id.clone())
            .collect();
        for id in instances {
            self.delete_service(name, &id, scope)?;
        }

        // Whatever checks remain on the node are node-scoped.
        let checks: Vec<CheckId> = self
            .state
            .checks
            .values()
            .filter(|check| check.node == *name && check.scope == *scope)
            .map(|check| check.id.clone())
            .collect();
        for id in checks {
            self.delete_check(name, &id, scope);
        }

        let before = self.state.nodes.remove(&(scope.clone(), name.clone()));
        self.changes.push(TableChange::Node(Change {
            before,
            after: None,
        }));
        Ok(())
    }

    /// Creates or replaces a service instance. Its node must be registered.
    pub fn upsert_service(&mut self, instance: ServiceInstance) -> Result<(), StoreError> {
        if !self
            .state
            .nodes
            .contains_key(&(instance.scope.clone(), instance.node.clone()))
        {
            return Err(StoreError::MissingNode {
                name: instance.node.clone(),
                scope: instance.scope.clone(),
            });
        }
        let key = (
            instance.scope.clone(),
            instance.node.clone(),
            instance.id.clone(),
        );
        let before = self.state.services.insert(key, instance.clone());
        self.changes.push(TableChange::Service(Change {
            before,
            after: Some(instance),
        }));
        Ok(())
    }

    /// Deletes a service instance and its service-scoped checks.
    pub fn delete_service(
        &mut self,
        node: &NodeName,
        id: &InstanceId,
        scope: &TenancyScope,
    ) -> Result<(), StoreError> {
        let key = (scope.clone(), node.clone(), id.clone());
        if !self.state.services.contains_key(&key) {
            return Err(StoreError::MissingService {
                node: node.clone(),
                id: id.clone(),
                scope: scope.clone(),
            });
        }

        let checks: Vec<CheckId> = self
            .state
            .checks
            .values()
            .filter(|check| {
                check.node == *node && check.scope == *scope && check.instance.as_ref() == Some(id)
            })
            .map(|check| check.id.clone())
            .collect();
        for check_id in checks {
            self.delete_check(node, &check_id, scope);
        }

        let before = self.state.services.remove(&key);
        self.changes.push(TableChange::Service(Change {
            before,
            after: None,
        }));
        Ok(())
    }

    /// Creates or replaces a health check. The node - and for service-scoped
    /// checks, the instance - must be registered.
    pub fn upsert_check(&mut self, check: HealthCheck) -> Result<(), StoreError> {
        if !self
            .state
            .nodes
            .contains_key(&(check.scope.clone(), check.node.clone()))
        {
            return Err(StoreError::MissingNode {
                name: check.node.clone(),
                scope: check.scope.clone(),
            });
        }
        if let Some(instance) = &check.instance {
            let key = (check.scope.clone(), check.node.clone(), instance.clone());
            if !self.state.services.contains_key(&key) {
                return Err(StoreError::MissingService {
                    node: check.node.clone(),
                    id: instance.clone(),
                    scope: check.scope.clone(),
                });
            }
        }
        let key = (check.scope.clone(), check.node.clone(), check.id.clone());
        let before = self.state.checks.insert(key, check.clone());
        self.changes.push(TableChange::Check(Change {
            before,
            after: Some(check),
        }));
        Ok(())
    }

    /// Deletes a health check. Deleting an absent check is a no-op, so
    /// deregistration paths stay idempotent.
    pub fn delete_check(&mut self, node: &NodeName, id: &CheckId, scope: &TenancyScope) {
        let key = (scope.clone(), node.clone(), id.clone());
        if let Some(before) = self.state.checks.remove(&key) {
            self.changes.push(TableChange::Check(Change {
                before: Some(before),
                after: None,
            }));
        }
    }

    /// Commits the staged mutations, publishing them atomically to new
    /// readers, and returns the changeset together with the writer's own
    /// read view of the committed transaction.
    ///
    /// Repeated mutations to one row collapse into a single change carrying
    /// the transaction-wide before/after images; a row created and deleted
    /// inside the transaction leaves no change at all.
    pub fn commit(mut self) -> Commit {
        let index = self.state.index.next();
        self.state.index = index;
        let changes = coalesce(std::mem::take(&mut self.changes));

        let mut committed = self
            .catalog
            .state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        debug_assert_eq!(
            committed.index.next(),
            index,
            "writer lock must serialise commits"
        );
        *committed = self.state.clone();
        drop(committed);

        tracing::debug!(
            index = %index,
            changes = changes.len(),
            "committed catalog transaction"
        );

        Commit {
            changeset: Changeset { index, changes },
            state: self.state,
        }
    }
}

/// Identity of the row a change targets. The scope is part of every key.
#[derive(Debug, PartialEq, Eq, Hash)]
enum RowKey {
    Node(crate::state::NodeKey),
    Service(crate::state::ServiceKey),
    Check(crate::state::CheckKey),
}

fn row_key(change: &TableChange) -> RowKey {
    match change {
        TableChange::Node(change) => {
            let row = change.current();
            RowKey::Node((row.scope.clone(), row.name.clone()))
        }
        TableChange::Service(change) => {
            let row = change.current();
            RowKey::Service((row.scope.clone(), row.node.clone(), row.id.clone()))
        }
        TableChange::Check(change) => {
            let row = change.current();
            RowKey::Check((row.scope.clone(), row.node.clone(), row.id.clone()))
        }
    }
}

/// Collapses repeated changes to one row into a single change, keeping the
/// first before image and the last after image, in first-touch order.
fn coalesce(changes: Vec<TableChange>) -> Vec<TableChange> {
    let mut positions: std::collections::HashMap<RowKey, usize> = std::collections::HashMap::new();
    let mut merged: Vec<TableChange> = Vec::new();

    for change in changes {
        match positions.entry(row_key(&change)) {
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(merged.len());
                merged.push(change);
            }
            std::collections::hash_map::Entry::Occupied(slot) => {
                match (&mut merged[*slot.get()], change) {
                    (TableChange::Node(prev), TableChange::Node(next)) => prev.after = next.after,
                    (TableChange::Service(prev), TableChange::Service(next)) => {
                        prev.after = next.after;
                    }
                    (TableChange::Check(prev), TableChange::Check(next)) => prev.after = next.after,
                    _ => unreachable!("changes under one row key target one table"),
                }
            }
        }
    }

    merged.retain(|change| match change {
        TableChange::Node(c) => c.before.is_some() || c.after.is_some(),
        TableChange::Service(c) => c.before.is_some() || c.after.is_some(),
        TableChange::Check(c) => c.before.is_some() || c.after.is_some(),
    });
    merged
}

/// A committed transaction: its changeset plus the read view it committed
/// under.
///
/// The view is frozen at the commit, so projecting events from it stays
/// consistent with the changeset even while later writers commit.
#[derive(Debug)]
pub struct Commit {
    pub changeset: Changeset,
    state: CatalogState,
}

// Forwarding impls: snapshots and commits expose the same read surface.

macro_rules! forward_catalog_view {
    ($ty:ty) => {
        impl CatalogView for $ty {
            fn index(&self) -> CommitIndex {
                self.state.index()
            }

            fn node(&self, name: &NodeName, scope: &TenancyScope) -> Result<Node, StoreError> {
                self.state.node(name, scope)
            }

            fn instance(
                &self,
                node: &NodeName,
                id: &InstanceId,
                scope: &TenancyScope,
            ) -> Result<ServiceInstance, StoreError> {
                self.state.instance(node, id, scope)
            }

            fn instances_on_node(
                &self,
                node: &NodeName,
                scope: &TenancyScope,
            ) -> Result<Vec<ServiceInstance>, StoreError> {
                self.state.instances_on_node(node, scope)
            }

            fn checks_on_node(
                &self,
                node: &NodeName,
                scope: &TenancyScope,
            ) -> Result<Vec<HealthCheck>, StoreError> {
                self.state.checks_on_node(node, scope)
            }

            fn instances_by_service(
                &self,
                service: &ServiceName,
                scope: &TenancyScope,
            ) -> Result<Vec<(Node, ServiceInstance)>, StoreError> {
                self.state.instances_by_service(service, scope)
            }

            fn connect_instances_by_service(
                &self,
                service: &ServiceName,
                scope: &TenancyScope,
            ) -> Result<Vec<(Node, ServiceInstance)>, StoreError> {
                self.state.connect_instances_by_service(service, scope)
            }
        }
    };
}

forward_catalog_view!(ReadTxn);
forward_catalog_view!(Commit);
