//! # paddock-types: Core types for Paddock
//!
//! This crate contains the shared types used across the Paddock system:
//! - Identifier newtypes ([`NodeName`], [`ServiceName`], [`InstanceId`], [`CheckId`])
//! - Tenancy partitioning ([`TenancyScope`])
//! - Commit tracking ([`CommitIndex`])
//! - Catalog rows ([`Node`], [`ServiceInstance`], [`HealthCheck`])
//! - Committed changesets ([`Change`], [`TableChange`], [`Changeset`])
//! - Subscriber events ([`Topic`], [`Event`], [`CheckServiceNode`])
//! - Store read contract ([`CatalogView`], [`StoreError`])
//! - Subscriber buffer contract ([`EventSink`], [`SinkError`])
//!
//! Everything that crosses a crate or wire boundary lives here, so the store
//! and the event translation core agree on one vocabulary without depending
//! on each other.

pub mod catalog;
pub mod changes;
pub mod events;
pub mod ids;
pub mod sink;
pub mod view;

pub use catalog::{CheckStatus, HealthCheck, Node, ServiceInstance, ServiceKind};
pub use changes::{Change, Changeset, TableChange};
pub use events::{CheckServiceNode, Event, EventOp, Payload, ServiceHealthUpdate, Topic};
pub use ids::{CheckId, CommitIndex, InstanceId, NodeName, ServiceName, TenancyScope};
pub use sink::{EventSink, SinkError};
pub use view::{CatalogView, StoreError};
