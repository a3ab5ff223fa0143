//! Snapshot production for new subscribers.
//!
//! A new subscriber first receives the current state of its subscription as
//! a stream of register events, then follows live projected batches from
//! the returned index onwards.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use paddock_types::{
    CatalogView, CommitIndex, Event, EventOp, EventSink, Payload, ServiceHealthUpdate,
    ServiceName, TenancyScope, Topic,
};

use crate::error::ProjectionError;
use crate::project::check_service_node;

/// Signal a subscriber trips to abandon its snapshot early.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// What a new subscriber asked to follow.
#[derive(Debug, Clone)]
pub struct SubscriptionRequest {
    pub topic: Topic,
    /// The name the subscriber dials. On the connect topic this is already
    /// the destination, so snapshot events need no key rewriting.
    pub key: ServiceName,
    pub scope: TenancyScope,
    pub cancel: CancelToken,
}

/// Streams the current state of a subscription into the sink, one event at
/// a time, and returns the commit index the snapshot read at. Live
/// streaming resumes at the next index.
///
/// The snapshot is never materialised whole: each event goes to the sink as
/// it is built, and the sink may block for backpressure. The cancel signal
/// is checked between emissions.
pub fn snapshot<V: CatalogView, S: EventSink>(
    view: &V,
    request: &SubscriptionRequest,
    sink: &mut S,
) -> Result<CommitIndex, ProjectionError> {
    let index = view.index();
    let instances = match request.topic {
        Topic::ServiceHealth => view.instances_by_service(&request.key, &request.scope)?,
        Topic::ServiceHealthConnect => {
            view.connect_instances_by_service(&request.key, &request.scope)?
        }
    };

    let mut emitted = 0_usize;
    for (node, instance) in instances {
        if request.cancel.is_cancelled() {
            return Err(ProjectionError::Cancelled);
        }
        let value = check_service_node(view, node, instance)?;
        let event = Event {
            topic: request.topic,
            key: request.key.clone(),
            index,
            payload: Payload::ServiceHealth(ServiceHealthUpdate {
                op: EventOp::Register,
                value,
            }),
        };
        sink.append(std::slice::from_ref(&event))?;
        emitted += 1;
    }

    tracing::debug!(
        topic = ?request.topic,
        key = %request.key,
        index = %index,
        events = emitted,
        "materialised subscription snapshot"
    );
    Ok(index)
}
