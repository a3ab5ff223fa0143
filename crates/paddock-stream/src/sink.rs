//! In-memory subscriber buffer.

use paddock_types::{Event, EventSink, SinkError};

/// Unbounded in-memory sink that collects appended batches.
///
/// Stands in for the subscriber buffer ring in tests and embeddings. A
/// closed buffer rejects further appends the way a departed subscriber
/// would.
#[derive(Debug, Default)]
pub struct BufferSink {
    events: Vec<Event>,
    closed: bool,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects all future appends with [`SinkError::Closed`].
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSink for BufferSink {
    fn append(&mut self, events: &[Event]) -> Result<(), SinkError> {
        if self.closed {
            return Err(SinkError::Closed);
        }
        self.events.extend_from_slice(events);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paddock_types::{
        CheckServiceNode, CommitIndex, EventOp, Node, Payload, ServiceHealthUpdate,
        ServiceInstance, ServiceKind, TenancyScope, Topic,
    };

    fn event(key: &str) -> Event {
        let scope = TenancyScope::default();
        Event {
            topic: Topic::ServiceHealth,
            key: key.into(),
            index: CommitIndex::new(1),
            payload: Payload::ServiceHealth(ServiceHealthUpdate {
                op: EventOp::Register,
                value: CheckServiceNode {
                    node: Node::named("n1".into(), scope.clone()),
                    service: ServiceInstance {
                        node: "n1".into(),
                        id: "i1".into(),
                        service: key.into(),
                        kind: ServiceKind::Typical,
                        connect_native: false,
                        proxy_destination: None,
                        address: String::new(),
                        port: 80,
                        scope,
                    },
                    checks: Vec::new(),
                },
            }),
        }
    }

    #[test]
    fn appended_batches_accumulate_in_order() {
        let mut sink = BufferSink::new();
        assert!(sink.is_empty());
        sink.append(&[event("a"), event("b")]).unwrap();
        sink.append(&[event("c")]).unwrap();
        assert_eq!(sink.len(), 3);
        let keys: Vec<&str> = sink.events().iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn closed_sink_rejects_appends() {
        let mut sink = BufferSink::new();
        sink.append(&[event("a")]).unwrap();
        sink.close();
        assert!(matches!(
            sink.append(&[event("b")]),
            Err(SinkError::Closed)
        ));
        // Nothing from the rejected batch is visible.
        assert_eq!(sink.len(), 1);
    }
}
