//! Derivation of connect-topic events from service-health events.

use paddock_types::{Event, ServiceKind, Topic};

/// Returns the events that must additionally be published on the connect
/// topic for the given batch.
///
/// Pure and idempotent: connect-topic inputs are skipped, so running the
/// overlay over a batch that already carries its own overlay appendix
/// produces the same appendix again, and running it over the appendix alone
/// produces nothing.
///
/// Proxies are re-keyed to the service they front; connect-native instances
/// keep their own key. A proxy row without a destination has nothing to be
/// dialled under and derives no event.
pub fn connect_overlay(events: &[Event]) -> Vec<Event> {
    let mut overlay = Vec::new();

    for event in events {
        if event.topic != Topic::ServiceHealth {
            continue;
        }
        let Some(update) = event.service_health() else {
            continue;
        };
        let instance = &update.value.service;
        if !instance.is_connect_enabled() {
            continue;
        }

        let mut derived = event.clone();
        derived.topic = Topic::ServiceHealthConnect;
        if instance.kind == ServiceKind::ConnectProxy {
            match &instance.proxy_destination {
                Some(destination) => derived.key = destination.clone(),
                None => continue,
            }
        }
        overlay.push(derived);
    }

    overlay
}
