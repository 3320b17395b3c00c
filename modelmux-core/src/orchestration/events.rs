//! Status Event Fan-out
//!
//! Synchronous observer list for provider status changes. Every subscriber
//! sees every event; a subscriber that errors or panics is logged and skipped
//! without affecting delivery to the others.

use crate::orchestration::status::ProviderState;
use serde::Serialize;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderEvent {
    StatusChanged {
        name: String,
        state: ProviderState,
        message: String,
    },
    /// A provider was added or removed
    ProvidersChanged,
}

pub type SubscriptionId = u64;

pub type Callback = Box<dyn FnMut(&ProviderEvent) -> anyhow::Result<()> + Send>;

#[derive(Default)]
pub struct EventHub {
    subscribers: Vec<(SubscriptionId, Callback)>,
    next_id: SubscriptionId,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&ProviderEvent) -> anyhow::Result<()> + Send + 'static,
    {
        self.next_id += 1;
        let id = self.next_id;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unregister(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        self.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Deliver `event` to every subscriber; returns how many handled it cleanly
    pub fn publish(&mut self, event: &ProviderEvent) -> usize {
        debug!(?event, subscribers = self.subscribers.len(), "publishing provider event");
        let mut delivered = 0;
        for (id, callback) in &mut self.subscribers {
            match catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(err)) => warn!(subscription = *id, error = %err, "status callback failed"),
                Err(_) => warn!(subscription = *id, "status callback panicked"),
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn status_event(state: ProviderState) -> ProviderEvent {
        ProviderEvent::StatusChanged {
            name: "p".into(),
            state,
            message: String::new(),
        }
    }

    #[test]
    fn failing_subscribers_do_not_block_others() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut hub = EventHub::new();
        hub.register(|_| anyhow::bail!("boom"));
        hub.register(|_| panic!("subscriber bug"));
        let sink = Arc::clone(&seen);
        hub.register(move |event| {
            sink.lock().unwrap().push(event.clone());
            Ok(())
        });

        let delivered = hub.publish(&status_event(ProviderState::Connected));
        assert_eq!(delivered, 1);
        assert_eq!(seen.lock().unwrap().len(), 1);

        // Still subscribed after failing once
        assert_eq!(hub.publish(&ProviderEvent::ProvidersChanged), 1);
        assert_eq!(hub.subscriber_count(), 3);
    }

    #[test]
    fn unregister_stops_delivery() {
        let count = Arc::new(Mutex::new(0));
        let mut hub = EventHub::new();
        let counter = Arc::clone(&count);
        let id = hub.register(move |_| {
            *counter.lock().unwrap() += 1;
            Ok(())
        });

        hub.publish(&ProviderEvent::ProvidersChanged);
        assert!(hub.unregister(id));
        assert!(!hub.unregister(id));
        hub.publish(&ProviderEvent::ProvidersChanged);
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let value = serde_json::to_value(status_event(ProviderState::Testing)).unwrap();
        assert_eq!(value["type"], "status_changed");
        assert_eq!(value["state"], "testing");
    }
}
