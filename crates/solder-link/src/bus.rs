//! The event sink.
//!
//! Handlers subscribe by event-name prefix (`"message"` matches
//! `message.group` and `message.private`; the empty prefix matches
//! everything). A handler may answer an event with a quick-operation
//! payload, which the connection relays back to the peer as a
//! `handle_quick_operation` call.

use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use solder_model::Event;

/// Identifier of one event subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

type Handler = Arc<dyn Fn(&Event) -> Option<Value> + Send + Sync>;

struct Listener {
    id: Uuid,
    prefix: String,
    handler: Handler,
}

/// Registry of event handlers for one connection.
#[derive(Default)]
pub struct EventBus {
    listeners: Mutex<Vec<Listener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for events whose name matches `prefix`.
    ///
    /// The handler's return value, if any, is relayed as a quick
    /// operation.
    pub fn subscribe<F>(&self, prefix: impl Into<String>, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) -> Option<Value> + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        self.listeners.lock().push(Listener {
            id,
            prefix: prefix.into(),
            handler: Arc::new(handler),
        });
        SubscriptionId(id)
    }

    /// Removes a subscription. Returns whether it existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|listener| listener.id != id.0);
        listeners.len() != before
    }

    /// Delivers `event` to every matching handler, collecting the
    /// quick-operation payloads they produce.
    ///
    /// Handlers run outside the registry lock, so they may themselves
    /// subscribe or unsubscribe.
    pub fn dispatch(&self, event: &Event) -> Vec<Value> {
        let matching: Vec<Handler> = {
            let listeners = self.listeners.lock();
            listeners
                .iter()
                .filter(|listener| name_matches(&listener.prefix, event.name()))
                .map(|listener| Arc::clone(&listener.handler))
                .collect()
        };

        matching
            .iter()
            .filter_map(|handler| handler(event))
            .collect()
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Whether no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.lock().is_empty()
    }
}

fn name_matches(prefix: &str, name: &str) -> bool {
    if prefix.is_empty() || prefix == name {
        return true;
    }
    name.strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(name_parts: Value) -> Event {
        Event::from_value(name_parts).unwrap()
    }

    #[test]
    fn prefix_matching() {
        assert!(name_matches("", "message.group"));
        assert!(name_matches("message", "message.group"));
        assert!(name_matches("message.group", "message.group"));
        assert!(!name_matches("message.private", "message.group"));
        assert!(!name_matches("mess", "message.group"));
    }

    #[test]
    fn dispatch_reaches_matching_handlers() {
        let bus = EventBus::new();
        bus.subscribe("message", |_| Some(json!({"reply": "hi"})));
        bus.subscribe("notice", |_| Some(json!({"never": true})));
        bus.subscribe("", |_| None);

        let ops = bus.dispatch(&event(json!({
            "post_type": "message",
            "message_type": "private",
        })));
        assert_eq!(ops, vec![json!({"reply": "hi"})]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let id = bus.subscribe("", |_| Some(json!(1)));
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));

        let ops = bus.dispatch(&event(json!({"post_type": "notice", "notice_type": "poke"})));
        assert!(ops.is_empty());
        assert!(bus.is_empty());
    }

    #[test]
    fn handlers_may_mutate_the_bus() {
        let bus = Arc::new(EventBus::new());
        let inner = Arc::clone(&bus);
        bus.subscribe("meta_event", move |_| {
            inner.subscribe("message", |_| None);
            None
        });

        bus.dispatch(&event(json!({
            "post_type": "meta_event",
            "meta_event_type": "heartbeat",
        })));
        assert_eq!(bus.len(), 2);
    }
}
