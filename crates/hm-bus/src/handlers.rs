//! Topic dispatch table
//!
//! Maps a topic to the handlers subscribed to it. Delivery is sequential: a
//! message is handed to each subscriber in turn and every handler runs to
//! completion before the next one starts. Handlers must be short and must not
//! block. The order in which subscribers of the same topic are called is not
//! part of the contract.

use dashmap::DashMap;
use hm_core::{Message, Topic};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Callback invoked for every message on a subscribed topic
pub type MessageHandler = Arc<dyn Fn(&Message) + Send + Sync>;

/// A unique identifier for a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Topic → handlers table
pub struct HandlerTable {
    handlers: DashMap<Topic, Vec<(ListenerId, MessageHandler)>>,
    next_listener_id: AtomicU64,
}

impl HandlerTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
            next_listener_id: AtomicU64::new(1),
        }
    }

    /// Subscribe a handler to a topic
    pub fn subscribe(&self, topic: impl Into<Topic>, handler: MessageHandler) -> ListenerId {
        let topic = topic.into();
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::SeqCst));
        trace!(topic = %topic, ?id, "Subscribing handler");

        self.handlers.entry(topic).or_default().push((id, handler));
        id
    }

    /// Remove a subscription
    ///
    /// Returns false if the listener was not subscribed.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut removed = false;
        self.handlers.retain(|_, subscribers| {
            let before = subscribers.len();
            subscribers.retain(|(listener, _)| *listener != id);
            removed |= subscribers.len() != before;
            !subscribers.is_empty()
        });
        removed
    }

    /// Deliver a message to every handler subscribed to its topic
    ///
    /// Returns the number of handlers invoked.
    pub fn dispatch(&self, message: &Message) -> usize {
        // Copy the subscriber list out so handlers may subscribe while running
        let subscribers: Vec<MessageHandler> = match self.handlers.get(&message.msg_type) {
            Some(entry) => entry.iter().map(|(_, h)| h.clone()).collect(),
            None => {
                trace!(topic = %message.msg_type, "No handlers for topic");
                return 0;
            }
        };

        debug!(topic = %message.msg_type, handlers = subscribers.len(), "Dispatching message");
        for handler in &subscribers {
            handler(message);
        }
        subscribers.len()
    }

    /// Number of handlers subscribed to a topic
    pub fn handler_count(&self, topic: &str) -> usize {
        self.handlers
            .get(&Topic::from(topic))
            .map(|s| s.len())
            .unwrap_or(0)
    }

    /// Number of topics with at least one handler
    pub fn topic_count(&self) -> usize {
        self.handlers.len()
    }
}

impl Default for HandlerTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> MessageHandler) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let make = move |tag: &str| -> MessageHandler {
            let seen = seen_clone.clone();
            let tag = tag.to_string();
            Arc::new(move |msg: &Message| {
                seen.lock()
                    .unwrap()
                    .push(format!("{}:{}", tag, msg.msg_type));
            })
        };
        (seen, make)
    }

    #[test]
    fn test_dispatch_to_matching_topic_only() {
        let table = HandlerTable::new();
        let (seen, make) = recorder();
        table.subscribe("system.ssh.enabled", make("ssh"));
        table.subscribe("mycroft.volume.mute", make("mute"));

        let invoked = table.dispatch(&Message::empty("system.ssh.enabled"));

        assert_eq!(invoked, 1);
        assert_eq!(*seen.lock().unwrap(), vec!["ssh:system.ssh.enabled"]);
    }

    #[test]
    fn test_multiple_subscribers_same_topic() {
        let table = HandlerTable::new();
        let (seen, make) = recorder();
        table.subscribe("recognizer_loop:state", make("select"));
        table.subscribe("recognizer_loop:state", make("sleep"));

        let msg = Message::new("recognizer_loop:state", json!({"state": "sleeping"}));
        assert_eq!(table.dispatch(&msg), 2);

        let mut seen = seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(
            seen,
            vec!["select:recognizer_loop:state", "sleep:recognizer_loop:state"]
        );
    }

    #[test]
    fn test_unsubscribe() {
        let table = HandlerTable::new();
        let (seen, make) = recorder();
        let id = table.subscribe("mycroft.stop", make("a"));

        assert!(table.unsubscribe(id));
        assert!(!table.unsubscribe(id));
        assert_eq!(table.dispatch(&Message::empty("mycroft.stop")), 0);
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(table.topic_count(), 0);
    }

    #[test]
    fn test_handler_may_subscribe_during_dispatch() {
        let table = Arc::new(HandlerTable::new());
        let inner = table.clone();
        table.subscribe(
            "outer",
            Arc::new(move |_msg: &Message| {
                inner.subscribe("inner", Arc::new(|_msg: &Message| {}));
            }),
        );

        table.dispatch(&Message::empty("outer"));
        assert_eq!(table.handler_count("inner"), 1);
    }

    #[test]
    fn test_listener_id_uniqueness() {
        let table = HandlerTable::new();
        let a = table.subscribe("t", Arc::new(|_msg: &Message| {}));
        let b = table.subscribe("t", Arc::new(|_msg: &Message| {}));
        assert_ne!(a, b);
        assert_eq!(table.handler_count("t"), 2);
    }
}
