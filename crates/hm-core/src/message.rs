//! Bus message types exchanged with the remote assistant

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::Context;

/// Bus topic (the message `type` on the wire)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    /// Create a new topic
    pub fn new(topic: impl Into<String>) -> Self {
        Self(topic.into())
    }

    /// Get the topic as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The topic a response to this request is published on
    pub fn response(&self) -> Self {
        Self(crate::topics::response(&self.0))
    }
}

impl From<&str> for Topic {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Topic {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&String> for Topic {
    fn from(s: &String) -> Self {
        Self::new(s.as_str())
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message on the assistant's bus
///
/// Serializes as `{"type": ..., "data": {...}, "context": {...}}`. Payload
/// accessors never fail: a missing or mistyped key yields the caller's default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Topic of the message
    #[serde(rename = "type")]
    pub msg_type: Topic,

    /// Payload
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,

    /// Routing context
    #[serde(default)]
    pub context: Context,
}

impl Message {
    /// Create a message with an object payload
    ///
    /// Non-object payloads are replaced by an empty object.
    pub fn new(msg_type: impl Into<Topic>, data: serde_json::Value) -> Self {
        let data = match data {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        Self {
            msg_type: msg_type.into(),
            data,
            context: Context::new(),
        }
    }

    /// Create a message with an empty payload
    pub fn empty(msg_type: impl Into<Topic>) -> Self {
        Self::new(msg_type, serde_json::Value::Null)
    }

    /// Replace the context
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    /// Get a raw payload value
    pub fn value(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key).filter(|v| !v.is_null())
    }

    /// Deserialize a payload value
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.value(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Boolean payload value, or `default` when missing or not a boolean
    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.value(key)
            .and_then(|v| v.as_bool())
            .unwrap_or(default)
    }

    /// String payload value, or `default` when missing or not a string
    pub fn str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.value(key)
            .and_then(|v| v.as_str())
            .unwrap_or(default)
    }

    /// Numeric payload value, or `default` when missing or not a number
    pub fn f64_or(&self, key: &str, default: f64) -> f64 {
        self.value(key)
            .and_then(|v| v.as_f64())
            .unwrap_or(default)
    }

    /// Integer payload value, if present
    pub fn i64(&self, key: &str) -> Option<i64> {
        self.value(key).and_then(|v| v.as_i64())
    }

    /// Serialize to the JSON wire form
    pub fn serialize(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_keys_fall_back() {
        let msg = Message::empty("mycroft.skills.is_alive.response");
        assert!(!msg.bool_or("status", false));
        assert_eq!(msg.str_or("mode", "wakeword"), "wakeword");
        assert_eq!(msg.f64_or("percent", 0.5), 0.5);
        assert_eq!(msg.i64("state"), None);
    }

    #[test]
    fn test_mistyped_keys_fall_back() {
        let msg = Message::new("x", json!({"status": "yes", "mode": 3, "percent": null}));
        assert!(!msg.bool_or("status", false));
        assert_eq!(msg.str_or("mode", "wakeword"), "wakeword");
        assert_eq!(msg.f64_or("percent", 0.5), 0.5);
    }

    #[test]
    fn test_wire_format() {
        let msg = Message::new("recognizer_loop:state.set", json!({"mode": "hybrid"}));
        let value: serde_json::Value = serde_json::from_str(&msg.serialize()).unwrap();
        assert_eq!(value["type"], "recognizer_loop:state.set");
        assert_eq!(value["data"]["mode"], "hybrid");
        assert!(value["context"].is_object());
    }

    #[test]
    fn test_parse_without_context() {
        let raw = r#"{"type": "mycroft.audio.is_speaking", "data": {"speaking": true}}"#;
        let msg: Message = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.msg_type.as_str(), "mycroft.audio.is_speaking");
        assert!(msg.bool_or("speaking", false));
        assert!(!msg.context.has_session());
    }

    #[test]
    fn test_response_topic() {
        let topic = Topic::new("system.ssh.status");
        assert_eq!(topic.response().as_str(), "system.ssh.status.response");
    }
}
