//! Notifications spoken by the device

use chrono::{DateTime, Utc};
use hm_core::{topics, HiveMessage, Message, STATE_UNKNOWN};
use serde_json::json;
use tracing::trace;

use crate::entity::{DeviceInfo, Entity, EntityBase, Platform};
use crate::projection::Projection;

/// Speaks notifications through the device's text-to-speech
pub struct Notifier {
    sent: Projection<Option<DateTime<Utc>>>,
}

impl Notifier {
    pub fn new(base: EntityBase) -> Self {
        let unique_id = base.unique_id("hm-notify");
        Self {
            sent: Projection::new(base, unique_id, None),
        }
    }

    /// Speak `message`, preceded by `title` when one is given
    pub async fn send_message(&self, message: &str, title: Option<&str>) {
        self.sent.update(|last| *last = Some(Utc::now()));
        if let Some(title) = title.filter(|t| !t.is_empty()) {
            self.speak(title);
        }
        self.speak(message);
    }

    pub fn last_sent(&self) -> Option<DateTime<Utc>> {
        self.sent.get()
    }

    fn speak(&self, utterance: &str) {
        let payload = HiveMessage::bus(Message::new(
            topics::SPEAK,
            json!({ "utterance": utterance }),
        ));
        trace!(payload = %payload.serialize(), "HiveMind message");
        self.sent.base().connection().send(payload);
    }
}

impl Entity for Notifier {
    fn platform(&self) -> Platform {
        Platform::Notify
    }

    fn name(&self) -> String {
        format!("hm-notify-{}", self.sent.base().slug())
    }

    fn unique_id(&self) -> String {
        self.sent.unique_id().to_string()
    }

    fn device_info(&self) -> DeviceInfo {
        self.sent.base().device_info()
    }

    fn available(&self) -> bool {
        self.sent.base().available()
    }

    fn state(&self) -> String {
        self.last_sent()
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| STATE_UNKNOWN.to_string())
    }

    fn icon(&self) -> Option<&'static str> {
        Some("mdi:robot-outline")
    }
}
