//! Listening mode select

use async_trait::async_trait;
use hm_core::{topics, Message};
use serde_json::json;
use tracing::warn;

use crate::entity::{DeviceInfo, Entity, EntityBase, Platform};
use crate::projection::Projection;

/// Modes the speech listener can run in
pub const LISTENING_MODES: [&str; 3] = ["wakeword", "continuous", "hybrid"];

const DEFAULT_MODE: &str = "wakeword";

/// An entity with a fixed set of options
#[async_trait]
pub trait SelectEntity: Entity {
    fn current_option(&self) -> String;

    fn options(&self) -> Vec<String>;

    async fn select_option(&self, option: &str);
}

/// Selects how the device listens for commands
pub struct ListeningModeSelect {
    mode: Projection<String>,
}

impl ListeningModeSelect {
    pub fn new(base: EntityBase) -> Self {
        let unique_id = base.unique_id("hm-listen-mode");
        let mode = Projection::new(base, unique_id, DEFAULT_MODE.to_string());

        // "sleeping" is a listener state, not a mode the user can pick
        mode.on(topics::LOOP_STATE, |current, msg| {
            let reported = msg.str_or("mode", DEFAULT_MODE);
            if reported == "sleeping" {
                return false;
            }
            *current = reported.to_string();
            true
        });

        Self { mode }
    }
}

impl Entity for ListeningModeSelect {
    fn platform(&self) -> Platform {
        Platform::Select
    }

    fn name(&self) -> String {
        self.mode.base().display_name("Listening Mode")
    }

    fn unique_id(&self) -> String {
        self.mode.unique_id().to_string()
    }

    fn device_info(&self) -> DeviceInfo {
        self.mode.base().device_info()
    }

    fn available(&self) -> bool {
        self.mode.base().available()
    }

    fn state(&self) -> String {
        self.current_option()
    }

    fn icon(&self) -> Option<&'static str> {
        Some(self.mode.read(|mode| match mode.as_str() {
            "hybrid" => "mdi:microphone-plus",
            "continuous" => "mdi:microphone-settings",
            _ => "mdi:microphone-message",
        }))
    }

    fn refresh(&self) {
        self.mode.request(topics::LOOP_STATE_GET);
    }
}

#[async_trait]
impl SelectEntity for ListeningModeSelect {
    fn current_option(&self) -> String {
        self.mode.get()
    }

    fn options(&self) -> Vec<String> {
        LISTENING_MODES.iter().map(|m| m.to_string()).collect()
    }

    async fn select_option(&self, option: &str) {
        if !LISTENING_MODES.contains(&option) {
            warn!(
                option = %option,
                unique_id = %self.mode.unique_id(),
                "Rejected unknown listening mode"
            );
            return;
        }

        self.mode.update(|mode| *mode = option.to_string());
        self.mode.base().connection().send_mycroft(Message::new(
            topics::LOOP_STATE_SET,
            json!({ "mode": option }),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::StateNotifier;
    use hm_bus::{BusClient, Connection, LoopbackClient};
    use std::sync::Arc;

    async fn select() -> (Arc<LoopbackClient>, ListeningModeSelect) {
        let client = Arc::new(LoopbackClient::new("localhost"));
        client.connect("home").await.unwrap();
        let connection = Connection::new(client.clone(), "home", "default");
        let base = EntityBase::new("dev", connection, StateNotifier::new());
        (client, ListeningModeSelect::new(base))
    }

    #[tokio::test]
    async fn test_select_emits_and_echoes() {
        let (client, select) = select().await;
        select.select_option("continuous").await;

        assert_eq!(select.current_option(), "continuous");
        let sent = client.sent_mycroft();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].msg_type.as_str(), "recognizer_loop:state.set");
        assert_eq!(sent[0].str_or("mode", ""), "continuous");
        assert_eq!(select.icon(), Some("mdi:microphone-settings"));
    }

    #[tokio::test]
    async fn test_unknown_option_is_rejected() {
        let (client, select) = select().await;
        select.select_option("telepathy").await;
        assert_eq!(select.current_option(), "wakeword");
        assert!(client.emitted().is_empty());
    }

    #[tokio::test]
    async fn test_sleeping_mode_is_ignored() {
        let (client, select) = select().await;
        client.deliver(Message::new(topics::LOOP_STATE, json!({"mode": "hybrid"})));
        client.deliver(Message::new(topics::LOOP_STATE, json!({"mode": "sleeping"})));
        assert_eq!(select.current_option(), "hybrid");

        client.deliver(Message::new(topics::LOOP_STATE, json!({"state": "recording"})));
        assert_eq!(select.current_option(), "wakeword");
    }

    #[tokio::test]
    async fn test_options_and_identity() {
        let (_client, select) = select().await;
        assert_eq!(select.options(), vec!["wakeword", "continuous", "hybrid"]);
        assert_eq!(select.name(), "Listening Mode (dev)");
        assert_eq!(select.unique_id(), "hm-listen-mode-dev-home");
    }
}
