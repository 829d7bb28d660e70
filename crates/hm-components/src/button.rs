//! Buttons: reconnect and device system commands

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hm_core::{topics, Message, STATE_UNKNOWN};
use serde_json::json;
use tracing::{info, warn};

use crate::entity::{DeviceInfo, Entity, EntityBase, Platform};
use crate::projection::Projection;

/// A stateless action entity
///
/// The host records the time of the last press as the button's state.
#[async_trait]
pub trait ButtonEntity: Entity {
    async fn press(&self);

    fn last_pressed(&self) -> Option<DateTime<Utc>>;
}

fn pressed_state(last: Option<DateTime<Utc>>) -> String {
    last.map(|t| t.to_rfc3339())
        .unwrap_or_else(|| STATE_UNKNOWN.to_string())
}

/// Forces a fresh handshake with the HiveMind node
///
/// Usable while the connection is down, so it is always available.
pub struct ReconnectButton {
    pressed: Projection<Option<DateTime<Utc>>>,
}

impl ReconnectButton {
    pub fn new(base: EntityBase) -> Self {
        let unique_id = base.unique_id("hm-reconnect-button");
        Self {
            pressed: Projection::new(base, unique_id, None),
        }
    }
}

impl Entity for ReconnectButton {
    fn platform(&self) -> Platform {
        Platform::Button
    }

    fn name(&self) -> String {
        format!("hm-reconnect-button-{}", self.pressed.base().slug())
    }

    fn unique_id(&self) -> String {
        self.pressed.unique_id().to_string()
    }

    fn device_info(&self) -> DeviceInfo {
        self.pressed.base().device_info()
    }

    fn available(&self) -> bool {
        true
    }

    fn state(&self) -> String {
        pressed_state(self.last_pressed())
    }

    fn icon(&self) -> Option<&'static str> {
        Some("mdi:lan-pending")
    }
}

#[async_trait]
impl ButtonEntity for ReconnectButton {
    async fn press(&self) {
        let connection = self.pressed.base().connection();
        info!(
            connected = connection.is_available(),
            "HiveMind reconnect button pressed"
        );
        self.pressed.update(|last| *last = Some(Utc::now()));
        if let Err(e) = connection.reconnect().await {
            warn!(error = %e, "Reconnect failed, entities stay unavailable");
        }
    }

    fn last_pressed(&self) -> Option<DateTime<Utc>> {
        self.pressed.get()
    }
}

/// Fire-and-forget command sent to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemCommand {
    Reboot,
    Shutdown,
    RestartServices,
    Listen,
    Stop,
}

impl SystemCommand {
    pub const ALL: [SystemCommand; 5] = [
        SystemCommand::Reboot,
        SystemCommand::Shutdown,
        SystemCommand::RestartServices,
        SystemCommand::Listen,
        SystemCommand::Stop,
    ];

    pub fn topic(&self) -> &'static str {
        match self {
            SystemCommand::Reboot => topics::SYSTEM_REBOOT,
            SystemCommand::Shutdown => topics::SYSTEM_SHUTDOWN,
            SystemCommand::RestartServices => topics::SYSTEM_RESTART_SERVICE,
            SystemCommand::Listen => topics::MIC_LISTEN,
            SystemCommand::Stop => topics::STOP,
        }
    }

    fn key(&self) -> &'static str {
        match self {
            SystemCommand::Reboot => "reboot",
            SystemCommand::Shutdown => "shutdown",
            SystemCommand::RestartServices => "restart-services",
            SystemCommand::Listen => "listen",
            SystemCommand::Stop => "stop",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            SystemCommand::Reboot => "Reboot",
            SystemCommand::Shutdown => "Shutdown",
            SystemCommand::RestartServices => "Restart Services",
            SystemCommand::Listen => "Listen",
            SystemCommand::Stop => "Stop",
        }
    }

    fn icon(&self) -> &'static str {
        match self {
            SystemCommand::Reboot => "mdi:restart",
            SystemCommand::Shutdown => "mdi:power",
            SystemCommand::RestartServices => "mdi:cog-refresh",
            SystemCommand::Listen => "mdi:microphone",
            SystemCommand::Stop => "mdi:stop",
        }
    }
}

/// Emits one system command per press
pub struct SystemButton {
    pressed: Projection<Option<DateTime<Utc>>>,
    command: SystemCommand,
}

impl SystemButton {
    pub fn new(base: EntityBase, command: SystemCommand) -> Self {
        let unique_id = base.unique_id(&format!("hm-{}-button", command.key()));
        Self {
            pressed: Projection::new(base, unique_id, None),
            command,
        }
    }

    pub fn command(&self) -> SystemCommand {
        self.command
    }
}

impl Entity for SystemButton {
    fn platform(&self) -> Platform {
        Platform::Button
    }

    fn name(&self) -> String {
        self.pressed.base().display_name(self.command.label())
    }

    fn unique_id(&self) -> String {
        self.pressed.unique_id().to_string()
    }

    fn device_info(&self) -> DeviceInfo {
        self.pressed.base().device_info()
    }

    fn available(&self) -> bool {
        self.pressed.base().available()
    }

    fn state(&self) -> String {
        pressed_state(self.last_pressed())
    }

    fn icon(&self) -> Option<&'static str> {
        Some(self.command.icon())
    }

    fn attributes(&self) -> HashMap<String, serde_json::Value> {
        HashMap::from([("topic".to_string(), json!(self.command.topic()))])
    }
}

#[async_trait]
impl ButtonEntity for SystemButton {
    async fn press(&self) {
        self.pressed.update(|last| *last = Some(Utc::now()));
        self.pressed
            .base()
            .connection()
            .send_mycroft(Message::empty(self.command.topic()));
    }

    fn last_pressed(&self) -> Option<DateTime<Utc>> {
        self.pressed.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::StateNotifier;
    use hm_bus::{BusClient, Connection, LifecycleEvent, LoopbackClient};
    use std::sync::Arc;

    fn base(client: &Arc<LoopbackClient>) -> EntityBase {
        let connection = Connection::new(client.clone(), "office", "default");
        EntityBase::new("pi", connection, StateNotifier::new())
    }

    #[tokio::test]
    async fn test_system_buttons_emit_their_topic() {
        let client = Arc::new(LoopbackClient::new("localhost"));
        client.connect("office").await.unwrap();

        for command in SystemCommand::ALL {
            let button = SystemButton::new(base(&client), command);
            assert_eq!(button.state(), "unknown");
            button.press().await;
            assert!(button.last_pressed().is_some());
        }

        assert_eq!(
            client.emitted_topics(),
            vec![
                "system.reboot",
                "system.shutdown",
                "system.mycroft.service.restart",
                "mycroft.mic.listen",
                "mycroft.stop",
            ]
        );
    }

    #[tokio::test]
    async fn test_system_button_identity() {
        let client = Arc::new(LoopbackClient::new("localhost"));
        let button = SystemButton::new(base(&client), SystemCommand::RestartServices);
        assert_eq!(button.name(), "Restart Services (pi)");
        assert_eq!(button.unique_id(), "hm-restart-services-button-pi-office");
        assert!(!button.available());
    }

    #[tokio::test]
    async fn test_press_without_connection_still_records() {
        let client = Arc::new(LoopbackClient::new("localhost"));
        let button = SystemButton::new(base(&client), SystemCommand::Stop);
        button.press().await;
        assert!(button.last_pressed().is_some());
        assert!(client.emitted().is_empty());
    }

    #[tokio::test]
    async fn test_reconnect_button() {
        let client = Arc::new(LoopbackClient::new("localhost"));
        client.connect("office").await.unwrap();
        client.clear_lifecycle();
        let button = ReconnectButton::new(base(&client));

        assert_eq!(button.name(), "hm-reconnect-button-pi");
        assert_eq!(button.unique_id(), "hm-reconnect-button-pi-office");

        button.press().await;
        assert_eq!(
            client.lifecycle(),
            vec![
                LifecycleEvent::Closed,
                LifecycleEvent::SessionReset,
                LifecycleEvent::Connecting("office".to_string()),
                LifecycleEvent::Connected("office".to_string()),
            ]
        );
        assert!(client.is_handshake_complete());
        assert!(button.available());
    }
}
