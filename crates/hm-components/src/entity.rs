//! Shared entity surface
//!
//! Every bridged entity exposes the same read surface to the host (name,
//! unique id, device, availability, state) and signals the host through a
//! `StateNotifier` when it should re-read that surface.

use std::collections::HashMap;
use std::fmt;

use hm_bus::Connection;
use hm_core::{EntityState, DOMAIN, STATE_UNAVAILABLE};
use serde::Serialize;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::trace;

/// Default channel capacity for state refresh notifications
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Manufacturer reported for every bridged device
pub const MANUFACTURER: &str = "JarbasAI";

/// Model reported for every bridged device
pub const MODEL: &str = "HiveMindBus";

/// Host entity platforms the bridge provides entities for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    BinarySensor,
    Sensor,
    Button,
    Switch,
    Select,
    MediaPlayer,
    Notify,
}

impl Platform {
    /// Every platform, in setup order
    pub const ALL: [Platform; 7] = [
        Platform::Notify,
        Platform::BinarySensor,
        Platform::Sensor,
        Platform::Button,
        Platform::Switch,
        Platform::Select,
        Platform::MediaPlayer,
    ];

    /// Platform domain as the host names it
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::BinarySensor => "binary_sensor",
            Platform::Sensor => "sensor",
            Platform::Button => "button",
            Platform::Switch => "switch",
            Platform::Select => "select",
            Platform::MediaPlayer => "media_player",
            Platform::Notify => "notify",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device all entities of one entry are grouped under
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// (domain, id) pairs identifying the device
    pub identifiers: Vec<(String, String)>,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
}

/// "Please re-read" signal sent to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateRefresh {
    Entity(String),
    /// Availability moved for every entity of an entry
    All,
}

/// Fire-and-forget channel from entities to the host
#[derive(Debug, Clone)]
pub struct StateNotifier {
    sender: broadcast::Sender<StateRefresh>,
}

impl StateNotifier {
    /// Create a notifier with the default channel capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a notifier with the given channel capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Receive refresh notifications
    pub fn subscribe(&self) -> broadcast::Receiver<StateRefresh> {
        self.sender.subscribe()
    }

    /// Ask the host to re-read an entity
    pub fn schedule_update(&self, unique_id: &str) {
        trace!(unique_id = %unique_id, "Scheduling state update");
        // Ignore send errors - they just mean nobody is listening
        let _ = self.sender.send(StateRefresh::Entity(unique_id.to_string()));
    }

    /// Ask the host to re-read every entity
    pub fn schedule_update_all(&self) {
        trace!("Scheduling state update for all entities");
        let _ = self.sender.send(StateRefresh::All);
    }
}

impl Default for StateNotifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity and plumbing shared by every entity of an entry
#[derive(Debug, Clone)]
pub struct EntityBase {
    slug: String,
    connection: Connection,
    notifier: StateNotifier,
}

impl EntityBase {
    /// `name` is the device name; spaces become dashes
    pub fn new(name: &str, connection: Connection, notifier: StateNotifier) -> Self {
        Self {
            slug: name.replace(' ', "-"),
            connection,
            notifier,
        }
    }

    /// Device name with spaces replaced by dashes
    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn site_id(&self) -> &str {
        self.connection.site_id()
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn notifier(&self) -> &StateNotifier {
        &self.notifier
    }

    /// `{prefix}-{slug}-{site}` with all spaces removed
    pub fn unique_id(&self, prefix: &str) -> String {
        format!("{}-{}-{}", prefix, self.slug, self.site_id()).replace(' ', "")
    }

    /// `{label} ({slug})`
    pub fn display_name(&self, label: &str) -> String {
        format!("{} ({})", label, self.slug)
    }

    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            identifiers: vec![(
                DOMAIN.to_string(),
                format!("{}-{}-{}", self.slug, self.site_id(), self.connection.host()),
            )],
            name: self.slug.clone(),
            manufacturer: MANUFACTURER.to_string(),
            model: MODEL.to_string(),
        }
    }

    /// Derived from the handshake flag on every read
    pub fn available(&self) -> bool {
        self.connection.is_available()
    }
}

/// Read surface of a bridged entity
pub trait Entity: Send + Sync {
    fn platform(&self) -> Platform;

    fn name(&self) -> String;

    fn unique_id(&self) -> String;

    fn device_info(&self) -> DeviceInfo;

    fn available(&self) -> bool;

    /// State value when available
    fn state(&self) -> String;

    fn icon(&self) -> Option<&'static str> {
        None
    }

    fn device_class(&self) -> Option<&'static str> {
        None
    }

    /// Platform specific attributes
    fn attributes(&self) -> HashMap<String, serde_json::Value> {
        HashMap::new()
    }

    /// Request fresh state from the device
    ///
    /// Returns immediately; the answer, if any, arrives through the entity's
    /// topic handlers.
    fn refresh(&self) {}

    /// Current state as the host should record it
    fn snapshot(&self) -> EntityState {
        let mut attributes = self.attributes();
        attributes.insert("friendly_name".to_string(), json!(self.name()));
        if let Some(icon) = self.icon() {
            attributes.insert("icon".to_string(), json!(icon));
        }
        if let Some(class) = self.device_class() {
            attributes.insert("device_class".to_string(), json!(class));
        }

        let state = if self.available() {
            self.state()
        } else {
            STATE_UNAVAILABLE.to_string()
        };
        EntityState::new(self.unique_id(), state, attributes)
    }
}

/// "on"/"off" state string
pub(crate) fn on_off(on: bool) -> String {
    if on { "on" } else { "off" }.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hm_bus::LoopbackClient;
    use std::sync::Arc;

    fn base(name: &str) -> EntityBase {
        let client = Arc::new(LoopbackClient::new("10.0.0.5"));
        let connection = Connection::new(client, "living room", "default");
        EntityBase::new(name, connection, StateNotifier::new())
    }

    #[test]
    fn test_identity() {
        let base = base("Mark 2");
        assert_eq!(base.slug(), "Mark-2");
        assert_eq!(base.unique_id("hm-ssh-switch"), "hm-ssh-switch-Mark-2-livingroom");
        assert_eq!(base.display_name("SSH Service"), "SSH Service (Mark-2)");
    }

    #[test]
    fn test_device_info() {
        let info = base("Mark 2").device_info();
        assert_eq!(
            info.identifiers,
            vec![("hivemind".to_string(), "Mark-2-living room-10.0.0.5".to_string())]
        );
        assert_eq!(info.name, "Mark-2");
        assert_eq!(info.manufacturer, "JarbasAI");
        assert_eq!(info.model, "HiveMindBus");
    }

    #[tokio::test]
    async fn test_notifier_delivers_and_tolerates_no_listeners() {
        let notifier = StateNotifier::new();
        notifier.schedule_update("nobody-listening");

        let mut rx = notifier.subscribe();
        notifier.schedule_update("hm-sleep-switch-dev-home");
        let refresh = rx.recv().await.unwrap();
        assert_eq!(refresh, StateRefresh::Entity("hm-sleep-switch-dev-home".to_string()));

        notifier.schedule_update_all();
        assert_eq!(rx.recv().await.unwrap(), StateRefresh::All);
    }

    #[test]
    fn test_platform_names() {
        assert_eq!(Platform::MediaPlayer.to_string(), "media_player");
        assert_eq!(Platform::ALL.len(), 7);
    }
}
