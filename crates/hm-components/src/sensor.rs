//! Listener state sensor

use std::collections::HashMap;

use hm_core::topics;
use serde_json::json;

use crate::entity::{DeviceInfo, Entity, EntityBase, Platform};
use crate::projection::Projection;

const DEFAULT_LISTENER_STATE: &str = "wakeword";

#[derive(Debug, Clone, PartialEq, Eq)]
struct ListenerState {
    state: String,
    mode: String,
}

/// Current state and listening mode of the speech listener
///
/// `recognizer_loop:state` carries both fields; the sleep/awoken events
/// only move the state.
pub struct ListenerStateSensor {
    listener: Projection<ListenerState>,
}

impl ListenerStateSensor {
    pub fn new(base: EntityBase) -> Self {
        let unique_id = base.unique_id("hm-listener-state");
        let listener = Projection::new(
            base,
            unique_id,
            ListenerState {
                state: DEFAULT_LISTENER_STATE.to_string(),
                mode: DEFAULT_LISTENER_STATE.to_string(),
            },
        );

        listener.on(topics::LOOP_STATE, |current, msg| {
            current.state = msg.str_or("state", DEFAULT_LISTENER_STATE).to_string();
            current.mode = msg.str_or("mode", DEFAULT_LISTENER_STATE).to_string();
            true
        });
        listener.on(topics::LOOP_SLEEP, |current, _msg| {
            current.state = "sleeping".to_string();
            true
        });
        listener.on(topics::LOOP_AWOKEN, |current, _msg| {
            current.state = DEFAULT_LISTENER_STATE.to_string();
            true
        });

        Self { listener }
    }

    pub fn listener_state(&self) -> String {
        self.listener.read(|l| l.state.clone())
    }

    pub fn mode(&self) -> String {
        self.listener.read(|l| l.mode.clone())
    }
}

impl Entity for ListenerStateSensor {
    fn platform(&self) -> Platform {
        Platform::Sensor
    }

    fn name(&self) -> String {
        self.listener.base().display_name("Listener State")
    }

    fn unique_id(&self) -> String {
        self.listener.unique_id().to_string()
    }

    fn device_info(&self) -> DeviceInfo {
        self.listener.base().device_info()
    }

    fn available(&self) -> bool {
        self.listener.base().available()
    }

    fn state(&self) -> String {
        self.listener_state()
    }

    fn icon(&self) -> Option<&'static str> {
        Some("mdi:ear-hearing")
    }

    fn attributes(&self) -> HashMap<String, serde_json::Value> {
        HashMap::from([("mode".to_string(), json!(self.mode()))])
    }

    fn refresh(&self) {
        self.listener.request(topics::LOOP_STATE_GET);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::StateNotifier;
    use hm_bus::{BusClient, Connection, LoopbackClient};
    use hm_core::Message;
    use std::sync::Arc;

    async fn sensor() -> (Arc<LoopbackClient>, ListenerStateSensor) {
        let client = Arc::new(LoopbackClient::new("localhost"));
        client.connect("home").await.unwrap();
        let connection = Connection::new(client.clone(), "home", "default");
        let base = EntityBase::new("dev", connection, StateNotifier::new());
        (client, ListenerStateSensor::new(base))
    }

    #[tokio::test]
    async fn test_full_status_sets_both_fields() {
        let (client, sensor) = sensor().await;
        client.deliver(Message::new(
            topics::LOOP_STATE,
            json!({"state": "recording", "mode": "continuous"}),
        ));
        assert_eq!(sensor.state(), "recording");
        assert_eq!(sensor.snapshot().attribute::<String>("mode"), Some("continuous".to_string()));
    }

    #[tokio::test]
    async fn test_sleep_and_awoken_move_state_only() {
        let (client, sensor) = sensor().await;
        client.deliver(Message::new(topics::LOOP_STATE, json!({"mode": "hybrid"})));

        client.deliver(Message::empty(topics::LOOP_SLEEP));
        assert_eq!(sensor.listener_state(), "sleeping");
        assert_eq!(sensor.mode(), "hybrid");

        client.deliver(Message::empty(topics::LOOP_AWOKEN));
        assert_eq!(sensor.listener_state(), "wakeword");
    }

    #[tokio::test]
    async fn test_refresh_requests_state() {
        let (client, sensor) = sensor().await;
        sensor.refresh();
        assert_eq!(client.emitted_topics(), vec!["recognizer_loop:state.get"]);
        assert_eq!(sensor.unique_id(), "hm-listener-state-dev-home");
    }
}
