//! Test harness for HiveMind integration tests
//!
//! `TestHive` sets up one entry against a loopback client and records every
//! entity state in a state store, the way a host would.

use std::sync::Arc;
use std::time::Duration;

use hm_bus::LoopbackClient;
use hm_components::{setup_entry, EntityStateStore, HiveMindIntegration};
use hm_config::HiveMindConfig;
use hm_core::{Message, Topic};
use serde_json::Value;

pub const SITE: &str = "kitchen";
pub const NAME: &str = "Mark 2";

/// A set-up entry with its loopback client and state store
pub struct TestHive {
    pub client: Arc<LoopbackClient>,
    pub integration: HiveMindIntegration,
    pub store: Arc<EntityStateStore>,
}

impl TestHive {
    /// Set up a connected entry using OCP commands
    pub async fn new() -> Self {
        Self::with_config(config()).await
    }

    /// Set up a connected entry using the legacy audio service
    #[allow(dead_code)]
    pub async fn legacy() -> Self {
        Self::with_config(config().with_legacy_audio(true)).await
    }

    pub async fn with_config(config: HiveMindConfig) -> Self {
        Self::with_client(config, Arc::new(LoopbackClient::new("10.0.0.5"))).await
    }

    pub async fn with_client(config: HiveMindConfig, client: Arc<LoopbackClient>) -> Self {
        let integration = setup_entry(config, client.clone())
            .await
            .expect("setup should succeed");
        let store = Arc::new(EntityStateStore::new());
        integration.register_all(&store);
        client.clear_emitted();
        client.clear_lifecycle();
        Self {
            client,
            integration,
            store,
        }
    }

    /// Deliver an inbound bus message
    pub fn deliver(&self, topic: &str, data: Value) -> usize {
        self.client.deliver(Message::new(Topic::from(topic), data))
    }

    /// Topics emitted since setup
    pub fn emitted(&self) -> Vec<String> {
        self.client.emitted_topics()
    }

    /// Re-read an entity into the store and return its state
    pub fn state(&self, unique_id: &str) -> String {
        self.store
            .record(unique_id)
            .map(|s| s.state)
            .unwrap_or_else(|| panic!("entity {} is not registered", unique_id))
    }

    /// Assert that an entity is in a specific state
    #[allow(dead_code)]
    pub fn assert_state(&self, unique_id: &str, expected: &str) {
        let state = self.state(unique_id);
        assert_eq!(
            state, expected,
            "Expected entity {} to be in state '{}', but was '{}'",
            unique_id, expected, state
        );
    }

    /// Wait until the store has recorded `expected` for an entity
    #[allow(dead_code)]
    pub async fn wait_for_state(&self, unique_id: &str, expected: &str) {
        for _ in 0..100 {
            if self.store.is_state(unique_id, expected) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!(
            "entity {} never reached '{}', last {:?}",
            unique_id,
            expected,
            self.store.get_state(unique_id)
        );
    }
}

/// Entry used by most tests
pub fn config() -> HiveMindConfig {
    HiveMindConfig::new("10.0.0.5", "access-key", "password")
        .with_name(NAME)
        .with_site_id(SITE)
}

/// `{prefix}-Mark-2-kitchen`
pub fn uid(prefix: &str) -> String {
    format!("{}-Mark-2-{}", prefix, SITE)
}
