//! Host-side record of entity states
//!
//! The store plays the host's part of the refresh contract: it listens for
//! `StateRefresh` notifications, re-reads the entity's snapshot and keeps the
//! latest state per entity, indexed by platform. A handshake the client drops
//! on its own sends no notification, so hosts also call `poll` periodically.

use std::sync::Arc;

use dashmap::DashMap;
use hm_core::EntityState;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, trace, warn};

use crate::entity::{Entity, Platform, StateNotifier, StateRefresh};

/// Latest state of every registered entity
pub struct EntityStateStore {
    /// Registered entities keyed by unique id
    entities: DashMap<String, Arc<dyn Entity>>,
    /// Recorded states keyed by unique id
    states: DashMap<String, EntityState>,
    /// Unique ids by platform
    platform_index: DashMap<Platform, Vec<String>>,
}

impl EntityStateStore {
    pub fn new() -> Self {
        Self {
            entities: DashMap::new(),
            states: DashMap::new(),
            platform_index: DashMap::new(),
        }
    }

    /// Register an entity and record its initial state
    pub fn register(&self, entity: Arc<dyn Entity>) -> EntityState {
        let unique_id = entity.unique_id();
        let platform = entity.platform();

        if self.entities.insert(unique_id.clone(), entity.clone()).is_none() {
            self.platform_index
                .entry(platform)
                .or_default()
                .push(unique_id.clone());
        }

        let snapshot = entity.snapshot();
        self.states.insert(unique_id, snapshot.clone());
        snapshot
    }

    /// Re-read an entity and record its state
    ///
    /// `last_changed` only moves when the state value changed. Returns `None`
    /// for entities that were never registered.
    #[instrument(skip(self))]
    pub fn record(&self, unique_id: &str) -> Option<EntityState> {
        let entity = self.entities.get(unique_id).map(|e| e.value().clone())?;
        let snapshot = entity.snapshot();

        let new_state = match self.states.get(unique_id).map(|s| s.clone()) {
            Some(existing) => {
                debug!(
                    state = %snapshot.state,
                    changed = existing.state != snapshot.state,
                    "Recording entity state"
                );
                existing.with_update(snapshot)
            }
            None => snapshot,
        };

        self.states.insert(unique_id.to_string(), new_state.clone());
        Some(new_state)
    }

    /// Re-read every registered entity
    pub fn record_all(&self) {
        for id in self.all_unique_ids() {
            self.record(&id);
        }
    }

    /// Ask every registered entity to request fresh state from the device
    pub fn refresh_all(&self) {
        for entity in self.entities.iter() {
            trace!(unique_id = %entity.key(), "Refreshing entity");
            entity.value().refresh();
        }
    }

    /// One scan: ask every entity for fresh state, then re-read all of them
    ///
    /// Availability is re-derived on the re-read even when no reply arrives.
    pub fn poll(&self) {
        self.refresh_all();
        self.record_all();
    }

    /// Record states as refresh notifications arrive, until the channel closes
    pub async fn run(&self, mut rx: broadcast::Receiver<StateRefresh>) {
        loop {
            match rx.recv().await {
                Ok(StateRefresh::Entity(unique_id)) => {
                    self.record(&unique_id);
                }
                Ok(StateRefresh::All) => self.record_all(),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "State store lagged, re-reading all entities");
                    self.record_all();
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    /// Spawn `run` on the current runtime
    pub fn spawn(self: &Arc<Self>, notifier: &StateNotifier) -> JoinHandle<()> {
        let store = self.clone();
        let rx = notifier.subscribe();
        tokio::spawn(async move { store.run(rx).await })
    }

    pub fn get(&self, unique_id: &str) -> Option<EntityState> {
        self.states.get(unique_id).map(|s| s.clone())
    }

    /// State value, or None if the entity is unknown
    pub fn get_state(&self, unique_id: &str) -> Option<String> {
        self.states.get(unique_id).map(|s| s.state.clone())
    }

    pub fn is_state(&self, unique_id: &str, state: &str) -> bool {
        self.get_state(unique_id).as_deref() == Some(state)
    }

    pub fn unique_ids(&self, platform: Platform) -> Vec<String> {
        self.platform_index
            .get(&platform)
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    pub fn platform_states(&self, platform: Platform) -> Vec<EntityState> {
        self.unique_ids(platform)
            .iter()
            .filter_map(|id| self.get(id))
            .collect()
    }

    pub fn all_unique_ids(&self) -> Vec<String> {
        self.entities.iter().map(|r| r.key().clone()).collect()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }
}

impl Default for EntityStateStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle to an `EntityStateStore`
pub type SharedStateStore = Arc<EntityStateStore>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityBase;
    use crate::switch::{BusSwitch, SwitchEntity, SwitchKind};
    use hm_bus::{BusClient, Connection, LoopbackClient};
    use hm_core::{topics, Message};
    use serde_json::json;

    async fn setup() -> (Arc<LoopbackClient>, StateNotifier, Arc<BusSwitch>) {
        let client = Arc::new(LoopbackClient::new("localhost"));
        client.connect("home").await.unwrap();
        let notifier = StateNotifier::new();
        let connection = Connection::new(client.clone(), "home", "default");
        let base = EntityBase::new("dev", connection, notifier.clone());
        (client, notifier, Arc::new(BusSwitch::new(base, SwitchKind::Sleep)))
    }

    #[tokio::test]
    async fn test_register_and_record() {
        let (_client, _notifier, switch) = setup().await;
        let store = EntityStateStore::new();
        let initial = store.register(switch.clone());
        assert_eq!(initial.state, "off");
        assert_eq!(store.unique_ids(Platform::Switch), vec!["hm-sleep-switch-dev-home"]);

        switch.turn_on().await;
        let recorded = store.record("hm-sleep-switch-dev-home").unwrap();
        assert_eq!(recorded.state, "on");
        assert!(recorded.last_changed >= initial.last_changed);
        assert_eq!(recorded.last_changed, recorded.last_updated);
        assert!(store.record("missing").is_none());
    }

    #[tokio::test]
    async fn test_unchanged_state_keeps_last_changed() {
        let (_client, _notifier, switch) = setup().await;
        let store = EntityStateStore::new();
        let initial = store.register(switch);

        let again = store.record("hm-sleep-switch-dev-home").unwrap();
        assert_eq!(again.last_changed, initial.last_changed);
    }

    #[tokio::test]
    async fn test_run_consumes_notifications() {
        let (client, notifier, switch) = setup().await;
        let store = Arc::new(EntityStateStore::new());
        store.register(switch);
        let handle = store.spawn(&notifier);

        client.deliver(Message::new(topics::LOOP_STATE, json!({"state": "sleeping"})));

        for _ in 0..50 {
            if store.is_state("hm-sleep-switch-dev-home", "on") {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(store.is_state("hm-sleep-switch-dev-home", "on"));
        handle.abort();
    }

    #[tokio::test]
    async fn test_refresh_all_notification_rereads_everything() {
        let (client, notifier, switch) = setup().await;
        let store = Arc::new(EntityStateStore::new());
        store.register(switch);
        let handle = store.spawn(&notifier);

        client.set_handshake(false);
        notifier.schedule_update_all();

        for _ in 0..50 {
            if store.is_state("hm-sleep-switch-dev-home", "unavailable") {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(store.is_state("hm-sleep-switch-dev-home", "unavailable"));
        handle.abort();
    }

    #[tokio::test]
    async fn test_poll_picks_up_silent_handshake_loss() {
        let (client, _notifier, switch) = setup().await;
        let store = EntityStateStore::new();
        store.register(switch);

        client.set_handshake(false);
        store.poll();

        assert_eq!(store.get_state("hm-sleep-switch-dev-home").as_deref(), Some("unavailable"));
    }

    #[tokio::test]
    async fn test_unavailable_entities_record_unavailable() {
        let (client, _notifier, switch) = setup().await;
        let store = EntityStateStore::new();
        store.register(switch);

        client.set_handshake(false);
        let state = store.record("hm-sleep-switch-dev-home").unwrap();
        assert!(state.is_unavailable());
    }
}
