//! Per-entry setup
//!
//! Builds the shared connection for a config entry, creates every entity on
//! every platform against it, then opens the connection. Entities subscribe
//! to their topics on construction, so nothing the node sends right after the
//! handshake is missed.

use std::path::Path;
use std::sync::Arc;

use hm_bus::{BusClient, Connection};
use hm_config::{load_entries, HiveMindConfig, USER_AGENT};
use tracing::{error, info, instrument};

use crate::binary_sensor::{
    ConnectionSensor, ProcessCheck, ProcessSensor, SpeakingSensor, PROCESSES,
};
use crate::button::{ReconnectButton, SystemButton, SystemCommand};
use crate::entity::{Entity, EntityBase, Platform, StateNotifier};
use crate::error::{SetupError, SetupResult};
use crate::media_player::MediaPlayer;
use crate::notify::Notifier;
use crate::select::ListeningModeSelect;
use crate::sensor::ListenerStateSensor;
use crate::state_store::EntityStateStore;
use crate::switch::{BusSwitch, SwitchKind};

/// All entities of one configured HiveMind device
pub struct HiveMindIntegration {
    config: HiveMindConfig,
    connection: Connection,
    notifier: StateNotifier,

    pub notifier_entity: Arc<Notifier>,
    pub connection_sensor: Arc<ConnectionSensor>,
    pub speaking_sensor: Arc<SpeakingSensor>,
    pub process_sensors: Vec<Arc<ProcessSensor>>,
    pub listener_sensor: Arc<ListenerStateSensor>,
    pub reconnect_button: Arc<ReconnectButton>,
    pub system_buttons: Vec<Arc<SystemButton>>,
    pub switches: Vec<Arc<BusSwitch>>,
    pub listening_mode: Arc<ListeningModeSelect>,
    pub media_player: Arc<MediaPlayer>,
}

impl HiveMindIntegration {
    pub fn config(&self) -> &HiveMindConfig {
        &self.config
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Channel the entities signal state changes on
    pub fn notifier(&self) -> &StateNotifier {
        &self.notifier
    }

    pub fn switch(&self, kind: SwitchKind) -> Option<Arc<BusSwitch>> {
        self.switches.iter().find(|s| s.kind() == kind).cloned()
    }

    pub fn system_button(&self, command: SystemCommand) -> Option<Arc<SystemButton>> {
        self.system_buttons
            .iter()
            .find(|b| b.command() == command)
            .cloned()
    }

    pub fn process_sensor(&self, process: &str, check: ProcessCheck) -> Option<Arc<ProcessSensor>> {
        self.process_sensors
            .iter()
            .find(|s| s.process() == process && s.check() == check)
            .cloned()
    }

    /// Entities registered on one platform
    pub fn platform_entities(&self, platform: Platform) -> Vec<Arc<dyn Entity>> {
        fn erase<E: Entity + 'static>(entity: &Arc<E>) -> Arc<dyn Entity> {
            entity.clone()
        }

        match platform {
            Platform::Notify => vec![erase(&self.notifier_entity)],
            Platform::BinarySensor => {
                let mut entities = vec![
                    erase(&self.connection_sensor),
                    erase(&self.speaking_sensor),
                ];
                entities.extend(self.process_sensors.iter().map(erase));
                entities
            }
            Platform::Sensor => vec![erase(&self.listener_sensor)],
            Platform::Button => {
                let mut entities = vec![erase(&self.reconnect_button)];
                entities.extend(self.system_buttons.iter().map(erase));
                entities
            }
            Platform::Switch => self.switches.iter().map(erase).collect(),
            Platform::Select => vec![erase(&self.listening_mode)],
            Platform::MediaPlayer => vec![erase(&self.media_player)],
        }
    }

    /// Every entity across all platforms
    pub fn entities(&self) -> Vec<Arc<dyn Entity>> {
        Platform::ALL
            .iter()
            .flat_map(|p| self.platform_entities(*p))
            .collect()
    }

    /// Register every entity with a state store
    pub fn register_all(&self, store: &EntityStateStore) {
        for entity in self.entities() {
            store.register(entity);
        }
    }

    /// Close the connection when the entry is removed
    pub async fn unload(&self) {
        if let Err(e) = self.connection.close().await {
            error!(error = %e, "Error closing HiveMind connection");
        }
    }
}

/// Set up one config entry against a bus client
///
/// A failed initial connection is logged, not returned: the entities exist
/// and report unavailable until the reconnect button succeeds.
#[instrument(
    skip(config, client),
    fields(name = %config.name, host = %config.host, site_id = %config.site_id)
)]
pub async fn setup_entry(
    config: HiveMindConfig,
    client: Arc<dyn BusClient>,
) -> SetupResult<HiveMindIntegration> {
    config.validate()?;

    info!(
        user_agent = USER_AGENT,
        port = config.port,
        self_signed = config.allow_self_signed,
        legacy_audio = config.legacy_audio,
        "Setting up HiveMind entry"
    );

    let connection = Connection::new(client, config.site_id.clone(), config.session_id.clone());
    let notifier = StateNotifier::new();
    connection.on_availability_change({
        let notifier = notifier.clone();
        Arc::new(move |_available: bool| notifier.schedule_update_all())
    });
    let base = EntityBase::new(&config.name, connection.clone(), notifier.clone());

    let process_sensors = PROCESSES
        .iter()
        .flat_map(|process| {
            [ProcessCheck::Alive, ProcessCheck::Ready]
                .map(|check| Arc::new(ProcessSensor::new(base.clone(), process, check)))
        })
        .collect();

    let integration = HiveMindIntegration {
        notifier_entity: Arc::new(Notifier::new(base.clone())),
        connection_sensor: Arc::new(ConnectionSensor::new(base.clone())),
        speaking_sensor: Arc::new(SpeakingSensor::new(base.clone())),
        process_sensors,
        listener_sensor: Arc::new(ListenerStateSensor::new(base.clone())),
        reconnect_button: Arc::new(ReconnectButton::new(base.clone())),
        system_buttons: SystemCommand::ALL
            .iter()
            .map(|command| Arc::new(SystemButton::new(base.clone(), *command)))
            .collect(),
        switches: SwitchKind::ALL
            .iter()
            .map(|kind| Arc::new(BusSwitch::new(base.clone(), *kind)))
            .collect(),
        listening_mode: Arc::new(ListeningModeSelect::new(base.clone())),
        media_player: Arc::new(MediaPlayer::new(base, config.legacy_audio)),
        connection,
        notifier,
        config,
    };

    if let Err(e) = integration.connection.connect().await {
        error!(error = %e, "Failed to connect to HiveMind, entities stay unavailable");
    }

    info!(
        entities = integration.entities().len(),
        available = integration.connection.is_available(),
        "HiveMind entry set up"
    );
    Ok(integration)
}

/// Load entries from a YAML file and set each one up
///
/// `client_for` builds the bus client for an entry.
pub async fn setup_from_file<F>(
    config_dir: &Path,
    file: &str,
    client_for: F,
) -> SetupResult<Vec<HiveMindIntegration>>
where
    F: Fn(&HiveMindConfig) -> Arc<dyn BusClient>,
{
    let entries = load_entries(config_dir, file)?;
    if entries.is_empty() {
        return Err(SetupError::NoEntries(config_dir.join(file).display().to_string()));
    }

    let mut integrations = Vec::with_capacity(entries.len());
    for config in entries {
        let client = client_for(&config);
        integrations.push(setup_entry(config, client).await?);
    }
    Ok(integrations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hm_bus::LoopbackClient;
    use hm_config::ConfigError;

    fn config() -> HiveMindConfig {
        HiveMindConfig::new("10.0.0.5", "key", "secret")
            .with_name("Mark 2")
            .with_site_id("kitchen")
    }

    #[tokio::test]
    async fn test_setup_creates_every_platform() {
        let client = Arc::new(LoopbackClient::new("10.0.0.5"));
        let integration = setup_entry(config(), client.clone()).await.unwrap();

        assert!(integration.connection().is_available());
        assert_eq!(integration.platform_entities(Platform::BinarySensor).len(), 12);
        assert_eq!(integration.platform_entities(Platform::Button).len(), 6);
        assert_eq!(integration.platform_entities(Platform::Switch).len(), 4);
        assert_eq!(integration.entities().len(), 26);
    }

    #[tokio::test]
    async fn test_connect_failure_is_not_fatal() {
        let client = Arc::new(LoopbackClient::new("10.0.0.5"));
        client.set_fail_connect(true);
        let integration = setup_entry(config(), client).await.unwrap();

        assert!(!integration.connection().is_available());
        assert!(integration.entities().iter().all(|e| {
            let state = e.snapshot().state;
            // always-available entities still report their own state
            state == "unavailable" || e.available()
        }));
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let client = Arc::new(LoopbackClient::new("10.0.0.5"));
        let config = HiveMindConfig::new("", "key", "secret");
        let result = setup_entry(config, client).await;
        assert!(matches!(result, Err(SetupError::Config(ConfigError::InvalidValue { .. }))));
    }

    #[tokio::test]
    async fn test_unique_ids_are_distinct() {
        let client = Arc::new(LoopbackClient::new("10.0.0.5"));
        let integration = setup_entry(config(), client).await.unwrap();
        let mut ids: Vec<String> = integration.entities().iter().map(|e| e.unique_id()).collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }
}
