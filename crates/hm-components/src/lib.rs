//! HiveMind entity platforms
//!
//! Each entity mirrors a piece of a voice assistant's state from its
//! HiveMind bus and turns host actions into bus messages:
//!
//! - `binary_sensor`: connection, speaking, process alive/ready
//! - `sensor`: listener state
//! - `button`: reconnect, reboot, shutdown, restart services, listen, stop
//! - `switch`: SSH, volume mute, microphone mute, sleep mode
//! - `select`: listening mode
//! - `media_player`: OCP playback
//! - `notify`: spoken notifications
//!
//! `setup_entry` wires all of them to one shared connection.

pub mod binary_sensor;
pub mod button;
pub mod entity;
pub mod error;
pub mod media_player;
pub mod notify;
pub mod ocp;
pub mod projection;
pub mod select;
pub mod sensor;
pub mod setup;
pub mod state_store;
pub mod switch;

pub use binary_sensor::{
    BinarySensorEntity, ConnectionSensor, ProcessCheck, ProcessSensor, SpeakingSensor,
};
pub use button::{ButtonEntity, ReconnectButton, SystemButton, SystemCommand};
pub use entity::{DeviceInfo, Entity, EntityBase, Platform, StateNotifier, StateRefresh};
pub use error::{SetupError, SetupResult};
pub use media_player::{MediaPlayer, MediaStatus};
pub use notify::Notifier;
pub use ocp::{Enqueue, RepeatMode, TransportState};
pub use projection::Projection;
pub use select::{ListeningModeSelect, SelectEntity};
pub use sensor::ListenerStateSensor;
pub use setup::{setup_entry, setup_from_file, HiveMindIntegration};
pub use state_store::{EntityStateStore, SharedStateStore};
pub use switch::{BusSwitch, SwitchEntity, SwitchKind};
