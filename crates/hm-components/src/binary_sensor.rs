//! Binary sensors: connection, speaking, and per-process alive/ready

use hm_core::topics;

use crate::entity::{on_off, DeviceInfo, Entity, EntityBase, Platform};
use crate::projection::Projection;

/// Processes whose alive/ready status is mirrored
pub const PROCESSES: [&str; 5] = ["skills", "audio", "voice", "PHAL", "gui_service"];

/// Human readable label of a process
pub fn process_label(process: &str) -> &str {
    match process {
        "skills" => "ovos-core",
        "audio" => "ovos-audio",
        "voice" => "ovos-listener",
        "gui_service" => "ovos-gui",
        "PHAL" => "ovos-PHAL",
        other => other,
    }
}

/// A boolean entity
pub trait BinarySensorEntity: Entity {
    fn is_on(&self) -> bool;
}

/// Handshake status of the bus connection
///
/// Always available, so a lost connection shows as "off" rather than
/// "unavailable".
pub struct ConnectionSensor {
    base: EntityBase,
}

impl ConnectionSensor {
    pub fn new(base: EntityBase) -> Self {
        Self { base }
    }
}

impl Entity for ConnectionSensor {
    fn platform(&self) -> Platform {
        Platform::BinarySensor
    }

    fn name(&self) -> String {
        self.base.display_name("Connection Status")
    }

    fn unique_id(&self) -> String {
        self.base.unique_id("hm-connection-status")
    }

    fn device_info(&self) -> DeviceInfo {
        self.base.device_info()
    }

    fn available(&self) -> bool {
        true
    }

    fn state(&self) -> String {
        on_off(self.is_on())
    }

    fn icon(&self) -> Option<&'static str> {
        Some(if self.is_on() {
            "mdi:lan-connect"
        } else {
            "mdi:lan-disconnect"
        })
    }

    fn device_class(&self) -> Option<&'static str> {
        Some("connectivity")
    }
}

impl BinarySensorEntity for ConnectionSensor {
    fn is_on(&self) -> bool {
        self.base.available()
    }
}

/// Whether text-to-speech is currently playing
pub struct SpeakingSensor {
    speaking: Projection<bool>,
}

impl SpeakingSensor {
    pub fn new(base: EntityBase) -> Self {
        let unique_id = base.unique_id("hm-speaking-status");
        let speaking = Projection::new(base, unique_id, false);
        speaking.on(topics::IS_SPEAKING, |speaking, msg| {
            *speaking = msg.bool_or("speaking", false);
            true
        });
        Self { speaking }
    }
}

impl Entity for SpeakingSensor {
    fn platform(&self) -> Platform {
        Platform::BinarySensor
    }

    fn name(&self) -> String {
        self.speaking.base().display_name("Speaking")
    }

    fn unique_id(&self) -> String {
        self.speaking.unique_id().to_string()
    }

    fn device_info(&self) -> DeviceInfo {
        self.speaking.base().device_info()
    }

    fn available(&self) -> bool {
        self.speaking.base().available()
    }

    fn state(&self) -> String {
        on_off(self.is_on())
    }

    fn icon(&self) -> Option<&'static str> {
        Some(if self.is_on() {
            "mdi:account-voice"
        } else {
            "mdi:account-voice-off"
        })
    }

    fn device_class(&self) -> Option<&'static str> {
        Some("running")
    }

    fn refresh(&self) {
        self.speaking.request(topics::SPEAK_STATUS);
    }
}

impl BinarySensorEntity for SpeakingSensor {
    fn is_on(&self) -> bool {
        self.speaking.get()
    }
}

/// Which process status a `ProcessSensor` mirrors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessCheck {
    Alive,
    Ready,
}

impl ProcessCheck {
    fn request_topic(&self, process: &str) -> String {
        match self {
            ProcessCheck::Alive => topics::is_alive(process),
            ProcessCheck::Ready => topics::is_ready(process),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ProcessCheck::Alive => "Alive",
            ProcessCheck::Ready => "Ready",
        }
    }

    fn id_prefix(&self) -> &'static str {
        match self {
            ProcessCheck::Alive => "hm-alive-sensor",
            ProcessCheck::Ready => "hm-ready-sensor",
        }
    }
}

/// Alive or ready status of one device process
pub struct ProcessSensor {
    status: Projection<bool>,
    process: String,
    check: ProcessCheck,
}

impl ProcessSensor {
    pub fn new(base: EntityBase, process: &str, check: ProcessCheck) -> Self {
        // the process sits between device name and site in the id
        let unique_id = format!(
            "{}-{}-{}-{}",
            check.id_prefix(),
            base.slug(),
            process,
            base.site_id()
        )
        .replace(' ', "");
        let status = Projection::new(base, unique_id, false);
        status.on(topics::response(&check.request_topic(process)), |status, msg| {
            *status = msg.bool_or("status", false);
            true
        });
        Self {
            status,
            process: process.to_string(),
            check,
        }
    }

    pub fn process(&self) -> &str {
        &self.process
    }

    pub fn check(&self) -> ProcessCheck {
        self.check
    }
}

impl Entity for ProcessSensor {
    fn platform(&self) -> Platform {
        Platform::BinarySensor
    }

    fn name(&self) -> String {
        let label = format!("{} {}", process_label(&self.process), self.check.label());
        self.status.base().display_name(&label)
    }

    fn unique_id(&self) -> String {
        self.status.unique_id().to_string()
    }

    fn device_info(&self) -> DeviceInfo {
        self.status.base().device_info()
    }

    fn available(&self) -> bool {
        self.status.base().available()
    }

    fn state(&self) -> String {
        on_off(self.is_on())
    }

    fn icon(&self) -> Option<&'static str> {
        Some(if self.is_on() {
            "mdi:check-circle"
        } else {
            "mdi:alert-circle"
        })
    }

    fn device_class(&self) -> Option<&'static str> {
        Some("running")
    }

    fn refresh(&self) {
        self.status.request(self.check.request_topic(&self.process));
    }
}

impl BinarySensorEntity for ProcessSensor {
    fn is_on(&self) -> bool {
        self.status.get()
    }
}
