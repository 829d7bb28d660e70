//! Switches: SSH service, volume mute, microphone mute, sleep mode
//!
//! All four share one shape: a status request/response pair, a pair of
//! events that flip the state, and a pair of command topics. Only sleep mode
//! updates optimistically; the others wait for the device to confirm.

use async_trait::async_trait;
use hm_core::{topics, Message};

use crate::entity::{on_off, DeviceInfo, Entity, EntityBase, Platform};
use crate::projection::Projection;

/// A boolean entity that can be switched
#[async_trait]
pub trait SwitchEntity: Entity {
    fn is_on(&self) -> bool;

    async fn turn_on(&self);

    async fn turn_off(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchKind {
    Ssh,
    VolumeMute,
    MicMute,
    Sleep,
}

impl SwitchKind {
    pub const ALL: [SwitchKind; 4] = [
        SwitchKind::Ssh,
        SwitchKind::VolumeMute,
        SwitchKind::MicMute,
        SwitchKind::Sleep,
    ];

    fn label(&self) -> &'static str {
        match self {
            SwitchKind::Ssh => "SSH Service",
            SwitchKind::VolumeMute => "Volume Mute",
            SwitchKind::MicMute => "Microphone Mute",
            SwitchKind::Sleep => "Sleep Mode",
        }
    }

    fn id_prefix(&self) -> &'static str {
        match self {
            SwitchKind::Ssh => "hm-ssh-switch",
            SwitchKind::VolumeMute => "hm-volume-mute-switch",
            SwitchKind::MicMute => "hm-mic-mute-switch",
            SwitchKind::Sleep => "hm-sleep-switch",
        }
    }

    /// Topic used to ask for the current status
    fn status_request(&self) -> &'static str {
        match self {
            SwitchKind::Ssh => topics::SSH_STATUS,
            SwitchKind::VolumeMute => topics::VOLUME_GET,
            SwitchKind::MicMute => topics::MIC_GET_STATUS,
            SwitchKind::Sleep => topics::LOOP_STATE_GET,
        }
    }

    /// Topic carrying the full status
    fn status_topic(&self) -> &'static str {
        match self {
            SwitchKind::Ssh => topics::SSH_STATUS_RESPONSE,
            SwitchKind::VolumeMute => topics::VOLUME_GET_RESPONSE,
            SwitchKind::MicMute => topics::MIC_GET_STATUS_RESPONSE,
            SwitchKind::Sleep => topics::LOOP_STATE,
        }
    }

    fn parse_status(&self, message: &Message) -> bool {
        match self {
            SwitchKind::Ssh => message.bool_or("enabled", false),
            SwitchKind::VolumeMute | SwitchKind::MicMute => message.bool_or("muted", false),
            SwitchKind::Sleep => message.str_or("state", "wakeword") == "sleeping",
        }
    }

    /// Events reporting the state went (on, off)
    fn events(&self) -> (&'static str, &'static str) {
        match self {
            SwitchKind::Ssh => (topics::SSH_ENABLED, topics::SSH_DISABLED),
            SwitchKind::VolumeMute => (topics::VOLUME_MUTE, topics::VOLUME_UNMUTE),
            SwitchKind::MicMute => (topics::MIC_MUTE, topics::MIC_UNMUTE),
            SwitchKind::Sleep => (topics::LOOP_SLEEP, topics::LOOP_AWOKEN),
        }
    }

    /// Commands for (on, off)
    fn commands(&self) -> (&'static str, &'static str) {
        match self {
            SwitchKind::Ssh => (topics::SSH_ENABLE, topics::SSH_DISABLE),
            SwitchKind::VolumeMute => (topics::VOLUME_MUTE, topics::VOLUME_UNMUTE),
            SwitchKind::MicMute => (topics::MIC_MUTE, topics::MIC_UNMUTE),
            SwitchKind::Sleep => (topics::LOOP_SLEEP, topics::LOOP_WAKE_UP),
        }
    }

    fn optimistic(&self) -> bool {
        matches!(self, SwitchKind::Sleep)
    }

    fn icon(&self, on: bool) -> &'static str {
        match (self, on) {
            (SwitchKind::Ssh, _) => "mdi:remote-desktop",
            (SwitchKind::VolumeMute, true) => "mdi:volume-mute",
            (SwitchKind::VolumeMute, false) => "mdi:volume-high",
            (SwitchKind::MicMute, true) => "mdi:microphone-off",
            (SwitchKind::MicMute, false) => "mdi:microphone",
            (SwitchKind::Sleep, true) => "mdi:sleep",
            (SwitchKind::Sleep, false) => "mdi:sleep-off",
        }
    }
}

/// Switch mirroring one boolean device setting
pub struct BusSwitch {
    on: Projection<bool>,
    kind: SwitchKind,
}

impl BusSwitch {
    pub fn new(base: EntityBase, kind: SwitchKind) -> Self {
        let unique_id = base.unique_id(kind.id_prefix());
        let on = Projection::new(base, unique_id, false);

        on.on(kind.status_topic(), move |on, msg| {
            *on = kind.parse_status(msg);
            true
        });
        let (on_event, off_event) = kind.events();
        on.on(on_event, |on, _msg| {
            *on = true;
            true
        });
        on.on(off_event, |on, _msg| {
            *on = false;
            true
        });

        Self { on, kind }
    }

    pub fn kind(&self) -> SwitchKind {
        self.kind
    }

    fn command(&self, turn_on: bool) {
        if self.kind.optimistic() {
            self.on.update(|on| *on = turn_on);
        }
        let (on_topic, off_topic) = self.kind.commands();
        let topic = if turn_on { on_topic } else { off_topic };
        self.on.base().connection().send_mycroft(Message::empty(topic));
    }
}

impl Entity for BusSwitch {
    fn platform(&self) -> Platform {
        Platform::Switch
    }

    fn name(&self) -> String {
        self.on.base().display_name(self.kind.label())
    }

    fn unique_id(&self) -> String {
        self.on.unique_id().to_string()
    }

    fn device_info(&self) -> DeviceInfo {
        self.on.base().device_info()
    }

    fn available(&self) -> bool {
        self.on.base().available()
    }

    fn state(&self) -> String {
        on_off(self.is_on())
    }

    fn icon(&self) -> Option<&'static str> {
        Some(self.kind.icon(self.is_on()))
    }

    fn device_class(&self) -> Option<&'static str> {
        Some("switch")
    }

    fn refresh(&self) {
        self.on.request(self.kind.status_request());
    }
}

#[async_trait]
impl SwitchEntity for BusSwitch {
    fn is_on(&self) -> bool {
        self.on.get()
    }

    async fn turn_on(&self) {
        self.command(true);
    }

    async fn turn_off(&self) {
        self.command(false);
    }
}
