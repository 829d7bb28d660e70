//! Core types for the HiveMind bridge
//!
//! This crate provides the fundamental types shared by the bus seam and the
//! entity platforms: Topic, Message, Context, HiveMessage and EntityState.

mod context;
mod hive_message;
mod message;
mod state;

pub use context::{Context, SessionRef};
pub use hive_message::{HiveMessage, HiveMessageType};
pub use message::{Message, Topic};
pub use state::EntityState;

/// Integration domain, used in device identifiers
pub const DOMAIN: &str = "hivemind";

/// State value reported for entities whose connection has no handshake
pub const STATE_UNAVAILABLE: &str = "unavailable";

/// State value used when an entity has never reported
pub const STATE_UNKNOWN: &str = "unknown";

/// Bus topics consumed and emitted by the bridge
pub mod topics {
    // Speech and listener
    pub const SPEAK: &str = "speak";
    pub const IS_SPEAKING: &str = "mycroft.audio.is_speaking";
    pub const SPEAK_STATUS: &str = "mycroft.audio.speak.status";
    pub const LOOP_STATE: &str = "recognizer_loop:state";
    pub const LOOP_STATE_GET: &str = "recognizer_loop:state.get";
    pub const LOOP_STATE_SET: &str = "recognizer_loop:state.set";
    pub const LOOP_SLEEP: &str = "recognizer_loop:sleep";
    pub const LOOP_AWOKEN: &str = "recognizer_loop:awoken";
    pub const LOOP_WAKE_UP: &str = "recognizer_loop:wake_up";

    // System (PHAL)
    pub const SYSTEM_REBOOT: &str = "system.reboot";
    pub const SYSTEM_SHUTDOWN: &str = "system.shutdown";
    pub const SYSTEM_RESTART_SERVICE: &str = "system.mycroft.service.restart";
    pub const SSH_STATUS: &str = "system.ssh.status";
    pub const SSH_STATUS_RESPONSE: &str = "system.ssh.status.response";
    pub const SSH_ENABLE: &str = "system.ssh.enable";
    pub const SSH_DISABLE: &str = "system.ssh.disable";
    pub const SSH_ENABLED: &str = "system.ssh.enabled";
    pub const SSH_DISABLED: &str = "system.ssh.disabled";

    // Microphone
    pub const MIC_LISTEN: &str = "mycroft.mic.listen";
    pub const MIC_MUTE: &str = "mycroft.mic.mute";
    pub const MIC_UNMUTE: &str = "mycroft.mic.unmute";
    pub const MIC_GET_STATUS: &str = "mycroft.mic.get_status";
    pub const MIC_GET_STATUS_RESPONSE: &str = "mycroft.mic.get_status.response";

    pub const STOP: &str = "mycroft.stop";

    // Volume
    pub const VOLUME_GET: &str = "mycroft.volume.get";
    pub const VOLUME_GET_RESPONSE: &str = "mycroft.volume.get.response";
    pub const VOLUME_SET: &str = "mycroft.volume.set";
    pub const VOLUME_MUTE: &str = "mycroft.volume.mute";
    pub const VOLUME_UNMUTE: &str = "mycroft.volume.unmute";
    pub const VOLUME_INCREASE: &str = "mycroft.volume.increase";
    pub const VOLUME_DECREASE: &str = "mycroft.volume.decrease";

    // OCP (ovos common play)
    pub const OCP_PLAY: &str = "ovos.common_play.play";
    pub const OCP_QUEUE: &str = "ovos.common_play.playlist.queue";
    pub const OCP_RESUME: &str = "ovos.common_play.resume";
    pub const OCP_PAUSE: &str = "ovos.common_play.pause";
    pub const OCP_STOP: &str = "ovos.common_play.stop";
    pub const OCP_NEXT: &str = "ovos.common_play.next";
    pub const OCP_PREVIOUS: &str = "ovos.common_play.previous";
    pub const OCP_SEEK: &str = "ovos.common_play.service.set_track_position";
    pub const OCP_SHUFFLE_SET: &str = "ovos.common_play.shuffle.set";
    pub const OCP_SHUFFLE_UNSET: &str = "ovos.common_play.shuffle.unset";
    pub const OCP_REPEAT_SET: &str = "ovos.common_play.repeat.set";
    pub const OCP_REPEAT_UNSET: &str = "ovos.common_play.repeat.unset";
    pub const OCP_CLEAR_PLAYLIST: &str = "ovos.common_play.playlist.clear";
    pub const OCP_TRACK_INFO: &str = "ovos.common_play.track_info";
    pub const OCP_TRACK_INFO_RESPONSE: &str = "ovos.common_play.track_info.response";
    pub const OCP_TRACK_LENGTH: &str = "ovos.common_play.get_track_length";
    pub const OCP_TRACK_LENGTH_RESPONSE: &str = "ovos.common_play.get_track_length.response";
    pub const OCP_TRACK_POSITION: &str = "ovos.common_play.get_track_position";
    pub const OCP_TRACK_POSITION_RESPONSE: &str = "ovos.common_play.get_track_position.response";
    pub const OCP_PLAYBACK_TIME: &str = "ovos.common_play.playback_time";
    pub const OCP_PLAYER_STATUS: &str = "ovos.common_play.player.status";
    pub const OCP_PLAYER_STATUS_RESPONSE: &str = "ovos.common_play.player.status.response";
    pub const OCP_TRACK_STATE: &str = "ovos.common_play.track.state";
    pub const OCP_PLAYER_STATE: &str = "ovos.common_play.player.state";
    pub const OCP_MEDIA_STATE: &str = "ovos.common_play.media.state";

    // Legacy audio service
    pub const LEGACY_PLAY: &str = "mycroft.audio.service.play";
    pub const LEGACY_RESUME: &str = "mycroft.audio.service.resume";
    pub const LEGACY_PAUSE: &str = "mycroft.audio.service.pause";
    pub const LEGACY_STOP: &str = "mycroft.audio.service.stop";
    pub const LEGACY_NEXT: &str = "mycroft.audio.service.next";
    pub const LEGACY_PREVIOUS: &str = "mycroft.audio.service.prev";
    pub const LEGACY_SEEK: &str = "mycroft.audio.service.set_track_position";

    /// `mycroft.{process}.is_alive`
    pub fn is_alive(process: &str) -> String {
        format!("mycroft.{}.is_alive", process)
    }

    /// `mycroft.{process}.is_ready`
    pub fn is_ready(process: &str) -> String {
        format!("mycroft.{}.is_ready", process)
    }

    /// Response topic for a request topic
    pub fn response(request: &str) -> String {
        format!("{}.response", request)
    }
}
