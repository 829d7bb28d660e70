//! OCP media player
//!
//! Mirrors the device's Common Play state through a set of per-field topics
//! plus a full status topic, and drives playback with OCP commands (or the
//! legacy audio service when the entry asks for it). Outgoing messages are
//! wrapped in a `bus` HiveMind envelope.

use std::collections::HashMap;

use hm_core::{topics, HiveMessage, Message};
use serde_json::json;
use tracing::{debug, info};

use crate::entity::{DeviceInfo, Entity, EntityBase, Platform};
use crate::ocp::{
    features, Enqueue, MediaEntry, MediaState, OcpMediaType, PlayerState, RepeatMode,
    TransportState,
};
use crate::projection::Projection;

const DEFAULT_VOLUME: f64 = 0.5;
const VOLUME_STEP: f64 = 0.1;

/// Locally mirrored player state
#[derive(Debug, Clone, PartialEq)]
pub struct MediaStatus {
    pub state: TransportState,
    pub volume: f64,
    pub muted: bool,
    pub shuffle: bool,
    pub repeat: RepeatMode,
    /// Seconds
    pub track_len: f64,
    /// Seconds
    pub position: f64,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub image: String,
    pub uri: String,
    pub content_type: String,
}

impl Default for MediaStatus {
    fn default() -> Self {
        Self {
            state: TransportState::On,
            volume: DEFAULT_VOLUME,
            muted: false,
            shuffle: false,
            repeat: RepeatMode::Off,
            track_len: 0.0,
            position: 0.0,
            title: String::new(),
            artist: String::new(),
            album: String::new(),
            image: String::new(),
            uri: String::new(),
            content_type: "music".to_string(),
        }
    }
}

impl MediaStatus {
    /// Playback reached the end: idle, with the position pinned to the end
    fn end_of_media(&mut self) {
        self.state = TransportState::Idle;
        self.position = self.track_len;
    }
}

fn apply_track_info(status: &mut MediaStatus, msg: &Message) -> bool {
    status.title = [msg.str_or("title", ""), msg.str_or("track", "")]
        .into_iter()
        .find(|t| !t.is_empty())
        .unwrap_or_default()
        .to_string();
    status.artist = msg.str_or("artist", "").to_string();
    status.album = msg.str_or("album", "").to_string();
    status.image = msg.str_or("image", "").to_string();
    true
}

fn apply_position(status: &mut MediaStatus, msg: &Message) -> bool {
    status.position = msg.f64_or("position", status.position);
    status.track_len = msg.f64_or("length", status.track_len);
    true
}

fn apply_volume(status: &mut MediaStatus, msg: &Message) -> bool {
    status.volume = msg.f64_or("percent", DEFAULT_VOLUME);
    status.muted = msg.bool_or("muted", false);
    true
}

fn apply_player_state(status: &mut MediaStatus, msg: &Message) -> bool {
    match msg.i64("state").and_then(PlayerState::from_code) {
        Some(player) => {
            status.state = player.transport();
            true
        }
        None => false,
    }
}

fn apply_media_state(status: &mut MediaStatus, msg: &Message) -> bool {
    match msg.i64("state").and_then(MediaState::from_code) {
        Some(MediaState::EndOfMedia) => {
            status.end_of_media();
            true
        }
        other => {
            debug!(media_state = ?other, "OCP media state");
            false
        }
    }
}

/// Full status: player state first, then end of media overrides it
fn apply_full_status(status: &mut MediaStatus, msg: &Message) -> bool {
    status.repeat = RepeatMode::from_loop_state(msg.i64("repeat").unwrap_or(0));
    status.shuffle = msg.bool_or("shuffle", false);

    if let Some(player) = msg.i64("state").and_then(PlayerState::from_code) {
        status.state = player.transport();
    }
    if msg.i64("media_state").and_then(MediaState::from_code) == Some(MediaState::EndOfMedia) {
        status.end_of_media();
    }
    true
}

/// Media player backed by OCP on the device
pub struct MediaPlayer {
    status: Projection<MediaStatus>,
    legacy_audio: bool,
}

impl MediaPlayer {
    pub fn new(base: EntityBase, legacy_audio: bool) -> Self {
        let unique_id = base.unique_id("hm-ocp");
        let status = Projection::new(base, unique_id, MediaStatus::default());

        status.on(topics::OCP_TRACK_INFO_RESPONSE, apply_track_info);
        status.on(topics::OCP_TRACK_LENGTH_RESPONSE, |status, msg| {
            status.track_len = msg.f64_or("length", status.track_len);
            true
        });
        status.on(topics::OCP_TRACK_POSITION_RESPONSE, apply_position);
        status.on(topics::OCP_PLAYBACK_TIME, apply_position);
        status.on(topics::VOLUME_GET_RESPONSE, apply_volume);
        status.on(topics::OCP_TRACK_STATE, |_status, msg| {
            debug!(data = ?msg.data, "OCP track state");
            false
        });
        status.on(topics::OCP_PLAYER_STATE, apply_player_state);
        status.on(topics::OCP_MEDIA_STATE, apply_media_state);
        status.on(topics::OCP_PLAYER_STATUS_RESPONSE, apply_full_status);

        Self {
            status,
            legacy_audio,
        }
    }

    pub fn is_legacy_audio(&self) -> bool {
        self.legacy_audio
    }

    /// Copy of the mirrored player state
    pub fn status(&self) -> MediaStatus {
        self.status.get()
    }

    /// Transport state; "off" while there is no handshake
    pub fn transport_state(&self) -> TransportState {
        if !self.status.base().available() {
            return TransportState::Off;
        }
        self.status.read(|s| s.state)
    }

    pub fn supported_features(&self) -> u32 {
        features::SUPPORTED
    }

    pub fn app_name(&self) -> &'static str {
        "OCP"
    }

    pub fn media_playlist(&self) -> &'static str {
        "OCP Now Playing"
    }

    fn send(&self, message: Message) {
        let payload = HiveMessage::bus(message);
        info!(topic = %payload.payload.msg_type, "Sending OCP command");
        self.status.base().connection().send(payload);
    }

    fn pick(&self, ocp: &str, legacy: &str) -> Message {
        Message::empty(if self.legacy_audio { legacy } else { ocp })
    }

    pub async fn play(&self) {
        self.status.update(|s| s.state = TransportState::Playing);
        self.send(self.pick(topics::OCP_RESUME, topics::LEGACY_RESUME));
    }

    pub async fn pause(&self) {
        self.status.update(|s| s.state = TransportState::Paused);
        self.send(self.pick(topics::OCP_PAUSE, topics::LEGACY_PAUSE));
    }

    pub async fn stop(&self) {
        self.status.update(|s| s.state = TransportState::Idle);
        self.send(self.pick(topics::OCP_STOP, topics::LEGACY_STOP));
    }

    pub async fn next_track(&self) {
        self.send(self.pick(topics::OCP_NEXT, topics::LEGACY_NEXT));
    }

    pub async fn previous_track(&self) {
        self.send(self.pick(topics::OCP_PREVIOUS, topics::LEGACY_PREVIOUS));
    }

    /// Seek to `position` seconds
    pub async fn seek(&self, position: f64) {
        let message = if self.legacy_audio {
            // the legacy audio service takes integer milliseconds
            let ms = (position * 1000.0) as i64;
            Message::new(topics::LEGACY_SEEK, json!({ "position": ms }))
        } else {
            Message::new(topics::OCP_SEEK, json!({ "position": position }))
        };
        self.status.update(|s| s.position = position);
        self.send(message);
    }

    /// Play (or queue, with `Enqueue::Add`) a media uri
    pub async fn play_media(&self, media_type: &str, media_id: &str, enqueue: Option<Enqueue>) {
        info!(media_type = %media_type, media_id = %media_id, enqueue = ?enqueue, "Play media");

        // A queued entry is not what is playing now
        if enqueue != Some(Enqueue::Add) {
            self.status.update(|s| {
                s.uri = media_id.to_string();
                s.content_type = media_type.to_string();
            });
        }

        let message = if self.legacy_audio {
            Message::new(topics::LEGACY_PLAY, json!({ "tracks": [media_id] }))
        } else {
            let topic = match enqueue {
                Some(Enqueue::Add) => topics::OCP_QUEUE,
                _ => topics::OCP_PLAY,
            };
            let entry = MediaEntry::from_uri(media_id, OcpMediaType::from_host(media_type));
            Message::new(topic, json!({ "media": entry }))
        };
        self.send(message);
    }

    pub async fn set_volume(&self, volume: f64) {
        self.status.update(|s| s.volume = volume);
        self.send(Message::new(topics::VOLUME_SET, json!({ "percent": volume })));
    }

    pub async fn volume_up(&self) {
        self.status
            .update(|s| s.volume = (s.volume + VOLUME_STEP).clamp(0.0, 1.0));
        self.send(Message::empty(topics::VOLUME_INCREASE));
    }

    pub async fn volume_down(&self) {
        self.status
            .update(|s| s.volume = (s.volume - VOLUME_STEP).clamp(0.0, 1.0));
        self.send(Message::empty(topics::VOLUME_DECREASE));
    }

    pub async fn mute(&self, muted: bool) {
        self.status.update(|s| s.muted = muted);
        let topic = if muted {
            topics::VOLUME_MUTE
        } else {
            topics::VOLUME_UNMUTE
        };
        self.send(Message::empty(topic));
    }

    pub async fn set_shuffle(&self, shuffle: bool) {
        self.status.update(|s| s.shuffle = shuffle);
        let topic = if shuffle {
            topics::OCP_SHUFFLE_SET
        } else {
            topics::OCP_SHUFFLE_UNSET
        };
        self.send(Message::empty(topic));
    }

    /// OCP has no bus command for repeat-one, so it sets plain repeat
    pub async fn set_repeat(&self, repeat: RepeatMode) {
        self.status.update(|s| s.repeat = repeat);
        let topic = match repeat {
            RepeatMode::Off => topics::OCP_REPEAT_UNSET,
            RepeatMode::All | RepeatMode::One => topics::OCP_REPEAT_SET,
        };
        self.send(Message::empty(topic));
    }

    pub async fn clear_playlist(&self) {
        self.send(Message::empty(topics::OCP_CLEAR_PLAYLIST));
    }
}

impl Entity for MediaPlayer {
    fn platform(&self) -> Platform {
        Platform::MediaPlayer
    }

    fn name(&self) -> String {
        format!("hm-ocp-{}", self.status.base().slug())
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
        self.transport_state().to_string()
    }

    fn device_class(&self) -> Option<&'static str> {
        Some("speaker")
    }

    fn attributes(&self) -> HashMap<String, serde_json::Value> {
        let s = self.status();
        HashMap::from([
            ("volume_level".to_string(), json!(s.volume)),
            ("is_volume_muted".to_string(), json!(s.muted)),
            ("shuffle".to_string(), json!(s.shuffle)),
            ("repeat".to_string(), json!(s.repeat)),
            ("media_title".to_string(), json!(s.title)),
            ("media_artist".to_string(), json!(s.artist)),
            ("media_album_name".to_string(), json!(s.album)),
            ("media_image_url".to_string(), json!(s.image)),
            ("media_duration".to_string(), json!(s.track_len)),
            ("media_position".to_string(), json!(s.position)),
            ("media_content_id".to_string(), json!(s.uri)),
            ("media_content_type".to_string(), json!(s.content_type)),
            ("media_playlist".to_string(), json!(self.media_playlist())),
            ("app_name".to_string(), json!(self.app_name())),
            ("supported_features".to_string(), json!(self.supported_features())),
        ])
    }

    fn refresh(&self) {
        for topic in [
            topics::VOLUME_GET,
            topics::OCP_TRACK_INFO,
            topics::OCP_TRACK_LENGTH,
            topics::OCP_TRACK_POSITION,
            topics::OCP_PLAYER_STATUS,
        ] {
            self.status.request(topic);
        }
    }
}
