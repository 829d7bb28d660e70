//! OCP (OpenVoiceOS Common Play) wire values
//!
//! The player reports and accepts small integer codes; these types map them
//! to and from the host's media player vocabulary.

use std::fmt;

use serde::Serialize;

/// Skill id the bridge plays media under
pub const SKILL_ID: &str = "homeassistant.hivemind";

/// Icon shown by the player for media started from the host
pub const SKILL_ICON: &str = "https://raw.githubusercontent.com/home-assistant/brands/refs/heads/master/core_integrations/music_assistant/icon.png";

/// Player transport state reported by OCP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Stopped,
    Playing,
    Paused,
}

impl PlayerState {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(PlayerState::Stopped),
            1 => Some(PlayerState::Playing),
            2 => Some(PlayerState::Paused),
            _ => None,
        }
    }

    /// Host transport state for this player state
    pub fn transport(&self) -> TransportState {
        match self {
            PlayerState::Stopped => TransportState::Idle,
            PlayerState::Playing => TransportState::Playing,
            PlayerState::Paused => TransportState::Paused,
        }
    }
}

/// Media loading state reported by OCP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaState {
    Unknown,
    NoMedia,
    LoadingMedia,
    LoadedMedia,
    StalledMedia,
    BufferingMedia,
    BufferedMedia,
    EndOfMedia,
    InvalidMedia,
}

impl MediaState {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(MediaState::Unknown),
            1 => Some(MediaState::NoMedia),
            2 => Some(MediaState::LoadingMedia),
            3 => Some(MediaState::LoadedMedia),
            4 => Some(MediaState::StalledMedia),
            5 => Some(MediaState::BufferingMedia),
            6 => Some(MediaState::BufferedMedia),
            7 => Some(MediaState::EndOfMedia),
            8 => Some(MediaState::InvalidMedia),
            _ => None,
        }
    }
}

/// Host repeat mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    Off,
    All,
    One,
}

impl RepeatMode {
    /// Map an OCP loop state code; unknown codes mean no repeat
    pub fn from_loop_state(code: i64) -> Self {
        match code {
            1 => RepeatMode::All,
            2 => RepeatMode::One,
            _ => RepeatMode::Off,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatMode::Off => "off",
            RepeatMode::All => "all",
            RepeatMode::One => "one",
        }
    }
}

/// Transport state exposed to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Off,
    On,
    Idle,
    Playing,
    Paused,
}

impl TransportState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportState::Off => "off",
            TransportState::On => "on",
            TransportState::Idle => "idle",
            TransportState::Playing => "playing",
            TransportState::Paused => "paused",
        }
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How `play_media` treats the current queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueue {
    Add,
    Next,
    Play,
    Replace,
}

/// OCP media category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "u8")]
#[repr(u8)]
pub enum OcpMediaType {
    Music = 2,
    Video = 3,
    Game = 5,
    Tv = 9,
    Movie = 10,
    VideoEpisodes = 19,
}

impl OcpMediaType {
    /// Map a host media content type; anything unknown plays as music
    pub fn from_host(media_type: &str) -> Self {
        match media_type {
            "music" => OcpMediaType::Music,
            "tvshow" | "episode" => OcpMediaType::VideoEpisodes,
            "movie" => OcpMediaType::Movie,
            "channel" => OcpMediaType::Tv,
            "game" => OcpMediaType::Game,
            "video" => OcpMediaType::Video,
            _ => OcpMediaType::Music,
        }
    }
}

impl From<OcpMediaType> for u8 {
    fn from(media_type: OcpMediaType) -> u8 {
        media_type as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "u8")]
#[repr(u8)]
pub enum TrackState {
    QueuedAudio = 33,
}

impl From<TrackState> for u8 {
    fn from(state: TrackState) -> u8 {
        state as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "u8")]
#[repr(u8)]
pub enum PlaybackType {
    Audio = 2,
}

impl From<PlaybackType> for u8 {
    fn from(playback: PlaybackType) -> u8 {
        playback as u8
    }
}

/// Media the player should queue or play
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaEntry {
    pub uri: String,
    pub title: String,
    pub artist: String,
    pub length: u64,
    pub match_confidence: u8,
    pub skill_id: String,
    pub skill_icon: String,
    pub image: String,
    pub status: TrackState,
    pub media_type: OcpMediaType,
    pub playback: PlaybackType,
}

impl MediaEntry {
    /// Entry for a bare uri requested by the host
    pub fn from_uri(uri: impl Into<String>, media_type: OcpMediaType) -> Self {
        Self {
            uri: uri.into(),
            title: String::new(),
            artist: String::new(),
            length: 0,
            match_confidence: 100,
            skill_id: SKILL_ID.to_string(),
            skill_icon: SKILL_ICON.to_string(),
            image: String::new(),
            status: TrackState::QueuedAudio,
            media_type,
            playback: PlaybackType::Audio,
        }
    }
}

/// Host media player feature flags
pub mod features {
    pub const PAUSE: u32 = 1;
    pub const SEEK: u32 = 2;
    pub const VOLUME_SET: u32 = 4;
    pub const VOLUME_MUTE: u32 = 8;
    pub const PREVIOUS_TRACK: u32 = 16;
    pub const NEXT_TRACK: u32 = 32;
    pub const PLAY_MEDIA: u32 = 512;
    pub const VOLUME_STEP: u32 = 1024;
    pub const STOP: u32 = 4096;
    pub const CLEAR_PLAYLIST: u32 = 8192;
    pub const PLAY: u32 = 16384;
    pub const SHUFFLE_SET: u32 = 32768;
    pub const REPEAT_SET: u32 = 262144;
    pub const MEDIA_ANNOUNCE: u32 = 1048576;
    pub const MEDIA_ENQUEUE: u32 = 2097152;

    /// Everything the bridged player supports
    pub const SUPPORTED: u32 = PLAY
        | PAUSE
        | STOP
        | VOLUME_SET
        | VOLUME_STEP
        | VOLUME_MUTE
        | PLAY_MEDIA
        | NEXT_TRACK
        | PREVIOUS_TRACK
        | REPEAT_SET
        | SHUFFLE_SET
        | SEEK
        | CLEAR_PLAYLIST
        | MEDIA_ANNOUNCE
        | MEDIA_ENQUEUE;
}
