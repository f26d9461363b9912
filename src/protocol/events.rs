use serde::Serialize;
use tracing::error;

use crate::{common::RoomError, playlist::Track, protocol::opcodes::Action};

const SUCCESS: i32 = 0;

/// Fallback text when a payload cannot be serialized.
const ENCODE_FAILURE: &str =
    r#"{"error_code":-3,"status":"error","message":"failed to encode response"}"#;

/// Snapshot of the playback clock as seen by clients.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SongInfo {
    pub songname: String,
    pub songhash: String,
    pub singername: String,
    pub album_name: String,
    pub duration: String,
    pub lyrics_url: String,
    pub song_url: String,
    pub cover_url: String,
    pub played_percent: f64,
    /// `1` while playing, `0` while paused; clients expect a number.
    pub is_playing: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistItem {
    pub songname: String,
    pub songhash: String,
    pub singername: String,
    pub album_name: String,
    pub duration: String,
    pub cover_url: String,
}

impl From<&Track> for PlaylistItem {
    fn from(track: &Track) -> Self {
        Self {
            songname: track.name.clone(),
            songhash: track.hash.clone(),
            singername: track.artist.clone(),
            album_name: track.album.clone(),
            duration: track.duration.clone(),
            cover_url: track.cover_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientEntry {
    pub userid: String,
    pub ip: String,
}

/// Every message the server writes to a client.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum OutgoingMessage {
    Status {
        error_code: i32,
        status: &'static str,
        message: String,
    },
    SongInfo {
        error_code: i32,
        status: &'static str,
        action: Action,
        data: SongInfo,
    },
    Playlist {
        error_code: i32,
        status: &'static str,
        action: Action,
        playlist: Vec<PlaylistItem>,
    },
    ClientList {
        error_code: i32,
        status: &'static str,
        action: Action,
        clients: Vec<ClientEntry>,
    },
}

impl OutgoingMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self::Status {
            error_code: SUCCESS,
            status: "success",
            message: message.into(),
        }
    }

    pub fn error(err: &RoomError) -> Self {
        Self::Status {
            error_code: err.code(),
            status: "error",
            message: err.to_string(),
        }
    }

    pub fn song_info(action: Action, data: SongInfo) -> Self {
        Self::SongInfo {
            error_code: SUCCESS,
            status: "success",
            action,
            data,
        }
    }

    pub fn playlist(action: Action, playlist: Vec<PlaylistItem>) -> Self {
        Self::Playlist {
            error_code: SUCCESS,
            status: "success",
            action,
            playlist,
        }
    }

    pub fn client_list(action: Action, clients: Vec<ClientEntry>) -> Self {
        Self::ClientList {
            error_code: SUCCESS,
            status: "success",
            action,
            clients,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            error!("Failed to encode outgoing message: {}", e);
            ENCODE_FAILURE.to_string()
        })
    }
}
