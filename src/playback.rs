//! Normalized now-playing signal consumed by the lobby client.
//!
//! The playback source (a player SDK wrapper, a polling loop, anything) is
//! an external collaborator; the client only consumes [`PlaybackState`]
//! snapshots pushed through [`LobbyClient::update_playback`](crate::LobbyClient::update_playback).
//! "Nothing playing" is represented as `None` at that call site, not as a
//! variant here.

use serde::{Deserialize, Serialize};

/// One snapshot of the currently playing track.
///
/// `artist_names` is the comma-joined list as reported by the player; the
/// canonical artist for Artist-mode lobbies is the first entry, trimmed
/// (see [`primary_artist`](Self::primary_artist)).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlaybackState {
    /// Stable track identifier, absent while e.g. an advertisement plays.
    pub track_id: Option<String>,
    /// Human-readable track title.
    pub track_name: Option<String>,
    /// Comma-joined artist names, e.g. `"Daft Punk, Pharrell Williams"`.
    pub artist_names: Option<String>,
    /// Album title.
    pub album_name: Option<String>,
    /// Track length in milliseconds.
    pub duration_ms: u64,
    /// Playback position in milliseconds.
    pub position_ms: u64,
    /// Album art URL, if the player exposes one.
    pub album_image_url: Option<String>,
    /// Whether playback is currently running (vs. paused).
    pub is_playing: bool,
}

impl PlaybackState {
    /// The canonical artist: first comma-separated entry, trimmed.
    ///
    /// Returns `None` when the artist list is absent or blank.
    pub fn primary_artist(&self) -> Option<&str> {
        self.artist_names
            .as_deref()
            .and_then(|names| names.split(',').next())
            .map(str::trim)
            .filter(|artist| !artist.is_empty())
    }
}
