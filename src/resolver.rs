//! Lobby key resolution.
//!
//! A lobby is addressed by a [`LobbyKey`]: either the catch-all `"general"`
//! lobby, the raw track id (Song mode), or the URL-escaped artist name
//! (Artist mode). [`resolve`] is a pure function of the active mode and the
//! now-playing signal — it must be re-evaluated on every change to any of
//! its inputs, and equal inputs always produce equal keys.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::playback::PlaybackState;

/// Key of the catch-all lobby used when nothing relevant is playing.
pub const GENERAL_LOBBY: &str = "general";

/// Characters that `encodeURIComponent` leaves unescaped. Artist-mode keys
/// must escape exactly this set to address the same channel as the remote's
/// own clients.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

// ── Lobby mode ──────────────────────────────────────────────────────

/// Selects whether the lobby key derives from the track id or the artist.
///
/// The mode survives reloads — persist it through a
/// [`SessionStore`](crate::store::SessionStore) using [`LobbyMode::as_str`]
/// and [`LobbyMode::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LobbyMode {
    /// One lobby per track id.
    #[default]
    Song,
    /// One lobby per (first) artist name.
    Artist,
}

impl LobbyMode {
    /// Stable string form, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Song => "song",
            Self::Artist => "artist",
        }
    }

    /// Parse the string form produced by [`as_str`](Self::as_str).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "song" => Some(Self::Song),
            "artist" => Some(Self::Artist),
            _ => None,
        }
    }
}

// ── Lobby key ───────────────────────────────────────────────────────

/// String identifier addressing one lobby channel on the transport.
///
/// Keys compare by value: two sessions are "the same lobby" iff their keys
/// are equal strings, regardless of how the keys were produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LobbyKey(String);

impl LobbyKey {
    /// The catch-all `"general"` lobby.
    pub fn general() -> Self {
        Self(GENERAL_LOBBY.to_string())
    }

    /// Returns `true` for the catch-all lobby.
    pub fn is_general(&self) -> bool {
        self.0 == GENERAL_LOBBY
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Browser-style path reflection of this key: `/lobby/<key>`.
    ///
    /// Purely cosmetic — the path imposes no contract beyond being derived
    /// from the same key value the transport is addressed with.
    pub fn lobby_path(&self) -> String {
        format!("/lobby/{}", self.0)
    }
}

impl std::fmt::Display for LobbyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Resolution ──────────────────────────────────────────────────────

/// Resolve the lobby key for the given mode and now-playing fields.
///
/// - Artist mode with a non-empty artist name → the URL-escaped artist.
/// - Song mode with a non-empty track id → the track id unchanged.
/// - Anything else → the `"general"` lobby.
///
/// Pure and idempotent; no side effects.
pub fn resolve(mode: LobbyMode, track_id: Option<&str>, artist_name: Option<&str>) -> LobbyKey {
    match mode {
        LobbyMode::Artist => {
            if let Some(artist) = artist_name.filter(|a| !a.is_empty()) {
                return LobbyKey(utf8_percent_encode(artist, URI_COMPONENT).to_string());
            }
        }
        LobbyMode::Song => {
            if let Some(id) = track_id.filter(|t| !t.is_empty()) {
                return LobbyKey(id.to_string());
            }
        }
    }
    LobbyKey::general()
}

/// Resolve the lobby key directly from an optional playback snapshot.
///
/// `None` (nothing playing) always resolves to the `"general"` lobby.
pub fn resolve_playback(mode: LobbyMode, playback: Option<&PlaybackState>) -> LobbyKey {
    match playback {
        Some(state) => resolve(mode, state.track_id.as_deref(), state.primary_artist()),
        None => LobbyKey::general(),
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn song_mode_uses_track_id_unchanged() {
        let key = resolve(LobbyMode::Song, Some("abc123"), Some("Radiohead"));
        assert_eq!(key.as_str(), "abc123");
    }

    #[test]
    fn artist_mode_uses_artist_name() {
        let key = resolve(LobbyMode::Artist, Some("abc123"), Some("Radiohead"));
        assert_eq!(key.as_str(), "Radiohead");
    }

    #[test]
    fn nothing_playing_resolves_to_general() {
        assert_eq!(resolve(LobbyMode::Song, None, None).as_str(), "general");
        assert_eq!(resolve(LobbyMode::Artist, None, None).as_str(), "general");
    }

    #[test]
    fn empty_fields_resolve_to_general() {
        assert!(resolve(LobbyMode::Song, Some(""), Some("Radiohead")).is_general());
        assert!(resolve(LobbyMode::Artist, Some("abc123"), Some("")).is_general());
    }

    #[test]
    fn artist_mode_without_artist_falls_back_to_general_not_song() {
        // Mode selects the field; it never borrows the other mode's field.
        let key = resolve(LobbyMode::Artist, Some("abc123"), None);
        assert!(key.is_general());
    }

    #[test]
    fn artist_keys_are_uri_component_escaped() {
        let key = resolve(LobbyMode::Artist, None, Some("AC/DC"));
        assert_eq!(key.as_str(), "AC%2FDC");

        let key = resolve(LobbyMode::Artist, None, Some("Daft Punk"));
        assert_eq!(key.as_str(), "Daft%20Punk");

        // encodeURIComponent's unescaped specials stay literal.
        let key = resolve(LobbyMode::Artist, None, Some("!*'()-_.~"));
        assert_eq!(key.as_str(), "!*'()-_.~");
    }

    #[test]
    fn resolve_is_deterministic() {
        let a = resolve(LobbyMode::Artist, Some("x"), Some("Björk"));
        let b = resolve(LobbyMode::Artist, Some("x"), Some("Björk"));
        assert_eq!(a, b);
    }

    #[test]
    fn lobby_path_reflects_key() {
        assert_eq!(LobbyKey::general().lobby_path(), "/lobby/general");
        let key = resolve(LobbyMode::Song, Some("abc123"), None);
        assert_eq!(key.lobby_path(), "/lobby/abc123");
    }

    #[test]
    fn mode_string_forms_round_trip() {
        assert_eq!(LobbyMode::parse(LobbyMode::Song.as_str()), Some(LobbyMode::Song));
        assert_eq!(LobbyMode::parse(LobbyMode::Artist.as_str()), Some(LobbyMode::Artist));
        assert_eq!(LobbyMode::parse("album"), None);
    }

    #[test]
    fn resolve_playback_none_is_general() {
        assert!(resolve_playback(LobbyMode::Song, None).is_general());
    }
}
