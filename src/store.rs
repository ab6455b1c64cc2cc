//! Session-scoped persistence.
//!
//! The username lives for one session; the lobby mode survives reloads.
//! Rather than reading ambient storage at arbitrary points, both are held
//! in an explicit [`SessionContext`] loaded once at startup and saved
//! through a [`SessionStore`] the host injects — a browser shell would back
//! it with session storage, a native host with a config file, tests with
//! [`MemoryStore`].

use std::collections::HashMap;
use std::sync::Mutex;

use crate::identity::Username;
use crate::resolver::LobbyMode;

/// Store key for the per-session username.
pub const USERNAME_KEY: &str = "username";

/// Store key for the persisted lobby mode.
pub const LOBBY_MODE_KEY: &str = "lobby_mode";

/// String key/value persistence for session-scoped fields.
///
/// Object-safe so hosts can hand the core a `&dyn SessionStore`.
pub trait SessionStore {
    /// Load the value stored under `key`, if any.
    fn load(&self, key: &str) -> Option<String>;

    /// Save `value` under `key`, replacing any previous value.
    fn save(&self, key: &str, value: &str);
}

/// In-memory [`SessionStore`], for tests and hosts without real storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn load(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
    }
}

/// The session-scoped fields the client needs at startup.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// This session's display name.
    pub username: Username,
    /// The persisted lobby mode.
    pub mode: LobbyMode,
}

impl SessionContext {
    /// Load the context from `store`, generating and saving a username on
    /// first use. An unknown or missing stored mode falls back to the
    /// default ([`LobbyMode::Song`]).
    pub fn load_or_init(store: &dyn SessionStore) -> Self {
        let username = match store.load(USERNAME_KEY) {
            Some(name) => Username::new(name),
            None => {
                let name = Username::generate();
                store.save(USERNAME_KEY, name.as_str());
                name
            }
        };
        let mode = store
            .load(LOBBY_MODE_KEY)
            .as_deref()
            .and_then(LobbyMode::parse)
            .unwrap_or_default();
        Self { username, mode }
    }

    /// Switch mode and persist the choice.
    pub fn set_mode(&mut self, mode: LobbyMode, store: &dyn SessionStore) {
        self.mode = mode;
        store.save(LOBBY_MODE_KEY, mode.as_str());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn first_load_generates_and_saves_a_username() {
        let store = MemoryStore::new();
        let ctx = SessionContext::load_or_init(&store);
        assert_eq!(
            store.load(USERNAME_KEY).as_deref(),
            Some(ctx.username.as_str())
        );
        assert_eq!(ctx.mode, LobbyMode::Song);
    }

    #[test]
    fn second_load_reuses_the_saved_username() {
        let store = MemoryStore::new();
        let first = SessionContext::load_or_init(&store);
        let second = SessionContext::load_or_init(&store);
        assert_eq!(first.username, second.username);
    }

    #[test]
    fn mode_round_trips_through_the_store() {
        let store = MemoryStore::new();
        let mut ctx = SessionContext::load_or_init(&store);
        ctx.set_mode(LobbyMode::Artist, &store);

        let reloaded = SessionContext::load_or_init(&store);
        assert_eq!(reloaded.mode, LobbyMode::Artist);
    }

    #[test]
    fn unknown_stored_mode_falls_back_to_default() {
        let store = MemoryStore::new();
        store.save(LOBBY_MODE_KEY, "album");
        let ctx = SessionContext::load_or_init(&store);
        assert_eq!(ctx.mode, LobbyMode::Song);
    }
}
