//! Per-session display identities.
//!
//! Every client session gets one [`Username`] of the form
//! `{Color}-{Animal}-{Number}`, drawn from fixed vocabularies plus a number
//! in `1..=999`. Names are not globally unique — collisions are possible and
//! accepted, since the server treats names as opaque display strings.

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Color vocabulary for generated usernames.
pub const COLORS: &[&str] = &[
    "Red", "Blue", "Green", "Yellow", "Purple", "Orange", "Pink", "Teal", "Cyan", "Indigo",
    "Violet", "Lime", "Amber", "Brown", "Gray", "Black", "White",
];

/// Animal vocabulary for generated usernames.
pub const ANIMALS: &[&str] = &[
    "Fox", "Penguin", "Wolf", "Tiger", "Bear", "Otter", "Hawk", "Lion", "Koala", "Panda", "Fawn",
    "Seal", "Moose", "Bison", "Moth", "Crab", "Marten", "Jay", "Mole", "Mink", "Cat", "Dog",
    "Rabbit", "Horse", "Eagle", "Shark", "Dolphin", "Falcon", "Swan", "Goose",
];

/// A per-session display name, e.g. `"Teal-Otter-417"`.
///
/// Generated once at session start and persisted for the lifetime of the
/// session (see [`SessionContext`](crate::store::SessionContext)).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    /// Wrap an existing name, e.g. one loaded from a session store.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Generate a fresh random `{Color}-{Animal}-{Number}` name.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let color = COLORS.choose(&mut rng).copied().unwrap_or("Gray");
        let animal = ANIMALS.choose(&mut rng).copied().unwrap_or("Fox");
        let number: u16 = rng.random_range(1..=999);
        Self(format!("{color}-{animal}-{number}"))
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split a name back into its `(color, animal)` components.
    ///
    /// Presentation layers use these to pick an avatar color and glyph.
    /// Returns `None` when the name does not have at least two
    /// dash-separated parts (names are not validated on construction).
    pub fn components(&self) -> Option<(&str, &str)> {
        let mut parts = self.0.split('-');
        let color = parts.next()?;
        let animal = parts.next()?;
        Some((color, animal))
    }
}

impl std::fmt::Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
