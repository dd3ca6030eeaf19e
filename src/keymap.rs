//! Key to controller number mapping
//!
//! Built once at startup and never mutated afterwards.

use std::collections::HashMap;
use std::fmt;

/// Identifier of a physical key ("a", "7", "esc", "f1", ...)
///
/// Stored lowercase so that config entries are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId(String);

impl KeyId {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for KeyId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// MIDI CC index (0-127)
pub type ControllerNumber = u8;

/// Immutable mapping from key to controller number
#[derive(Debug, Clone, Default)]
pub struct KeyMap {
    entries: HashMap<KeyId, ControllerNumber>,
}

impl KeyMap {
    /// Digits and lowercase letters, each mapped to `60 + (ordinal % 36)`
    pub fn defaults() -> Self {
        let entries = (b'0'..=b'9')
            .chain(b'a'..=b'z')
            .map(|ordinal| {
                (
                    KeyId::new((ordinal as char).to_string()),
                    default_controller(ordinal),
                )
            })
            .collect();
        Self { entries }
    }

    /// Defaults with `overrides` applied on top
    pub fn with_overrides(overrides: Option<&HashMap<KeyId, ControllerNumber>>) -> Self {
        let mut map = Self::defaults();
        if let Some(overrides) = overrides {
            map.entries
                .extend(overrides.iter().map(|(key, cc)| (key.clone(), *cc)));
        }
        map
    }

    /// Only the given keys, no defaults
    pub fn custom(entries: HashMap<KeyId, ControllerNumber>) -> Self {
        Self { entries }
    }

    pub fn resolve(&self, key: &KeyId) -> Option<ControllerNumber> {
        self.entries.get(key).copied()
    }

    pub fn contains(&self, key: &KeyId) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &KeyId> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn default_controller(ordinal: u8) -> ControllerNumber {
    60 + (ordinal % 36)
}
