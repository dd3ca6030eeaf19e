//! Per-key toggle state
//!
//! One boolean per mapped key, all starting disengaged. DashMap shards the
//! locking so different keys never contend, while the write guard on a single
//! entry makes flip-and-read atomic for that key.

use dashmap::DashMap;

use crate::keymap::{KeyId, KeyMap};

#[derive(Debug, Default)]
pub struct ToggleStateStore {
    states: DashMap<KeyId, bool>,
}

impl ToggleStateStore {
    /// One disengaged entry per key in `keymap`
    pub fn new(keymap: &KeyMap) -> Self {
        let states = DashMap::with_capacity(keymap.len());
        for key in keymap.keys() {
            states.insert(key.clone(), false);
        }
        Self { states }
    }

    /// Flip the state of `key` and return the new value.
    ///
    /// Returns `None` for keys that were not in the map at construction.
    pub fn toggle(&self, key: &KeyId) -> Option<bool> {
        let mut state = self.states.get_mut(key)?;
        *state = !*state;
        Some(*state)
    }

    pub fn current(&self, key: &KeyId) -> Option<bool> {
        self.states.get(key).map(|state| *state)
    }
}
