//! keycc - keyboard keys as toggling MIDI Control Change buttons
//!
//! Each mapped key flips between CC value 127 and 0 on every press. Output goes
//! to one MIDI port that is re-bound automatically when the device goes away
//! and comes back.

pub mod config;
pub mod controller;
pub mod emitter;
pub mod keyboard;
pub mod keymap;
pub mod listener;
pub mod midi;
pub mod paths;
pub mod run_state;
pub mod shell;
pub mod supervisor;
pub mod toggle;
pub mod transport;

#[cfg(test)]
mod testing;

pub use config::AppConfig;
pub use controller::Controller;
pub use keymap::{KeyId, KeyMap};
pub use run_state::RunState;
