//! Global keyboard hook, backed by `rdev`.
//!
//! `rdev::listen()` blocks its thread for the life of the process and offers
//! no way to stop it, so the hook runs on a dedicated OS thread and forwards
//! events for registered keys into a tokio channel. The hook is passive: key
//! presses still reach every other application.

use rdev::{EventType, Key};
use std::collections::HashSet;
use std::thread;
use tokio::sync::mpsc;
use tracing::{debug, error, trace};

use crate::keymap::KeyId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventKind {
    Down,
    Up,
}

/// One key transition delivered by the hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: KeyId,
    pub kind: KeyEventKind,
}

impl KeyEvent {
    pub fn down(key: impl Into<KeyId>) -> Self {
        Self {
            key: key.into(),
            kind: KeyEventKind::Down,
        }
    }

    pub fn up(key: impl Into<KeyId>) -> Self {
        Self {
            key: key.into(),
            kind: KeyEventKind::Up,
        }
    }
}

/// Name used for `key` in config files, or `None` for keys we don't expose
pub fn key_name(key: Key) -> Option<&'static str> {
    let name = match key {
        Key::Num0 => "0",
        Key::Num1 => "1",
        Key::Num2 => "2",
        Key::Num3 => "3",
        Key::Num4 => "4",
        Key::Num5 => "5",
        Key::Num6 => "6",
        Key::Num7 => "7",
        Key::Num8 => "8",
        Key::Num9 => "9",

        Key::KeyA => "a",
        Key::KeyB => "b",
        Key::KeyC => "c",
        Key::KeyD => "d",
        Key::KeyE => "e",
        Key::KeyF => "f",
        Key::KeyG => "g",
        Key::KeyH => "h",
        Key::KeyI => "i",
        Key::KeyJ => "j",
        Key::KeyK => "k",
        Key::KeyL => "l",
        Key::KeyM => "m",
        Key::KeyN => "n",
        Key::KeyO => "o",
        Key::KeyP => "p",
        Key::KeyQ => "q",
        Key::KeyR => "r",
        Key::KeyS => "s",
        Key::KeyT => "t",
        Key::KeyU => "u",
        Key::KeyV => "v",
        Key::KeyW => "w",
        Key::KeyX => "x",
        Key::KeyY => "y",
        Key::KeyZ => "z",

        // Function keys
        Key::F1 => "f1",
        Key::F2 => "f2",
        Key::F3 => "f3",
        Key::F4 => "f4",
        Key::F5 => "f5",
        Key::F6 => "f6",
        Key::F7 => "f7",
        Key::F8 => "f8",
        Key::F9 => "f9",
        Key::F10 => "f10",
        Key::F11 => "f11",
        Key::F12 => "f12",

        // Navigation / control
        Key::Escape => "esc",
        Key::Space => "space",
        Key::Return => "enter",
        Key::Tab => "tab",
        Key::Backspace => "backspace",
        Key::Delete => "delete",
        Key::Insert => "insert",
        Key::Home => "home",
        Key::End => "end",
        Key::PageUp => "page up",
        Key::PageDown => "page down",
        Key::UpArrow => "up",
        Key::DownArrow => "down",
        Key::LeftArrow => "left",
        Key::RightArrow => "right",

        // Punctuation
        Key::Minus => "-",
        Key::Equal => "=",
        Key::LeftBracket => "[",
        Key::RightBracket => "]",
        Key::SemiColon => ";",
        Key::Quote => "'",
        Key::BackSlash => "\\",
        Key::Comma => ",",
        Key::Dot => ".",
        Key::Slash => "/",
        Key::BackQuote => "`",

        _ => return None,
    };
    Some(name)
}

/// Translate a raw hook event into a [`KeyEvent`]
pub fn translate(event_type: &EventType) -> Option<KeyEvent> {
    let (key, kind) = match *event_type {
        EventType::KeyPress(key) => (key, KeyEventKind::Down),
        EventType::KeyRelease(key) => (key, KeyEventKind::Up),
        _ => return None,
    };
    key_name(key).map(|name| KeyEvent {
        key: KeyId::new(name),
        kind,
    })
}

/// Translate and keep only events for registered keys
pub fn accept(registered: &HashSet<KeyId>, event_type: &EventType) -> Option<KeyEvent> {
    translate(event_type).filter(|event| registered.contains(&event.key))
}

/// Handle to the hook thread
pub struct KeyHook {
    registered: usize,
    _thread: thread::JoinHandle<()>,
}

impl KeyHook {
    /// Start listening for `registered` keys; events go to `events`.
    ///
    /// The send side never blocks the OS hook: when the channel is full or
    /// closed the event is dropped.
    pub fn spawn(registered: HashSet<KeyId>, events: mpsc::Sender<KeyEvent>) -> std::io::Result<Self> {
        let count = registered.len();
        let thread = thread::Builder::new()
            .name("keyboard-hook".to_string())
            .spawn(move || {
                debug!("Keyboard hook listening for {} keys", registered.len());
                let result = rdev::listen(move |event| {
                    if let Some(key_event) = accept(&registered, &event.event_type) {
                        trace!("Hook: {:?}", key_event);
                        if let Err(e) = events.try_send(key_event) {
                            trace!("Key event dropped: {}", e);
                        }
                    }
                });
                if let Err(e) = result {
                    error!("Keyboard hook failed: {:?}", e);
                }
            })?;

        Ok(Self {
            registered: count,
            _thread: thread,
        })
    }

    pub fn registered(&self) -> usize {
        self.registered
    }
}
