//! MIDI message types
//!
//! keycc only ever writes Control Change messages on channel 1, so this module
//! carries just that message plus the hex formatting used in debug logs.

use std::fmt;

/// Status nibble for Control Change
const CONTROL_CHANGE: u8 = 0xB0;

/// Value sent when a key toggles on
pub const VALUE_ON: u8 = 127;

/// Value sent when a key toggles off
pub const VALUE_OFF: u8 = 0;

/// Control Change message: channel (0-15), cc (0-127), value (0-127)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlChange {
    pub channel: u8,
    pub cc: u8,
    pub value: u8,
}

impl ControlChange {
    /// Control Change on channel 1 (status byte 0xB0)
    pub fn new(cc: u8, value: u8) -> Self {
        Self {
            channel: 0,
            cc,
            value,
        }
    }

    /// CC message for a toggle state: 127 when engaged, 0 when released
    pub fn toggle(cc: u8, engaged: bool) -> Self {
        Self::new(cc, if engaged { VALUE_ON } else { VALUE_OFF })
    }

    /// Encode to the three raw bytes written to the port
    pub fn to_bytes(&self) -> [u8; 3] {
        [
            CONTROL_CHANGE | (self.channel & 0x0F),
            self.cc & 0x7F,
            self.value & 0x7F,
        ]
    }
}

impl fmt::Display for ControlChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CC ch:{} cc:{} v:{}", self.channel + 1, self.cc, self.value)
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
