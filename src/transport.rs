//! MIDI output transport
//!
//! The supervisor talks to the outside world only through [`MidiTransport`]:
//! list ports, open one by index, send raw bytes, close. [`MidirTransport`] is
//! the real backend.

use midir::{MidiOutput, MidiOutputConnection};
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Port as reported by the transport at one point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDescriptor {
    pub index: usize,
    pub name: String,
}

impl PortDescriptor {
    pub fn new(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
        }
    }

    /// Label shown in the port list, e.g. `[1] loopMIDI Port`
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PortDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.index, self.name)
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to create MIDI output client: {0}")]
    Init(String),

    #[error("failed to read name of MIDI port {index}: {reason}")]
    PortName { index: usize, reason: String },

    #[error("MIDI port index {index} is out of range ({available} ports available)")]
    PortIndex { index: usize, available: usize },

    #[error("failed to open MIDI port {index}: {reason}")]
    Open { index: usize, reason: String },

    #[error("MIDI send failed: {0}")]
    Send(String),

    #[error("no MIDI port is open")]
    NotOpen,
}

/// Output side of the MIDI stack
///
/// Implementations hold at most one open connection.
pub trait MidiTransport: Send {
    /// Currently enumerable output ports, in transport order
    fn list_ports(&mut self) -> Result<Vec<PortDescriptor>, TransportError>;

    /// Open the port at `index`, replacing any open connection
    fn open(&mut self, index: usize) -> Result<(), TransportError>;

    /// Close the open connection, if any
    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Fire-and-forget write of one raw message
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError>;
}

/// [`MidiTransport`] backed by midir
pub struct MidirTransport {
    client_name: String,
    scanner: MidiOutput,
    connection: Option<MidiOutputConnection>,
}

// midir handles are only ever touched from behind the supervisor's mutex
unsafe impl Send for MidirTransport {}

impl MidirTransport {
    /// Create the output client. Failure here means MIDI is unusable on this
    /// machine and is treated as a startup error.
    pub fn new(client_name: &str) -> Result<Self, TransportError> {
        let scanner = MidiOutput::new(&format!("{}-scanner", client_name))
            .map_err(|e| TransportError::Init(e.to_string()))?;

        Ok(Self {
            client_name: client_name.to_string(),
            scanner,
            connection: None,
        })
    }
}

impl MidiTransport for MidirTransport {
    fn list_ports(&mut self) -> Result<Vec<PortDescriptor>, TransportError> {
        self.scanner
            .ports()
            .iter()
            .enumerate()
            .map(|(index, port)| {
                self.scanner
                    .port_name(port)
                    .map(|name| PortDescriptor::new(index, name))
                    .map_err(|e| TransportError::PortName {
                        index,
                        reason: e.to_string(),
                    })
            })
            .collect()
    }

    fn open(&mut self, index: usize) -> Result<(), TransportError> {
        self.close();

        // connect() consumes the client, so each connection gets a fresh one
        let output = MidiOutput::new(&self.client_name)
            .map_err(|e| TransportError::Init(e.to_string()))?;

        let ports = output.ports();
        let port = ports.get(index).ok_or(TransportError::PortIndex {
            index,
            available: ports.len(),
        })?;

        let connection = output
            .connect(port, &format!("{}-out", self.client_name))
            .map_err(|e| TransportError::Open {
                index,
                reason: e.to_string(),
            })?;

        debug!("MIDI OUT opened at index {}", index);
        self.connection = Some(connection);
        Ok(())
    }

    fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close();
            debug!("MIDI OUT closed");
        }
    }

    fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let connection = self.connection.as_mut().ok_or(TransportError::NotOpen)?;
        connection
            .send(bytes)
            .map_err(|e| TransportError::Send(e.to_string()))
    }
}

impl Drop for MidirTransport {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_label() {
        let port = PortDescriptor::new(2, "loopMIDI Port");
        assert_eq!(port.label(), "[2] loopMIDI Port");
    }

    #[test]
    fn test_error_messages() {
        let err = TransportError::PortIndex {
            index: 4,
            available: 2,
        };
        assert_eq!(
            err.to_string(),
            "MIDI port index 4 is out of range (2 ports available)"
        );
        assert_eq!(TransportError::NotOpen.to_string(), "no MIDI port is open");
    }
}
