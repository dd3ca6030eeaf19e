//! Test doubles for the transport and log sink

use parking_lot::Mutex;
use std::sync::Arc;

use crate::shell::LogSink;
use crate::transport::{MidiTransport, PortDescriptor, TransportError};

#[derive(Debug, Default)]
pub struct MockState {
    pub ports: Vec<String>,
    pub open: Option<usize>,
    /// Bytes written, tagged with the index of the port that was open
    pub sent: Vec<(usize, Vec<u8>)>,
    pub opened: Vec<usize>,
    pub closes: usize,
    pub send_attempts: usize,
    pub fail_open: bool,
    pub fail_send: bool,
    pub fail_list: bool,
}

/// In-memory transport; clones share state so tests can plug and unplug ports
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    pub state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn with_ports(names: &[&str]) -> Self {
        let transport = Self::default();
        transport.set_ports(names);
        transport
    }

    pub fn set_ports(&self, names: &[&str]) {
        self.state.lock().ports = names.iter().map(|n| n.to_string()).collect();
    }

    pub fn open_index(&self) -> Option<usize> {
        self.state.lock().open
    }

    pub fn sent(&self) -> Vec<(usize, Vec<u8>)> {
        self.state.lock().sent.clone()
    }
}

impl MidiTransport for MockTransport {
    fn list_ports(&mut self) -> Result<Vec<PortDescriptor>, TransportError> {
        let state = self.state.lock();
        if state.fail_list {
            return Err(TransportError::Init("mock enumeration failure".to_string()));
        }
        Ok(state
            .ports
            .iter()
            .enumerate()
            .map(|(index, name)| PortDescriptor::new(index, name.clone()))
            .collect())
    }

    fn open(&mut self, index: usize) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.open.take().is_some() {
            state.closes += 1;
        }
        if state.fail_open {
            return Err(TransportError::Open {
                index,
                reason: "mock open failure".to_string(),
            });
        }
        if index >= state.ports.len() {
            return Err(TransportError::PortIndex {
                index,
                available: state.ports.len(),
            });
        }
        state.open = Some(index);
        state.opened.push(index);
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.state.lock();
        if state.open.take().is_some() {
            state.closes += 1;
        }
    }

    fn is_open(&self) -> bool {
        self.state.lock().open.is_some()
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.send_attempts += 1;
        let index = state.open.ok_or(TransportError::NotOpen)?;
        if state.fail_send {
            return Err(TransportError::Send("mock send failure".to_string()));
        }
        state.sent.push((index, bytes.to_vec()));
        Ok(())
    }
}

/// Keeps every logged line for inspection
#[derive(Debug, Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.lines.lock().iter().filter(|l| l.contains(needle)).count()
    }
}

impl LogSink for RecordingSink {
    fn log(&self, line: &str) {
        self.lines.lock().push(line.to_string());
    }
}
