//! MIDI output device supervisor
//!
//! Owns the one open output connection and keeps it bound across device churn:
//! - `connect` opens the selected port, falling back to the first port
//! - `reconnect_if_needed` is polled by the monitor task and re-binds when the
//!   bound port vanishes (or when nothing is bound but ports exist)
//! - `on_user_port_change` re-binds immediately on user request
//!
//! Transport and bound port live behind one mutex, so close-then-open is a
//! single critical section no matter which caller triggers it.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::midi::format_hex;
use crate::run_state::RunState;
use crate::shell::LogSink;
use crate::transport::{MidiTransport, PortDescriptor};

/// A user's or config's choice of output port
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortSelection {
    /// Full list label, `[index] name`; both parts must still match
    Label { index: usize, name: String },
    /// Bare index
    Index(usize),
    /// Case-insensitive substring of the port name
    Name(String),
}

impl PortSelection {
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        if let Some(rest) = input.strip_prefix('[') {
            if let Some((index, name)) = rest.split_once(']') {
                if let Ok(index) = index.trim().parse() {
                    return Some(Self::Label {
                        index,
                        name: name.trim().to_string(),
                    });
                }
            }
        }

        if let Ok(index) = input.parse() {
            return Some(Self::Index(index));
        }

        Some(Self::Name(input.to_string()))
    }

    /// Find the selected port in a freshly enumerated list
    pub fn find<'a>(&self, ports: &'a [PortDescriptor]) -> Option<&'a PortDescriptor> {
        match self {
            Self::Label { index, name } => ports
                .iter()
                .find(|p| p.index == *index && p.name == *name),
            Self::Index(index) => ports.iter().find(|p| p.index == *index),
            Self::Name(pattern) => {
                let pattern = pattern.to_lowercase();
                ports
                    .iter()
                    .find(|p| p.name.to_lowercase().contains(&pattern))
            },
        }
    }
}

impl fmt::Display for PortSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label { index, name } => write!(f, "[{}] {}", index, name),
            Self::Index(index) => write!(f, "{}", index),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// Connection status shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected { port: PortDescriptor },
    Disconnected,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected { port } => write!(f, "connected to {}", port),
            Self::Disconnected => f.write_str("disconnected"),
        }
    }
}

/// Result of a connect attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected(PortDescriptor),
    /// Enumeration returned no ports
    NoPorts,
    /// Enumeration or open failed; nothing is bound
    Failed,
    /// Shutdown already began; nothing was opened
    Stopped,
}

/// Result of one monitor tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthCheck {
    /// Bound port is still enumerable
    Healthy,
    /// Nothing bound and nothing to bind to
    Idle,
    /// Stale or missing binding was replaced
    Rebound(ConnectOutcome),
    /// Enumeration failed or shutdown is in progress
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// No open handle; the message was dropped
    NotConnected,
}

struct Inner {
    transport: Box<dyn MidiTransport>,
    /// Descriptor of the port that was actually opened
    bound: Option<PortDescriptor>,
}

impl Inner {
    fn close(&mut self) -> Option<PortDescriptor> {
        if self.transport.is_open() {
            self.transport.close();
        }
        self.bound.take()
    }
}

pub struct DeviceSupervisor {
    inner: Mutex<Inner>,
    run_state: RunState,
    sink: Arc<dyn LogSink>,
}

impl DeviceSupervisor {
    pub fn new(transport: Box<dyn MidiTransport>, run_state: RunState, sink: Arc<dyn LogSink>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                transport,
                bound: None,
            }),
            run_state,
            sink,
        }
    }

    /// Live port list; empty (with a warning) when enumeration fails
    pub fn list_ports(&self) -> Vec<PortDescriptor> {
        match self.inner.lock().transport.list_ports() {
            Ok(ports) => ports,
            Err(e) => {
                warn!("Failed to enumerate MIDI ports: {}", e);
                Vec::new()
            },
        }
    }

    pub fn bound_port(&self) -> Option<PortDescriptor> {
        self.inner.lock().bound.clone()
    }

    pub fn status(&self) -> ConnectionStatus {
        match self.bound_port() {
            Some(port) => ConnectionStatus::Connected { port },
            None => ConnectionStatus::Disconnected,
        }
    }

    /// Open the selected port, or the first port when the selection is absent
    /// or no longer enumerable. With no ports at all the run state is switched
    /// off.
    pub fn connect(&self, selection: Option<&PortSelection>) -> ConnectOutcome {
        let mut inner = self.inner.lock();
        if !self.run_state.is_running() {
            debug!("Connect ignored, shutting down");
            return ConnectOutcome::Stopped;
        }
        let outcome = self.connect_locked(&mut inner, selection);
        self.stop_if_no_ports(&outcome);
        outcome
    }

    /// Re-bind to a port picked in the UI
    pub fn on_user_port_change(&self, selection: &str) -> ConnectOutcome {
        let selection = PortSelection::parse(selection);
        debug!("User port change: {:?}", selection);

        let mut inner = self.inner.lock();
        if !self.run_state.is_running() {
            debug!("Port change ignored, shutting down");
            return ConnectOutcome::Stopped;
        }
        if let Some(old) = inner.close() {
            debug!("Closed MIDI port {}", old);
        }
        let outcome = self.connect_locked(&mut inner, selection.as_ref());
        self.stop_if_no_ports(&outcome);
        outcome
    }

    /// One monitor tick
    pub fn reconnect_if_needed(&self) -> HealthCheck {
        let mut inner = self.inner.lock();
        if !self.run_state.is_running() {
            return HealthCheck::Skipped;
        }

        let ports = match inner.transport.list_ports() {
            Ok(ports) => ports,
            Err(e) => {
                debug!("Port enumeration failed during health check: {}", e);
                return HealthCheck::Skipped;
            },
        };

        match inner.bound.clone() {
            Some(bound) if ports.iter().any(|p| p.name == bound.name) => {
                trace!("MIDI port {} healthy", bound);
                HealthCheck::Healthy
            },
            Some(bound) => {
                self.sink
                    .log(&format!("MIDI port disappeared: {}", bound.name));
                inner.close();
                HealthCheck::Rebound(self.connect_locked(&mut inner, None))
            },
            None if ports.is_empty() => HealthCheck::Idle,
            None => {
                debug!("No MIDI port bound, {} available", ports.len());
                HealthCheck::Rebound(self.connect_locked(&mut inner, None))
            },
        }
    }

    /// Write one message through the open handle.
    ///
    /// A failed write closes the handle; the monitor re-binds on its next tick.
    pub fn send(&self, bytes: &[u8]) -> SendOutcome {
        let mut inner = self.inner.lock();
        let Some(port) = inner.bound.clone() else {
            trace!("TX skipped (not connected): {}", format_hex(bytes));
            return SendOutcome::NotConnected;
        };

        match inner.transport.send(bytes) {
            Ok(()) => {
                debug!("TX -> {}: {}", port, format_hex(bytes));
                SendOutcome::Sent
            },
            Err(e) => {
                warn!("MIDI send to {} failed: {}", port, e);
                inner.close();
                self.sink
                    .log(&format!("Lost MIDI port {} ({}), waiting for reconnect", port.name, e));
                SendOutcome::NotConnected
            },
        }
    }

    /// Close the handle for shutdown
    pub fn release(&self) {
        if let Some(port) = self.inner.lock().close() {
            debug!("Released MIDI port {}", port);
        }
    }

    fn connect_locked(&self, inner: &mut Inner, selection: Option<&PortSelection>) -> ConnectOutcome {
        inner.close();

        let ports = match inner.transport.list_ports() {
            Ok(ports) => ports,
            Err(e) => {
                warn!("Failed to enumerate MIDI ports: {}", e);
                self.sink
                    .log(&format!("Failed to enumerate MIDI ports: {}", e));
                return ConnectOutcome::Failed;
            },
        };

        let selected = selection.and_then(|s| s.find(&ports));
        let Some(target) = selected.or_else(|| ports.first()).cloned() else {
            self.sink.log("No available MIDI ports found.");
            return ConnectOutcome::NoPorts;
        };

        if let Err(e) = inner.transport.open(target.index) {
            warn!("Failed to open MIDI port {}: {}", target, e);
            self.sink
                .log(&format!("Failed to open MIDI port {}: {}", target, e));
            return ConnectOutcome::Failed;
        }

        let line = match (selection, selected) {
            (_, Some(_)) => format!("Successfully connected to MIDI port: {}", target),
            (Some(wanted), None) => format!(
                "MIDI port '{}' not available, connected to default port: {}",
                wanted, target.name
            ),
            (None, None) => format!(
                "No specific port selected, connected to default port: {}",
                target.name
            ),
        };
        self.sink.log(&line);

        inner.bound = Some(target.clone());
        ConnectOutcome::Connected(target)
    }

    fn stop_if_no_ports(&self, outcome: &ConnectOutcome) {
        if *outcome == ConnectOutcome::NoPorts && self.run_state.stop() {
            warn!("No MIDI output ports available, stopping");
        }
    }
}

/// Monitor task: one health check per `every` until the run state stops
pub async fn run_monitor(supervisor: Arc<DeviceSupervisor>, run_state: RunState, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // interval() fires immediately; the first check belongs one period after connect
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {},
            _ = run_state.stopped() => break,
        }
        if !run_state.is_running() {
            break;
        }

        match supervisor.reconnect_if_needed() {
            HealthCheck::Rebound(outcome) => debug!("Monitor re-bound MIDI output: {:?}", outcome),
            check => trace!("Monitor tick: {:?}", check),
        }
    }
    debug!("Device monitor stopped");
}
