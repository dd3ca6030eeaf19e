//! Control Change emission

use std::sync::Arc;
use tracing::debug;

use crate::keymap::KeyId;
use crate::midi::ControlChange;
use crate::shell::LogSink;
use crate::supervisor::{DeviceSupervisor, SendOutcome};

/// Builds CC messages and writes them through the supervisor's active handle
#[derive(Clone)]
pub struct MessageEmitter {
    supervisor: Arc<DeviceSupervisor>,
    sink: Arc<dyn LogSink>,
}

impl MessageEmitter {
    pub fn new(supervisor: Arc<DeviceSupervisor>, sink: Arc<dyn LogSink>) -> Self {
        Self { supervisor, sink }
    }

    /// Send `message` on behalf of `key`.
    ///
    /// Without an open port the message is dropped; that is never an error.
    pub fn emit(&self, key: &KeyId, message: ControlChange) -> SendOutcome {
        let outcome = self.supervisor.send(&message.to_bytes());

        match outcome {
            SendOutcome::Sent => self.sink.log(&format!(
                "Key '{}': Control Change: Control {}, Value: {}",
                key, message.cc, message.value
            )),
            SendOutcome::NotConnected => {
                debug!("Key '{}': {} dropped, no MIDI port connected", key, message)
            },
        }
        outcome
    }
}
