//! Key event dispatch
//!
//! Every event from the hook goes through [`EventListener::dispatch`]:
//! - shutdown key down: stop the run state
//! - mapped key down: flip its toggle and emit 127 / 0
//! - key up, or any unmapped key: nothing

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use crate::emitter::MessageEmitter;
use crate::keyboard::{KeyEvent, KeyEventKind};
use crate::keymap::{ControllerNumber, KeyId, KeyMap};
use crate::midi::ControlChange;
use crate::run_state::RunState;
use crate::supervisor::SendOutcome;
use crate::toggle::ToggleStateStore;

/// What a single event led to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Shutdown,
    Toggled {
        key: KeyId,
        control: ControllerNumber,
        value: u8,
        outcome: SendOutcome,
    },
    Ignored,
}

pub struct EventListener {
    keymap: Arc<KeyMap>,
    toggles: Arc<ToggleStateStore>,
    emitter: MessageEmitter,
    run_state: RunState,
    shutdown_key: KeyId,
}

impl EventListener {
    pub fn new(
        keymap: Arc<KeyMap>,
        toggles: Arc<ToggleStateStore>,
        emitter: MessageEmitter,
        run_state: RunState,
        shutdown_key: KeyId,
    ) -> Self {
        Self {
            keymap,
            toggles,
            emitter,
            run_state,
            shutdown_key,
        }
    }

    pub fn dispatch(&self, event: &KeyEvent) -> Dispatch {
        if event.kind == KeyEventKind::Up {
            return Dispatch::Ignored;
        }

        if event.key == self.shutdown_key {
            if self.run_state.stop() {
                info!("Shutdown key '{}' pressed", event.key);
            }
            return Dispatch::Shutdown;
        }

        let Some(control) = self.keymap.resolve(&event.key) else {
            trace!("Unmapped key '{}' ignored", event.key);
            return Dispatch::Ignored;
        };
        let Some(engaged) = self.toggles.toggle(&event.key) else {
            return Dispatch::Ignored;
        };

        let message = ControlChange::toggle(control, engaged);
        let outcome = self.emitter.emit(&event.key, message);
        Dispatch::Toggled {
            key: event.key.clone(),
            control,
            value: message.value,
            outcome,
        }
    }

    /// Drain hook events until shutdown or until the hook side goes away.
    ///
    /// Wakes at least every `poll` to notice a stopped run state.
    pub async fn run(self, mut events: mpsc::Receiver<KeyEvent>, poll: Duration) {
        let mut keepalive = tokio::time::interval(poll);
        keepalive.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        while self.run_state.is_running() {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        self.dispatch(&event);
                    },
                    None => {
                        debug!("Key event channel closed");
                        break;
                    },
                },
                _ = keepalive.tick() => {},
            }
        }
        debug!("Event listener stopped");
    }
}
