//! Controller - wires key map, toggle state, device supervisor and the two
//! background tasks together, and exposes the hooks a front end calls.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::emitter::MessageEmitter;
use crate::keyboard::KeyEvent;
use crate::keymap::{KeyId, KeyMap};
use crate::listener::EventListener;
use crate::run_state::RunState;
use crate::shell::LogSink;
use crate::supervisor::{run_monitor, ConnectOutcome, ConnectionStatus, DeviceSupervisor, PortSelection};
use crate::toggle::ToggleStateStore;
use crate::transport::{MidiTransport, PortDescriptor};

pub struct Controller {
    keymap: Arc<KeyMap>,
    toggles: Arc<ToggleStateStore>,
    supervisor: Arc<DeviceSupervisor>,
    run_state: RunState,
    sink: Arc<dyn LogSink>,

    shutdown_key: KeyId,
    port: Option<PortSelection>,
    monitor_interval: Duration,
    listener_poll: Duration,

    started: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller {
    pub fn new(config: &AppConfig, transport: Box<dyn MidiTransport>, sink: Arc<dyn LogSink>) -> Self {
        let run_state = RunState::new();
        let keymap = Arc::new(config.keymap());
        let toggles = Arc::new(ToggleStateStore::new(&keymap));
        let supervisor = Arc::new(DeviceSupervisor::new(
            transport,
            run_state.clone(),
            sink.clone(),
        ));

        debug!("Controller created with {} mapped keys", keymap.len());

        Self {
            keymap,
            toggles,
            supervisor,
            run_state,
            sink,
            shutdown_key: config.shutdown_key(),
            port: config.port_selection(),
            monitor_interval: config.monitor_interval(),
            listener_poll: config.listener_poll(),
            started: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Initial connect using the configured port selection
    pub fn connect(&self) -> ConnectOutcome {
        self.supervisor.connect(self.port.as_ref())
    }

    /// Keys the hook must deliver: every mapped key plus the shutdown key
    pub fn registered_keys(&self) -> HashSet<KeyId> {
        self.keymap
            .keys()
            .cloned()
            .chain(std::iter::once(self.shutdown_key.clone()))
            .collect()
    }

    /// Spawn the listener and monitor tasks.
    ///
    /// Only the first call while running has any effect. Must be called from
    /// within a tokio runtime.
    pub fn start(&self, events: mpsc::Receiver<KeyEvent>) -> bool {
        if !self.run_state.is_running() {
            debug!("Not starting: run state already stopped");
            return false;
        }
        if self.started.swap(true, Ordering::AcqRel) {
            debug!("Controller already started");
            return false;
        }

        let listener = EventListener::new(
            self.keymap.clone(),
            self.toggles.clone(),
            MessageEmitter::new(self.supervisor.clone(), self.sink.clone()),
            self.run_state.clone(),
            self.shutdown_key.clone(),
        );

        let monitor = tokio::spawn(run_monitor(
            self.supervisor.clone(),
            self.run_state.clone(),
            self.monitor_interval,
        ));
        let listen = tokio::spawn(listener.run(events, self.listener_poll));
        self.tasks.lock().extend([monitor, listen]);

        self.sink.log(&format!(
            "keycc is running. Press '{}' to quit.",
            self.shutdown_key
        ));
        true
    }

    /// Wait for shutdown, join the background tasks, and release the port
    pub async fn wait(&self) {
        self.run_state.stopped().await;

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                warn!("Background task ended abnormally: {}", e);
            }
        }

        self.supervisor.release();
        debug!("Controller stopped");
    }

    /// Stop all loops and release the port. Safe to call more than once.
    pub fn stop(&self) {
        if self.run_state.stop() {
            info!("Stopping keycc");
        }
        self.supervisor.release();
    }

    /// Window-close hook
    pub fn on_window_close(&self) {
        self.stop();
    }

    /// Port-selection hook
    pub fn on_user_port_change(&self, selection: &str) -> ConnectOutcome {
        self.supervisor.on_user_port_change(selection)
    }

    pub fn list_ports(&self) -> Vec<PortDescriptor> {
        self.supervisor.list_ports()
    }

    /// Port list as `[index] name` labels
    pub fn port_labels(&self) -> Vec<String> {
        self.list_ports().iter().map(PortDescriptor::label).collect()
    }

    pub fn bound_port(&self) -> Option<PortDescriptor> {
        self.supervisor.bound_port()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.supervisor.status()
    }

    pub fn run_state(&self) -> RunState {
        self.run_state.clone()
    }

    pub fn keymap(&self) -> &KeyMap {
        &self.keymap
    }

    #[cfg(test)]
    pub(crate) fn toggles(&self) -> &ToggleStateStore {
        &self.toggles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockTransport, RecordingSink};

    fn controller(yaml: &str, ports: &[&str]) -> (Arc<Controller>, MockTransport, Arc<RecordingSink>) {
        let config = AppConfig::from_yaml(yaml).unwrap();
        let transport = MockTransport::with_ports(ports);
        let sink = Arc::new(RecordingSink::default());
        let controller = Controller::new(&config, Box::new(transport.clone()), sink.clone());
        (Arc::new(controller), transport, sink)
    }

    const FAST: &str = "timing:\n  monitor_interval_ms: 10\n  listener_poll_ms: 10\n";

    #[test]
    fn test_registered_keys_include_shutdown_key() {
        let (controller, _, _) = controller("{}", &["A"]);
        let keys = controller.registered_keys();

        assert_eq!(keys.len(), 37);
        assert!(keys.contains(&KeyId::new("esc")));
        assert!(keys.contains(&KeyId::new("a")));
    }

    #[test]
    fn test_connect_uses_configured_port() {
        let (controller, transport, _) = controller("midi:\n  port: synth\n", &["Through", "USB Synth"]);

        controller.connect();

        assert_eq!(transport.open_index(), Some(1));
        assert_eq!(controller.port_labels(), vec!["[0] Through", "[1] USB Synth"]);
    }

    #[tokio::test]
    async fn test_start_refused_without_ports() {
        let (controller, transport, sink) = controller("{}", &[]);

        assert_eq!(controller.connect(), ConnectOutcome::NoPorts);
        let (_tx, rx) = mpsc::channel(8);

        assert!(!controller.start(rx));
        assert!(!controller.run_state().is_running());
        assert_eq!(sink.count_containing("No available MIDI ports found"), 1);
        assert_eq!(transport.state.lock().send_attempts, 0);
    }

    #[tokio::test]
    async fn test_start_only_once() {
        let (controller, _, _) = controller(FAST, &["A"]);
        controller.connect();

        let (_tx1, rx1) = mpsc::channel(8);
        let (_tx2, rx2) = mpsc::channel(8);
        assert!(controller.start(rx1));
        assert!(!controller.start(rx2));

        controller.stop();
        tokio::time::timeout(Duration::from_secs(1), controller.wait())
            .await
            .expect("controller should stop");
    }

    #[tokio::test]
    async fn test_key_sequence_end_to_end() {
        let yaml = format!("{}keys:\n  map:\n    q: 5\n", FAST);
        let (controller, transport, sink) = controller(&yaml, &["A"]);
        controller.connect();

        let (tx, rx) = mpsc::channel(8);
        assert!(controller.start(rx));

        tx.send(KeyEvent::down("q")).await.unwrap();
        tx.send(KeyEvent::up("q")).await.unwrap();
        tx.send(KeyEvent::down("q")).await.unwrap();
        tx.send(KeyEvent::down("esc")).await.unwrap();

        tokio::time::timeout(Duration::from_secs(1), controller.wait())
            .await
            .expect("shutdown key should stop the controller");

        assert_eq!(
            transport.sent(),
            vec![(0, vec![0xB0, 5, 127]), (0, vec![0xB0, 5, 0])]
        );
        assert_eq!(sink.count_containing("Control Change"), 2);
        assert_eq!(transport.open_index(), None);
        assert_eq!(controller.toggles().current(&"q".into()), Some(false));
    }

    #[tokio::test]
    async fn test_user_port_change_while_running() {
        let yaml = format!("{}keys:\n  map:\n    q: 5\n", FAST);
        let (controller, transport, _) = controller(&yaml, &["A", "B", "C"]);
        controller.connect();

        let (tx, rx) = mpsc::channel(8);
        controller.start(rx);

        let outcome = controller.on_user_port_change("[2] C");
        assert_eq!(outcome, ConnectOutcome::Connected(PortDescriptor::new(2, "C")));

        tx.send(KeyEvent::down("q")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        controller.on_window_close();
        tokio::time::timeout(Duration::from_secs(1), controller.wait())
            .await
            .expect("window close should stop the controller");

        let state = transport.state.lock();
        assert_eq!(state.opened, vec![0, 2]);
        assert_eq!(state.sent, vec![(2, vec![0xB0, 5, 127])]);
        assert_eq!(state.open, None);
    }

    #[tokio::test]
    async fn test_monitor_recovers_from_unplug() {
        let (controller, transport, sink) = controller(FAST, &["A", "B"]);
        controller.connect();
        let (_tx, rx) = mpsc::channel(8);
        controller.start(rx);

        transport.set_ports(&["B"]);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(controller.bound_port(), Some(PortDescriptor::new(0, "B")));
        assert_eq!(sink.count_containing("MIDI port disappeared: A"), 1);
        assert!(controller.run_state().is_running());

        controller.stop();
        tokio::time::timeout(Duration::from_secs(1), controller.wait())
            .await
            .expect("controller should stop");
    }
}
