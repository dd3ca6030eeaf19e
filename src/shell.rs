//! Console stand-in for the UI shell
//!
//! The core only needs two things from a front end: a place to write log lines
//! ([`LogSink`]) and someone to call back on port selection and close. This
//! module provides the tracing-backed sink, the colored port listing used by
//! `--list-ports`, and a small stdin command loop.

use colored::*;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::controller::Controller;
use crate::supervisor::ConnectOutcome;
use crate::transport::PortDescriptor;

/// User-visible log output (the log viewer of a GUI front end)
pub trait LogSink: Send + Sync {
    fn log(&self, line: &str);

    /// Clear whatever the sink displays. The core never calls this.
    fn clear(&self) {}
}

/// Writes sink lines through tracing at info level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, line: &str) {
        info!("{}", line);
    }

    fn clear(&self) {
        // Terminal output cannot be retracted; print a visual separator instead
        println!("{}", "─".repeat(80).dimmed());
    }
}

/// Print output ports, one `[index] name` label per line
pub fn print_ports(ports: &[PortDescriptor], bound: Option<&PortDescriptor>) {
    println!("\n{}", "=== MIDI Output Ports ===".bold().cyan());
    if ports.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for port in ports {
        if bound.map(|b| b.name == port.name).unwrap_or(false) {
            println!("  {} {}", port.label().green(), "(connected)".dimmed());
        } else {
            println!("  {}", port.label().yellow());
        }
    }
    println!();
}

/// Console command understood by [`run_console`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ports,
    Select(String),
    Status,
    Clear,
    Quit,
    Help,
}

impl Command {
    /// Parse one input line; `None` for blank lines.
    ///
    /// Anything that is not a keyword is taken as a port selection so a bare
    /// `2` or `[2] loopMIDI Port` works like picking from a list.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_lowercase().as_str() {
            "ports" | "list" if rest.is_empty() => Command::Ports,
            "port" | "select" if !rest.is_empty() => Command::Select(rest.to_string()),
            "port" | "select" => Command::Help,
            "status" if rest.is_empty() => Command::Status,
            "clear" if rest.is_empty() => Command::Clear,
            "quit" | "exit" if rest.is_empty() => Command::Quit,
            "help" | "?" if rest.is_empty() => Command::Help,
            _ => Command::Select(line.to_string()),
        };
        Some(command)
    }
}

/// Apply a console command to the controller
pub fn handle_command(controller: &Controller, sink: &dyn LogSink, command: Command) {
    match command {
        Command::Ports => {
            let ports = controller.list_ports();
            print_ports(&ports, controller.bound_port().as_ref());
        },
        Command::Select(selection) => {
            if let ConnectOutcome::Stopped = controller.on_user_port_change(&selection) {
                debug!("Port change '{}' ignored during shutdown", selection);
            }
        },
        Command::Status => sink.log(&format!("Status: {}", controller.status())),
        Command::Clear => sink.clear(),
        Command::Quit => controller.on_window_close(),
        Command::Help => {
            println!("{}", "Commands:".bold());
            println!("  ports               list MIDI output ports");
            println!("  port <selection>    switch to a port by index, label or name");
            println!("  status              show the current connection");
            println!("  clear               clear the log");
            println!("  quit                exit (same as the shutdown key)");
        },
    }
}

/// Read commands from stdin until EOF or shutdown
pub async fn run_console(controller: Arc<Controller>, sink: Arc<dyn LogSink>) {
    let run_state = controller.run_state();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if let Some(command) = Command::parse(&line) {
                        debug!("Console command: {:?}", command);
                        handle_command(&controller, sink.as_ref(), command);
                    }
                },
                Ok(None) => {
                    debug!("Console input closed");
                    break;
                },
                Err(e) => {
                    debug!("Console read failed: {}", e);
                    break;
                },
            },
            _ = run_state.stopped() => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::testing::{MockTransport, RecordingSink};

    fn controller(ports: &[&str]) -> (Controller, MockTransport, Arc<RecordingSink>) {
        let transport = MockTransport::with_ports(ports);
        let sink = Arc::new(RecordingSink::default());
        let controller = Controller::new(&AppConfig::default(), Box::new(transport.clone()), sink.clone());
        (controller, transport, sink)
    }

    #[test]
    fn test_console_commands_drive_controller() {
        let (controller, transport, sink) = controller(&["A", "B"]);
        controller.connect();
        assert_eq!(transport.open_index(), Some(0));

        handle_command(&controller, sink.as_ref(), Command::Select("[1] B".to_string()));
        assert_eq!(transport.open_index(), Some(1));
        assert_eq!(
            controller.bound_port(),
            Some(PortDescriptor::new(1, "B"))
        );

        handle_command(&controller, sink.as_ref(), Command::Status);
        assert_eq!(
            sink.lines().last().map(String::as_str),
            Some("Status: connected to [1] B")
        );

        handle_command(&controller, sink.as_ref(), Command::Quit);
        assert!(!controller.run_state().is_running());
        assert_eq!(transport.open_index(), None);
    }

    #[test]
    fn test_select_after_quit_keeps_port_closed() {
        let (controller, transport, sink) = controller(&["A", "B"]);
        controller.connect();

        handle_command(&controller, sink.as_ref(), Command::Quit);
        handle_command(&controller, sink.as_ref(), Command::Select("1".to_string()));

        assert_eq!(transport.open_index(), None);
        assert_eq!(transport.state.lock().opened, vec![0]);
    }

    #[test]
    fn test_parse_keywords() {
        assert_eq!(Command::parse("ports"), Some(Command::Ports));
        assert_eq!(Command::parse("  LIST "), Some(Command::Ports));
        assert_eq!(Command::parse("status"), Some(Command::Status));
        assert_eq!(Command::parse("clear"), Some(Command::Clear));
        assert_eq!(Command::parse("quit"), Some(Command::Quit));
        assert_eq!(Command::parse("?"), Some(Command::Help));
    }

    #[test]
    fn test_parse_port_selection() {
        assert_eq!(
            Command::parse("port 2"),
            Some(Command::Select("2".to_string()))
        );
        assert_eq!(
            Command::parse("[1] loopMIDI Port"),
            Some(Command::Select("[1] loopMIDI Port".to_string()))
        );
        assert_eq!(Command::parse("3"), Some(Command::Select("3".to_string())));
    }

    #[test]
    fn test_parse_blank_line() {
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse("   "), None);
    }
}
