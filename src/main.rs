//! keycc - turn computer keys into toggling MIDI CC buttons

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keycc::config::AppConfig;
use keycc::controller::Controller;
use keycc::keyboard::KeyHook;
use keycc::paths;
use keycc::shell::{self, LogSink, TracingSink};
use keycc::transport::{MidiTransport, MidirTransport};

/// Capacity of the hook -> listener channel
const KEY_EVENT_BUFFER: usize = 256;

/// keycc - keyboard keys as toggling MIDI Control Change buttons
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output port: "[index] name", an index, or part of a port name
    #[arg(short, long)]
    port: Option<String>,

    /// List available MIDI output ports and exit
    #[arg(long)]
    list_ports: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level)?;

    let mut config = match paths::resolve_config(args.config.as_deref())? {
        Some(path) => {
            info!("Configuration file: {}", path.display());
            AppConfig::load(&path).await?
        },
        None => AppConfig::default(),
    };
    if let Some(port) = args.port {
        config.midi.port = Some(port);
    }

    let mut transport = MidirTransport::new(&config.midi.client_name)
        .context("Failed to initialize MIDI output")?;

    if args.list_ports {
        let ports = transport.list_ports().context("Failed to list MIDI ports")?;
        shell::print_ports(&ports, None);
        return Ok(());
    }

    let sink: Arc<dyn LogSink> = Arc::new(TracingSink);
    let controller = Arc::new(Controller::new(&config, Box::new(transport), sink.clone()));
    info!("{} keys mapped", controller.keymap().len());

    controller.connect();
    if !controller.run_state().is_running() {
        warn!("Nothing to send to; exiting");
        return Ok(());
    }

    let (event_tx, event_rx) = mpsc::channel(KEY_EVENT_BUFFER);
    let hook = KeyHook::spawn(controller.registered_keys(), event_tx)
        .context("Failed to start keyboard hook thread")?;
    info!("Keyboard hook registered for {} keys", hook.registered());

    controller.start(event_rx);
    tokio::spawn(shell::run_console(controller.clone(), sink));

    let run_state = controller.run_state();
    tokio::select! {
        _ = shutdown_signal() => controller.on_window_close(),
        _ = run_state.stopped() => {},
    }

    controller.stop();
    controller.wait().await;

    info!("keycc shutdown complete");
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for CTRL+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
