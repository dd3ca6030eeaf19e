//! Configuration management for keycc
//!
//! Handles loading, parsing, and validation of the YAML configuration file.
//! Every section is optional; a missing file means built-in defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tokio::fs;

use crate::keymap::{ControllerNumber, KeyId, KeyMap};
use crate::supervisor::PortSelection;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub midi: MidiConfig,
    #[serde(default)]
    pub keys: KeysConfig,
    /// Key that quits the program
    #[serde(default = "default_shutdown_key")]
    pub shutdown_key: String,
    #[serde(default)]
    pub timing: TimingConfig,
}

/// MIDI output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MidiConfig {
    /// Client name announced to the MIDI system
    #[serde(default = "default_client_name")]
    pub client_name: String,
    /// Preferred output port: `[index] name`, an index, or part of a name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
}

/// Key to controller mapping
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KeysConfig {
    /// Start from the digit/letter defaults before applying `map`
    #[serde(default = "default_true")]
    pub include_defaults: bool,
    #[serde(default)]
    pub map: HashMap<String, u8>,
}

/// Loop intervals
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimingConfig {
    /// Device health check period
    #[serde(default = "default_monitor_interval_ms")]
    pub monitor_interval_ms: u64,
    /// Upper bound on how long the listener waits before re-checking shutdown
    #[serde(default = "default_listener_poll_ms")]
    pub listener_poll_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            midi: MidiConfig::default(),
            keys: KeysConfig::default(),
            shutdown_key: default_shutdown_key(),
            timing: TimingConfig::default(),
        }
    }
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            client_name: default_client_name(),
            port: None,
        }
    }
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            include_defaults: true,
            map: HashMap::new(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            monitor_interval_ms: default_monitor_interval_ms(),
            listener_poll_ms: default_listener_poll_ms(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_yaml(&contents)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parse and validate YAML text
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: AppConfig =
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if self.midi.client_name.trim().is_empty() {
            anyhow::bail!("midi.client_name cannot be empty");
        }

        for (key, cc) in &self.keys.map {
            if key.trim().is_empty() {
                anyhow::bail!("keys.map contains an empty key name");
            }
            if *cc > 127 {
                anyhow::bail!("keys.map['{}']: controller {} is out of range (0-127)", key, cc);
            }
        }

        if self.shutdown_key.trim().is_empty() {
            anyhow::bail!("shutdown_key cannot be empty");
        }
        let shutdown = self.shutdown_key();
        if self.keymap().contains(&shutdown) {
            anyhow::bail!(
                "shutdown_key '{}' is also mapped to a controller; pick another key",
                shutdown
            );
        }

        if self.keymap().is_empty() {
            anyhow::bail!("No keys mapped: enable keys.include_defaults or add keys.map entries");
        }

        if self.timing.monitor_interval_ms == 0 {
            anyhow::bail!("timing.monitor_interval_ms must be greater than 0");
        }
        if self.timing.listener_poll_ms == 0 {
            anyhow::bail!("timing.listener_poll_ms must be greater than 0");
        }

        Ok(())
    }

    /// Build the immutable key map described by `keys`
    pub fn keymap(&self) -> KeyMap {
        let entries: HashMap<KeyId, ControllerNumber> = self
            .keys
            .map
            .iter()
            .map(|(key, cc)| (KeyId::new(key), *cc))
            .collect();

        if self.keys.include_defaults {
            KeyMap::with_overrides(Some(&entries))
        } else {
            KeyMap::custom(entries)
        }
    }

    pub fn shutdown_key(&self) -> KeyId {
        KeyId::new(&self.shutdown_key)
    }

    pub fn port_selection(&self) -> Option<PortSelection> {
        self.midi.port.as_deref().and_then(PortSelection::parse)
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.timing.monitor_interval_ms)
    }

    pub fn listener_poll(&self) -> Duration {
        Duration::from_millis(self.timing.listener_poll_ms)
    }
}

fn default_client_name() -> String { "keycc".to_string() }
fn default_shutdown_key() -> String { "esc".to_string() }
fn default_true() -> bool { true }
fn default_monitor_interval_ms() -> u64 { 1000 }
fn default_listener_poll_ms() -> u64 { 100 }
