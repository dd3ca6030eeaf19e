//! Config file discovery.
//!
//! Lookup order:
//! 1. `--config <path>` (must exist)
//! 2. `keycc.yaml` in the current working directory
//! 3. `<config dir>/keycc/config.yaml` (`~/.config` on Linux, `%APPDATA%` on Windows)
//!
//! When none of these exist the built-in defaults are used.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Application name used for the per-user config directory
const APP_DIR: &str = "keycc";

/// File name looked up in the working directory
const LOCAL_CONFIG: &str = "keycc.yaml";

/// Resolve which config file to load, if any
pub fn resolve_config(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    resolve_config_in(explicit, &cwd, dirs::config_dir().as_deref())
}

fn resolve_config_in(
    explicit: Option<&Path>,
    cwd: &Path,
    config_dir: Option<&Path>,
) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.exists() {
            bail!("Config file not found: {}", path.display());
        }
        return Ok(Some(path.to_path_buf()));
    }

    let local = cwd.join(LOCAL_CONFIG);
    if local.exists() {
        debug!("Using config from working directory: {}", local.display());
        return Ok(Some(local));
    }

    if let Some(dir) = config_dir {
        let user = dir.join(APP_DIR).join("config.yaml");
        if user.exists() {
            debug!("Using user config: {}", user.display());
            return Ok(Some(user));
        }
    }

    debug!("No config file found, using defaults");
    Ok(None)
}
