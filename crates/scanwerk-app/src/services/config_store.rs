// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Loading and saving the scanner configuration.

use std::path::Path;

use scanwerk_core::config::ScannerConfig;
use scanwerk_core::error::Result;
use tracing::{debug, info};

use super::data_dir;

/// Load the configuration.
///
/// An explicit `path` must exist. Without one, the per-user file is used when
/// present and the defaults otherwise.
pub fn load(path: Option<&Path>) -> Result<ScannerConfig> {
    match path {
        Some(path) => read(path),
        None => {
            let default_path = data_dir::config_path();
            if default_path.is_file() {
                read(&default_path)
            } else {
                debug!(path = %default_path.display(), "No config file; using defaults");
                Ok(ScannerConfig::default())
            }
        }
    }
}

/// Parse and validate one file.
fn read(path: &Path) -> Result<ScannerConfig> {
    let json = std::fs::read_to_string(path)?;
    let config = ScannerConfig::from_json(&json)?;
    info!(path = %path.display(), "Configuration loaded");
    Ok(config)
}

pub fn save(config: &ScannerConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, config.to_json()?)?;
    info!(path = %path.display(), "Configuration saved");
    Ok(())
}

/// Print the default configuration, optionally writing it to the user file.
pub fn print_default(write: bool) -> Result<()> {
    let config = ScannerConfig::default();
    println!("{}", config.to_json()?);
    if write {
        save(&config, &data_dir::config_path())?;
    }
    Ok(())
}
