// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-user configuration directory resolution.

use std::path::PathBuf;

const CONFIG_FILE: &str = "config.json";

/// Return the Scanwerk configuration directory. Not created here.
pub fn config_dir() -> PathBuf {
    base_dir().join("scanwerk")
}

/// Location of the per-user configuration file.
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE)
}

fn base_dir() -> PathBuf {
    // XDG first, then ~/.config
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            return PathBuf::from(xdg);
        }
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".config");
    }
    // Last resort
    std::env::temp_dir()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_file_lives_in_scanwerk_dir() {
        let path = config_path();
        assert_eq!(path.file_name().unwrap(), CONFIG_FILE);
        assert!(path.parent().unwrap().ends_with("scanwerk"));
    }
}
