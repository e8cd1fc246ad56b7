//! Default paths for tickwatchd components
//!
//! Provides centralized path defaults that all crates can use.
//! Paths are user-writable by default (no root required):
//! - Socket: `$XDG_RUNTIME_DIR/tickwatchd/tickwatchd.sock` or `/tmp/tickwatchd-$USER/tickwatchd.sock`
//! - Data: `$XDG_DATA_HOME/tickwatchd` or `~/.local/share/tickwatchd`
//! - Config: `$XDG_CONFIG_HOME/tickwatch/config.toml` or `~/.config/tickwatch/config.toml`

use std::path::PathBuf;

/// Environment variable for overriding the socket path
pub const TICKWATCH_SOCKET_ENV: &str = "TICKWATCH_SOCKET";

/// Environment variable for overriding the data directory
pub const TICKWATCH_DATA_DIR_ENV: &str = "TICKWATCH_DATA_DIR";

/// Socket filename within the socket directory
const SOCKET_FILENAME: &str = "tickwatchd.sock";

/// Application subdirectory name
const APP_DIR: &str = "tickwatchd";

/// Get the default socket path.
///
/// Order of precedence:
/// 1. `$TICKWATCH_SOCKET` environment variable (if set)
/// 2. `$XDG_RUNTIME_DIR/tickwatchd/tickwatchd.sock`
/// 3. `/tmp/tickwatchd-$USER/tickwatchd.sock` (fallback)
pub fn default_socket_path() -> PathBuf {
    if let Ok(path) = std::env::var(TICKWATCH_SOCKET_ENV) {
        return PathBuf::from(path);
    }

    socket_path_without_env()
}

/// Get the socket path without checking TICKWATCH_SOCKET env var.
pub fn socket_path_without_env() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join(APP_DIR).join(SOCKET_FILENAME);
    }

    let username = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    PathBuf::from(format!("/tmp/{}-{}", APP_DIR, username)).join(SOCKET_FILENAME)
}

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$TICKWATCH_DATA_DIR` environment variable (if set)
/// 2. `$XDG_DATA_HOME/tickwatchd`
/// 3. `~/.local/share/tickwatchd` (fallback)
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(TICKWATCH_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_without_env()
}

/// Get the data directory without checking TICKWATCH_DATA_DIR env var.
pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

/// Get the default settings file path (`~/.config/tickwatch/config.toml`).
pub fn default_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join("tickwatch").join("config.toml");
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join("tickwatch")
            .join("config.toml");
    }

    PathBuf::from("/tmp").join(APP_DIR).join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_path_contains_tickwatchd() {
        let path = socket_path_without_env();
        assert!(path.to_string_lossy().contains("tickwatchd"));
        assert!(path.to_string_lossy().contains(".sock"));
    }

    #[test]
    fn data_dir_contains_tickwatchd() {
        let path = data_dir_without_env();
        assert!(path.to_string_lossy().contains("tickwatchd"));
    }

    #[test]
    fn config_path_is_toml() {
        let path = default_config_path();
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }
}
