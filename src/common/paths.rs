//! Configuration file location

use std::path::PathBuf;

/// Name used for the project directories
const APP_NAME: &str = "thread-view";

/// Get the configuration directory path
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/thread-view/`
/// - macOS: `~/Library/Application Support/thread-view/`
/// - Windows: `%APPDATA%\thread-view\`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}
