//! Error types for the thread view aggregator
//!
//! Notification handlers never return these to their caller; they log and
//! degrade. Errors only surface from explicit requests (banner actions,
//! configuration loading, scenario replay).

use std::io;
use thiserror::Error;

use crate::facade::ThreadId;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the thread view
#[derive(Error, Debug)]
pub enum Error {
    // === Collection Errors ===
    #[error("No breakpoint hits. Check for hits before navigating to one")]
    EmptyCollection,

    // === Debug Engine Errors ===
    #[error("Debug engine error: {0}")]
    Facade(String),

    #[error("No debug session is bound to the thread view")]
    SessionNotBound,

    #[error("Thread {0} is not tracked by the bound session")]
    ThreadNotFound(ThreadId),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // === Test Errors ===
    #[error("Scenario assertion failed: {0}")]
    TestAssertion(String),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a debug engine error from anything displayable
    pub fn facade<S: std::fmt::Display>(message: S) -> Self {
        Self::Facade(message.to_string())
    }

    /// Create a file read error
    pub fn file_read(path: &std::path::Path, error: &io::Error) -> Self {
        Self::FileRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    /// Whether the error came from the external debug engine
    pub fn is_facade(&self) -> bool {
        matches!(self, Self::Facade(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_collection_message_is_actionable() {
        let msg = Error::EmptyCollection.to_string();
        assert!(msg.contains("No breakpoint hits"));
    }

    #[test]
    fn test_facade_helper() {
        let e = Error::facade("vm disconnected");
        assert!(e.is_facade());
        assert_eq!(e.to_string(), "Debug engine error: vm disconnected");
        assert!(!Error::SessionNotBound.is_facade());
    }

    #[test]
    fn test_thread_not_found_display() {
        let e = Error::ThreadNotFound(ThreadId(7));
        assert_eq!(e.to_string(), "Thread #7 is not tracked by the bound session");
    }
}
