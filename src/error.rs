// src/error.rs

use thiserror::Error;

/// Core error types for depmark
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed catalog manifest
    #[error("Failed to parse catalog manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    /// Malformed configuration file
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration file with a bad line
    #[error("{path}:{line}: {message}")]
    ConfigSyntax {
        path: String,
        line: usize,
        message: String,
    },

    /// Version string that cannot be parsed
    #[error("Invalid version '{0}'")]
    InvalidVersion(String),

    /// Capability expression that cannot be parsed
    #[error("Invalid capability expression '{0}'")]
    InvalidCapability(String),

    /// Shell-style mask that cannot be compiled
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Package record that violates catalog invariants
    #[error("Invalid package record {0}")]
    InvalidPackage(String),
}

/// Result type alias using depmark's Error type
pub type Result<T> = std::result::Result<T, Error>;
