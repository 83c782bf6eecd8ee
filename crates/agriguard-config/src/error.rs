// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Errors raised while reading and checking the AgriGuard configuration.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but does not parse.
    #[error("Cannot parse '{path}': {message}")]
    Parse {
        /// Config file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// A setting is out of range or inconsistent with another one.
    #[error("Invalid setting '{field}': {message}")]
    Validation {
        /// Dotted setting name, e.g. `session.refresh_window`.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// The config file could not be read.
    #[error("Cannot read '{path}': {source}")]
    Io {
        /// Config file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// An `AGRIGUARD_*` override holds a value the setting cannot take.
    #[error("Environment override {name} rejected: {message}")]
    InvalidEnvVar {
        /// Variable name.
        name: String,
        /// Why the value was rejected.
        message: String,
    },

    /// No file at the given path.
    #[error("Config file '{path}' does not exist")]
    FileNotFound {
        /// Missing path.
        path: PathBuf,
    },

    /// The file extension names no known format.
    #[error("Unknown config format '{format}' (use .yaml, .toml or .json)")]
    UnsupportedFormat {
        /// The extension found.
        format: String,
    },

    /// Parsing failed on content with no file behind it.
    #[error("Cannot decode configuration: {message}")]
    Serialization {
        /// Parser message.
        message: String,
    },
}

impl ConfigError {
    /// Creates a parse error.
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid override error.
    pub fn invalid_env_var(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEnvVar {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a missing file error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Creates an unknown format error.
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Creates a decode error for in-memory content.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// The setting at fault, for validation and override errors.
    pub fn field(&self) -> Option<&str> {
        match self {
            ConfigError::Validation { field, .. } => Some(field),
            ConfigError::InvalidEnvVar { name, .. } => Some(name),
            _ => None,
        }
    }

    /// The file involved, when there is one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Parse { path, .. }
            | ConfigError::Io { path, .. }
            | ConfigError::FileNotFound { path } => Some(path),
            _ => None,
        }
    }

    /// A short suggestion for the operator.
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::Parse { .. } | ConfigError::Serialization { .. } => {
                "Check the file syntax; unknown keys are rejected".to_string()
            }
            ConfigError::Validation { field, .. } => {
                format!("Fix '{}' and run `agriguard validate` again", field)
            }
            ConfigError::Io { .. } => "Check the file permissions".to_string(),
            ConfigError::InvalidEnvVar { name, .. } => format!("Unset or correct {}", name),
            ConfigError::FileNotFound { .. } => {
                "Pass --config or set AGRIGUARD_CONFIG to an existing file".to_string()
            }
            ConfigError::UnsupportedFormat { .. } => {
                "Rename the file with a .yaml, .toml or .json extension".to_string()
            }
        }
    }

    /// Returns `true` if the file itself could not be read.
    pub fn is_io_error(&self) -> bool {
        matches!(self, ConfigError::Io { .. } | ConfigError::FileNotFound { .. })
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
