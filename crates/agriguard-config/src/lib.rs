// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # agriguard-config
//!
//! Configuration management for the AgriGuard auth client.
//!
//! ## Features
//!
//! - **Schema Definition**: Session timing, storage, API, routes and logging
//! - **Multi-Format Support**: YAML, TOML, and JSON configuration files
//! - **Environment Overrides**: `${VAR:default}` placeholders and `AGRIGUARD_*` variables
//! - **Validation**: Every section is checked before the config is returned
//!
//! ## Quick Start
//!
//! ```no_run
//! use agriguard_config::loader::load_config;
//!
//! let config = load_config("agriguard.yaml").unwrap();
//! println!("Backend: {}", config.api.base_url);
//! ```
//!
//! ## Configuration Schema
//!
//! - `session` - Refresh window, expiry tick, reconciliation interval
//! - `storage` - Backend, path, namespace and retention of the session record
//! - `api` - Auth endpoints or the in-process user directory
//! - `routes` - Login/unauthorized redirect targets and the route table
//! - `logging` - Level and format

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, load_config_str, ConfigFormat, ConfigLoader};
pub use schema::{
    AgriguardConfig, ApiConfig, AuthMode, DirectoryConfig, DirectoryUser, LogFormat, LogLevel,
    LoggingConfig, RouteConfig, RoutesConfig, SessionConfig, StorageConfig, StorageKind,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
