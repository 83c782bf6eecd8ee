// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # agriguard-bin
//!
//! Command-line front end for the AgriGuard auth client.
//!
//! - CLI argument parsing with clap
//! - Logging initialization
//! - Command implementations (login, whoami, can, watch, validate, ...)
//!
//! ## Usage
//!
//! ```bash
//! # Log in and persist the session
//! agriguard login amina@example.com --password "$PASSWORD"
//!
//! # Show who is logged in
//! agriguard whoami --format json
//!
//! # Check a route or a zoned permission
//! agriguard can-access /farmers/12
//! agriguard can farmers:write --zone 4
//!
//! # Check a role without logging in
//! agriguard can farmers:write --role zoneAdmin --user-zone 4 --zone 5
//!
//! # Follow the session through refresh and expiry
//! agriguard watch --duration 2h
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;

// =============================================================================
// Re-exports
// =============================================================================

pub use cli::{Cli, Commands};
pub use error::{BinError, BinResult};
pub use logging::init_logging;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
