// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI command implementations.
//!
//! - `login` / `logout` / `whoami`: session lifecycle
//! - `can-access` / `can`: route and permission checks
//! - `watch`: follow the session until it ends
//! - `validate`: validate configuration file
//! - `version`: show version information

mod access;
mod session;
mod validate;
mod version;
mod watch;

pub use access::{can, can_access};
pub use session::{login, logout, whoami};
pub use validate::validate;
pub use version::version;
pub use watch::watch;

use agriguard_client::AuthClient;
use agriguard_config::AgriguardConfig;
use tracing::debug;

use crate::cli::{Cli, Commands};
use crate::error::{BinError, BinResult};

/// Executes the appropriate command based on CLI arguments.
pub async fn execute(cli: &Cli, config: AgriguardConfig) -> BinResult<()> {
    match &cli.command {
        Commands::Login(args) => session::login(&config, args).await,
        Commands::Logout => session::logout(&config),
        Commands::Whoami(args) => session::whoami(&config, args),
        Commands::CanAccess(args) => access::can_access(&config, args),
        Commands::Can(args) => access::can(&config, args),
        Commands::Watch(args) => watch::watch(&config, args).await,
        Commands::Validate(args) => validate::validate(cli, args),
        Commands::Version => version::version(cli),
    }
}

/// Loads the configuration named on the command line.
///
/// A missing file at the default path falls back to built-in defaults; a
/// missing file that was named explicitly is an error.
pub fn load_config(cli: &Cli) -> BinResult<AgriguardConfig> {
    if cli.config.exists() {
        return agriguard_config::load_config(&cli.config).map_err(|e| {
            BinError::from(e).with_context(format!("Failed to load {}", cli.config.display()))
        });
    }

    if cli.config.as_os_str() == crate::cli::DEFAULT_CONFIG_PATH {
        debug!(path = %cli.config.display(), "No configuration file, using defaults");
        return Ok(AgriguardConfig::default());
    }

    Err(BinError::config(format!(
        "Configuration file not found: {}",
        cli.config.display()
    )))
}

/// Builds the auth client for a command.
pub(crate) fn build_client(config: &AgriguardConfig) -> BinResult<AuthClient> {
    AuthClient::from_config(config)
        .map_err(|e| BinError::init(format!("Failed to build auth client: {}", e)))
}
