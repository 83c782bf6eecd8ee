// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! - `login`: Obtain a session and persist it
//! - `logout`: Clear the persisted session
//! - `whoami`: Show the current session
//! - `can-access`: Check route access
//! - `can`: Check a permission, optionally against a resource zone
//! - `watch`: Follow session state changes
//! - `validate`: Validate the configuration file
//! - `version`: Show version information

use std::path::PathBuf;
use std::time::Duration;

use agriguard_core::{PermissionKey, Role};
use clap::{Args, Parser, Subcommand};

/// Configuration file read when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "agriguard.yaml";

// =============================================================================
// Main CLI Structure
// =============================================================================

/// AgriGuard - session and access control for the agricultural dashboard
#[derive(Parser, Debug)]
#[command(
    name = "agriguard",
    author = "Sylvex <contact@sylvex.io>",
    version = agriguard_core::VERSION,
    about = "Session and role-based access control for the AgriGuard dashboard",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = DEFAULT_CONFIG_PATH,
        env = "AGRIGUARD_CONFIG",
        global = true
    )]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides `logging.level`
    #[arg(short, long, env = "AGRIGUARD_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Log format; overrides `logging.format`
    #[arg(long, env = "AGRIGUARD_LOG_FORMAT", global = true)]
    pub log_format: Option<LogFormat>,

    /// Enable quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Log in with an email or phone number
    Login(LoginArgs),

    /// Clear the stored session
    Logout,

    /// Show the current session
    Whoami(OutputArgs),

    /// Check whether a role may open a route
    #[command(name = "can-access")]
    CanAccess(CanAccessArgs),

    /// Check whether a role holds a permission, optionally on a zoned resource
    Can(CanArgs),

    /// Follow session state changes (expiry, refresh, logout elsewhere)
    Watch(WatchArgs),

    /// Validate the configuration file
    Validate(ValidateArgs),

    /// Show detailed version information
    Version,
}

// =============================================================================
// Command Arguments
// =============================================================================

/// Arguments for the `login` command.
#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    /// Email address or phone number
    pub identifier: String,

    /// Password
    #[arg(short, long, env = "AGRIGUARD_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

/// Output format selection.
#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the `can-access` command.
#[derive(Args, Debug, Clone)]
pub struct CanAccessArgs {
    /// Route path, e.g. /farmers/12
    pub path: String,

    /// Check this role instead of the logged-in user
    #[arg(short, long, value_parser = parse_role)]
    pub role: Option<Role>,
}

/// Arguments for the `can` command.
#[derive(Args, Debug, Clone)]
pub struct CanArgs {
    /// Permission key, e.g. farmers:write
    #[arg(value_parser = parse_permission)]
    pub permission: PermissionKey,

    /// Zone of the targeted resource
    #[arg(short, long)]
    pub zone: Option<String>,

    /// Check this role instead of the logged-in user
    #[arg(short, long, value_parser = parse_role)]
    pub role: Option<Role>,

    /// Zone of the checked role (with --role)
    #[arg(long, requires = "role")]
    pub user_zone: Option<String>,
}

/// Arguments for the `watch` command.
#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    /// Stop after this long (e.g. 10m); runs until Ctrl-C otherwise
    #[arg(short, long, value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,
}

/// Arguments for the `validate` command.
#[derive(Args, Debug, Clone, Default)]
pub struct ValidateArgs {
    /// Show parsed configuration after validation
    #[arg(short, long)]
    pub show_config: bool,

    /// Output format for validation results
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Strict mode: treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

// =============================================================================
// Enums
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for structured logging
    Json,
    /// Compact format for minimal output
    Compact,
}

impl From<LogFormat> for agriguard_config::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Text => agriguard_config::LogFormat::Text,
            LogFormat::Json => agriguard_config::LogFormat::Json,
            LogFormat::Compact => agriguard_config::LogFormat::Compact,
        }
    }
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for programmatic parsing
    Json,
}

fn parse_role(value: &str) -> Result<Role, String> {
    Role::parse(value).ok_or_else(|| {
        format!(
            "unknown role '{}' (expected centralAdmin, zoneAdmin or investor)",
            value
        )
    })
}

fn parse_permission(value: &str) -> Result<PermissionKey, String> {
    PermissionKey::parse(value).ok_or_else(|| format!("unknown permission '{}'", value))
}

// =============================================================================
// Helper Methods
// =============================================================================

impl Cli {
    /// Parse CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The log level forced by flags, if any.
    pub fn forced_log_level(&self) -> Option<&str> {
        if self.quiet {
            Some("warn")
        } else if self.verbose {
            Some("debug")
        } else {
            self.log_level.as_deref()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_command() {
        let cli = Cli::parse_from(["agriguard", "login", "amina@example.com", "-p", "pw"]);
        match cli.command {
            Commands::Login(args) => {
                assert_eq!(args.identifier, "amina@example.com");
                assert_eq!(args.password.as_deref(), Some("pw"));
            }
            other => panic!("Expected Login command, got {:?}", other),
        }
    }

    #[test]
    fn test_config_path() {
        let cli = Cli::parse_from(["agriguard", "-c", "/etc/agriguard/config.yaml", "logout"]);
        assert_eq!(cli.config, PathBuf::from("/etc/agriguard/config.yaml"));
    }

    #[test]
    fn test_can_access_with_role() {
        let cli = Cli::parse_from(["agriguard", "can-access", "/zones", "--role", "zone_admin"]);
        match cli.command {
            Commands::CanAccess(args) => {
                assert_eq!(args.path, "/zones");
                assert_eq!(args.role, Some(Role::ZoneAdmin));
            }
            other => panic!("Expected CanAccess command, got {:?}", other),
        }
    }

    #[test]
    fn test_can_parses_permission() {
        let cli = Cli::parse_from([
            "agriguard",
            "can",
            "farmers:write",
            "--zone",
            "z2",
            "--role",
            "zoneAdmin",
            "--user-zone",
            "z1",
        ]);
        match cli.command {
            Commands::Can(args) => {
                assert_eq!(args.permission, PermissionKey::FarmersWrite);
                assert_eq!(args.zone.as_deref(), Some("z2"));
                assert_eq!(args.user_zone.as_deref(), Some("z1"));
            }
            other => panic!("Expected Can command, got {:?}", other),
        }

        assert!(Cli::try_parse_from(["agriguard", "can", "farmers:fly"]).is_err());
        assert!(Cli::try_parse_from(["agriguard", "can", "zones:read", "--user-zone", "z1"]).is_err());
    }

    #[test]
    fn test_watch_duration() {
        let cli = Cli::parse_from(["agriguard", "watch", "-d", "90s"]);
        match cli.command {
            Commands::Watch(args) => assert_eq!(args.duration, Some(Duration::from_secs(90))),
            other => panic!("Expected Watch command, got {:?}", other),
        }
    }

    #[test]
    fn test_quiet_and_verbose() {
        let cli = Cli::parse_from(["agriguard", "-q", "whoami"]);
        assert_eq!(cli.forced_log_level(), Some("warn"));

        let cli = Cli::parse_from(["agriguard", "-v", "whoami"]);
        assert_eq!(cli.forced_log_level(), Some("debug"));

        let cli = Cli::parse_from(["agriguard", "whoami"]);
        assert_eq!(cli.forced_log_level(), None);
    }
}
