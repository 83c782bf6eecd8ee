// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema for the AgriGuard auth client.
//!
//! Every section has serde defaults, so an empty file is a valid
//! configuration that talks to a local backend and keeps the session in
//! memory.

use std::path::PathBuf;
use std::time::Duration;

use agriguard_core::{normalize_path, Role, RouteEntry, RouteTable};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// Constants
// =============================================================================

/// Default refresh window before credential expiry (5 minutes).
pub const DEFAULT_REFRESH_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Default expiry monitor tick while expiring (1 second).
pub const DEFAULT_EXPIRY_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Default cross-tab reconciliation interval (5 minutes).
pub const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Default retention of the persisted session record (24 hours).
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Default lifetime of credentials minted by the directory issuer (1 hour).
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(60 * 60);

/// Default storage namespace.
pub const DEFAULT_NAMESPACE: &str = "agriguard";

// =============================================================================
// Top-Level Configuration
// =============================================================================

/// The root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgriguardConfig {
    /// Session timing.
    #[serde(default)]
    pub session: SessionConfig,

    /// Credential storage.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Auth service and resource endpoints.
    #[serde(default)]
    pub api: ApiConfig,

    /// Route table and redirect targets.
    #[serde(default)]
    pub routes: RoutesConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AgriguardConfig {
    /// Validates the entire configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        self.session.validate()?;
        self.storage.validate()?;
        self.api.validate()?;
        self.routes.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

// =============================================================================
// Session Configuration
// =============================================================================

/// Session manager timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// How long before expiry the session enters the expiring state.
    #[serde(default = "default_refresh_window", with = "humantime_serde")]
    pub refresh_window: Duration,

    /// Expiry monitor tick while expiring.
    #[serde(default = "default_expiry_check_interval", with = "humantime_serde")]
    pub expiry_check_interval: Duration,

    /// Cross-tab reconciliation interval.
    #[serde(default = "default_reconcile_interval", with = "humantime_serde")]
    pub reconcile_interval: Duration,

    /// Whether the expiry monitor asks the auth service for a new credential.
    #[serde(default = "default_true")]
    pub auto_refresh: bool,
}

fn default_refresh_window() -> Duration {
    DEFAULT_REFRESH_WINDOW
}

fn default_expiry_check_interval() -> Duration {
    DEFAULT_EXPIRY_CHECK_INTERVAL
}

fn default_reconcile_interval() -> Duration {
    DEFAULT_RECONCILE_INTERVAL
}

fn default_true() -> bool {
    true
}

impl SessionConfig {
    /// Validates the session configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.expiry_check_interval.is_zero() {
            return Err(ConfigError::validation(
                "session.expiry_check_interval",
                "cannot be zero",
            ));
        }
        if self.reconcile_interval.is_zero() {
            return Err(ConfigError::validation(
                "session.reconcile_interval",
                "cannot be zero",
            ));
        }
        if self.expiry_check_interval >= self.reconcile_interval {
            return Err(ConfigError::validation(
                "session.expiry_check_interval",
                "must be shorter than session.reconcile_interval",
            ));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_window: DEFAULT_REFRESH_WINDOW,
            expiry_check_interval: DEFAULT_EXPIRY_CHECK_INTERVAL,
            reconcile_interval: DEFAULT_RECONCILE_INTERVAL,
            auto_refresh: true,
        }
    }
}

// =============================================================================
// Storage Configuration
// =============================================================================

/// Durable storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Process-local memory.
    #[default]
    Memory,
    /// One file per key under `storage.path`.
    File,
    /// Storage unavailable; every write fails.
    Disabled,
}

impl StorageKind {
    /// Returns the kind as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Memory => "memory",
            StorageKind::File => "file",
            StorageKind::Disabled => "disabled",
        }
    }
}

/// Credential storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Backend.
    #[serde(default)]
    pub backend: StorageKind,

    /// Directory for the file backend.
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,

    /// Key namespace.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Maximum age of a persisted session record.
    #[serde(default = "default_retention", with = "humantime_serde")]
    pub retention: Duration,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from(".agriguard")
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_retention() -> Duration {
    DEFAULT_RETENTION
}

impl StorageConfig {
    /// Validates the storage configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.namespace.trim().is_empty() {
            return Err(ConfigError::validation("storage.namespace", "cannot be empty"));
        }
        if self.namespace.contains(['/', '\\']) {
            return Err(ConfigError::validation(
                "storage.namespace",
                "cannot contain path separators",
            ));
        }
        if self.retention.is_zero() {
            return Err(ConfigError::validation("storage.retention", "cannot be zero"));
        }
        if self.backend == StorageKind::File && self.path.as_os_str().is_empty() {
            return Err(ConfigError::validation(
                "storage.path",
                "required for the file backend",
            ));
        }
        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageKind::default(),
            path: default_storage_path(),
            namespace: default_namespace(),
            retention: DEFAULT_RETENTION,
        }
    }
}

// =============================================================================
// API Configuration
// =============================================================================

/// Which auth service issues credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Remote backend over HTTP.
    #[default]
    Http,
    /// In-process user directory.
    Directory,
}

/// Auth service and resource endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Auth service selection.
    #[serde(default)]
    pub mode: AuthMode,

    /// Backend base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Credential issuance path.
    #[serde(default = "default_login_endpoint")]
    pub login_path: String,

    /// Credential refresh path.
    #[serde(default = "default_refresh_endpoint")]
    pub refresh_path: String,

    /// Request timeout.
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    /// In-process directory, used when `mode` is `directory`.
    #[serde(default)]
    pub directory: DirectoryConfig,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_login_endpoint() -> String {
    "/api/auth/login".to_string()
}

fn default_refresh_endpoint() -> String {
    "/api/auth/refresh".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

impl ApiConfig {
    /// Validates the API configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.request_timeout.is_zero() {
            return Err(ConfigError::validation("api.request_timeout", "cannot be zero"));
        }
        for (field, path) in [
            ("api.login_path", &self.login_path),
            ("api.refresh_path", &self.refresh_path),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::validation(field, "must start with '/'"));
            }
        }

        match self.mode {
            AuthMode::Http => {
                if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
                    return Err(ConfigError::validation(
                        "api.base_url",
                        "must be an http:// or https:// URL",
                    ));
                }
            }
            AuthMode::Directory => self.directory.validate()?,
        }
        Ok(())
    }

    /// Joins the base URL and a path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            mode: AuthMode::default(),
            base_url: default_base_url(),
            login_path: default_login_endpoint(),
            refresh_path: default_refresh_endpoint(),
            request_timeout: default_request_timeout(),
            directory: DirectoryConfig::default(),
        }
    }
}

/// In-process user directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectoryConfig {
    /// HMAC secret for minted credentials.
    #[serde(default)]
    pub secret: String,

    /// Lifetime of minted credentials.
    #[serde(default = "default_token_lifetime", with = "humantime_serde")]
    pub token_lifetime: Duration,

    /// Known users.
    #[serde(default)]
    pub users: Vec<DirectoryUser>,
}

fn default_token_lifetime() -> Duration {
    DEFAULT_TOKEN_LIFETIME
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            token_lifetime: DEFAULT_TOKEN_LIFETIME,
            users: Vec::new(),
        }
    }
}

impl DirectoryConfig {
    /// Validates the directory configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.secret.len() < 16 {
            return Err(ConfigError::validation(
                "api.directory.secret",
                "must be at least 16 bytes",
            ));
        }
        if self.token_lifetime.is_zero() {
            return Err(ConfigError::validation(
                "api.directory.token_lifetime",
                "cannot be zero",
            ));
        }

        let mut ids = std::collections::HashSet::new();
        for user in &self.users {
            if !ids.insert(user.id.as_str()) {
                return Err(ConfigError::validation(
                    "api.directory.users",
                    format!("duplicate user id '{}'", user.id),
                ));
            }
            user.validate()?;
        }
        Ok(())
    }
}

/// A directory user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectoryUser {
    /// User ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Phone number.
    #[serde(default)]
    pub phone_number: Option<String>,
    /// Role.
    pub role: Role,
    /// Zone, for zone administrators.
    #[serde(default)]
    pub zone_id: Option<String>,
    /// Argon2 PHC password hash.
    #[serde(default)]
    pub password_hash: Option<String>,
    /// Plain password, hashed when the directory is built. Demo setups only.
    #[serde(default)]
    pub password: Option<String>,
}

impl DirectoryUser {
    /// Validates a directory user.
    pub fn validate(&self) -> ConfigResult<()> {
        let field = format!("api.directory.users[{}]", self.id);
        if self.email.is_none() && self.phone_number.is_none() {
            return Err(ConfigError::validation(field, "needs an email or phone_number"));
        }
        if self.password_hash.is_none() && self.password.is_none() {
            return Err(ConfigError::validation(field, "needs a password_hash or password"));
        }
        if self.role == Role::ZoneAdmin && self.zone_id.is_none() {
            return Err(ConfigError::validation(field, "zone administrators need a zone_id"));
        }
        Ok(())
    }
}

// =============================================================================
// Routes Configuration
// =============================================================================

/// Route table and redirect targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutesConfig {
    /// Redirect target for unauthenticated visitors.
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Redirect target for authenticated users without access.
    #[serde(default = "default_unauthorized_path")]
    pub unauthorized_path: String,

    /// Replaces the default route table when present.
    #[serde(default)]
    pub table: Option<Vec<RouteConfig>>,
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_unauthorized_path() -> String {
    "/unauthorized".to_string()
}

impl RoutesConfig {
    /// Validates the routes configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        for (field, path) in [
            ("routes.login_path", &self.login_path),
            ("routes.unauthorized_path", &self.unauthorized_path),
        ] {
            if normalize_path(path).is_none() {
                return Err(ConfigError::validation(field, "must be an absolute path"));
            }
        }

        if let Some(table) = &self.table {
            for route in table {
                if normalize_path(&route.prefix).is_none() {
                    return Err(ConfigError::validation(
                        "routes.table",
                        format!("invalid prefix '{}'", route.prefix),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Builds the route table, falling back to the dashboard default.
    pub fn route_table(&self) -> RouteTable {
        match &self.table {
            Some(table) => table.iter().fold(RouteTable::new(), |acc, route| {
                acc.with_entry(RouteEntry::new(&route.prefix, route.roles.iter().copied()))
            }),
            None => RouteTable::dashboard(),
        }
    }
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            login_path: default_login_path(),
            unauthorized_path: default_unauthorized_path(),
            table: None,
        }
    }
}

/// A configured route entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteConfig {
    /// Path prefix.
    pub prefix: String,
    /// Roles allowed under the prefix.
    pub roles: Vec<Role>,
}

// =============================================================================
// Logging Configuration
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Log format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include targets in logs.
    #[serde(default = "default_true")]
    pub with_target: bool,
}

impl LoggingConfig {
    /// Validates the logging configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            with_target: true,
        }
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Returns the level as an `EnvFilter` directive.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Parses a level, accepting `warning` for `warn`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Compact single-line text.
    Compact,
    /// JSON lines.
    Json,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AgriguardConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.session.refresh_window, Duration::from_secs(300));
        assert_eq!(config.storage.retention, Duration::from_secs(86_400));
        assert_eq!(config.api.url(&config.api.login_path), "http://localhost:5000/api/auth/login");
    }

    #[test]
    fn test_expiry_tick_must_be_shorter_than_reconcile() {
        let mut config = AgriguardConfig::default();
        config.session.expiry_check_interval = Duration::from_secs(600);

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "session.expiry_check_interval"));
    }

    #[test]
    fn test_empty_namespace_rejected() {
        let mut config = AgriguardConfig::default();
        config.storage.namespace = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_relative_login_path_rejected() {
        let mut config = AgriguardConfig::default();
        config.routes.login_path = "login".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_directory_mode_requires_secret() {
        let mut config = AgriguardConfig::default();
        config.api.mode = AuthMode::Directory;
        assert!(config.validate().is_err());

        config.api.directory.secret = "0123456789abcdef".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_directory_default_mints_live_tokens() {
        let directory = DirectoryConfig::default();
        assert_eq!(directory.token_lifetime, DEFAULT_TOKEN_LIFETIME);
        assert!(!directory.token_lifetime.is_zero());

        let built = DirectoryConfig {
            secret: "0123456789abcdef".to_string(),
            ..DirectoryConfig::default()
        };
        assert!(built.validate().is_ok());
    }

    #[test]
    fn test_zone_admin_needs_zone() {
        let user = DirectoryUser {
            id: "2".to_string(),
            name: "Kofi".to_string(),
            email: Some("kofi@example.com".to_string()),
            phone_number: None,
            role: Role::ZoneAdmin,
            zone_id: None,
            password_hash: None,
            password: Some("secret".to_string()),
        };
        assert!(user.validate().is_err());
    }

    #[test]
    fn test_route_table_override() {
        let routes = RoutesConfig {
            table: Some(vec![RouteConfig {
                prefix: "/reports/".to_string(),
                roles: vec![Role::Investor],
            }]),
            ..Default::default()
        };

        let table = routes.route_table();
        assert!(table.has_route_access(Role::Investor, "/reports/q3"));
        assert!(!table.has_route_access(Role::Investor, "/dashboard"));
        assert!(RoutesConfig::default().route_table().has_route_access(Role::Investor, "/dashboard"));
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("verbose"), None);
    }
}
