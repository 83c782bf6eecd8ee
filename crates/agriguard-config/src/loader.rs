// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration loading and processing.
//!
//! # Loading Pipeline
//!
//! 1. Resolve `${VAR}` / `${VAR:default}` placeholders in the raw content
//! 2. Parse YAML/TOML/JSON into [`AgriguardConfig`]
//! 3. Apply `AGRIGUARD_*` environment overrides
//! 4. Resolve the relative storage path against the config file's directory
//! 5. Validate
//!
//! # Environment Variable Override
//!
//! ```text
//! AGRIGUARD_API_BASE_URL=https://dashboard.example.org
//! AGRIGUARD_API_MODE=directory
//! AGRIGUARD_STORAGE_BACKEND=file
//! AGRIGUARD_STORAGE_PATH=/var/lib/agriguard
//! AGRIGUARD_SESSION_AUTO_REFRESH=false
//! AGRIGUARD_LOG_LEVEL=debug
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::schema::{AgriguardConfig, AuthMode, LogFormat, LogLevel, StorageKind};

/// Default environment variable prefix.
pub const DEFAULT_ENV_PREFIX: &str = "AGRIGUARD";

// =============================================================================
// ConfigLoader
// =============================================================================

/// Configuration loader.
///
/// # Examples
///
/// ```no_run
/// use agriguard_config::loader::ConfigLoader;
///
/// let config = ConfigLoader::new().load("agriguard.yaml").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Base directory for resolving relative paths.
    base_path: Option<PathBuf>,

    /// Environment variable prefix.
    env_prefix: String,

    /// Whether to resolve placeholders and apply overrides.
    resolve_env_vars: bool,

    /// Whether to resolve relative paths.
    resolve_paths: bool,
}

impl ConfigLoader {
    /// Creates a new configuration loader with default settings.
    pub fn new() -> Self {
        Self {
            base_path: None,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            resolve_env_vars: true,
            resolve_paths: true,
        }
    }

    /// Sets the base path for resolving relative paths.
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Sets the environment variable prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Enables or disables environment variable resolution.
    pub fn with_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = enabled;
        self
    }

    /// Enables or disables relative path resolution.
    pub fn with_path_resolution(mut self, enabled: bool) -> Self {
        self.resolve_paths = enabled;
        self
    }

    /// Loads configuration from a file.
    ///
    /// The format is determined by the file extension (`.yaml`/`.yml`,
    /// `.toml`, `.json`).
    pub fn load(&self, path: impl AsRef<Path>) -> ConfigResult<AgriguardConfig> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let base_path = self.base_path.clone().unwrap_or_else(|| {
            path.parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."))
        });

        let content = self.read_file(path)?;
        let format = ConfigFormat::from_path(path)?;
        let mut config = self.parse_content(&content, format, path)?;

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config)?;
        }

        if self.resolve_paths {
            self.resolve_relative_paths(&mut config, &base_path);
        }

        config.validate()?;

        debug!(
            storage = config.storage.backend.as_str(),
            custom_routes = config.routes.table.is_some(),
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Loads configuration from a string.
    pub fn load_from_str(&self, content: &str, format: ConfigFormat) -> ConfigResult<AgriguardConfig> {
        let content = if self.resolve_env_vars {
            self.resolve_env_placeholders(content)
        } else {
            content.to_string()
        };

        let mut config: AgriguardConfig = parse_str(&content, format)?;

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config)?;
        }

        if self.resolve_paths {
            if let Some(base_path) = &self.base_path {
                self.resolve_relative_paths(&mut config, base_path);
            }
        }

        config.validate()?;

        Ok(config)
    }

    /// Reads file content.
    fn read_file(&self, path: &Path) -> ConfigResult<String> {
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))
    }

    /// Parses content based on format.
    fn parse_content(
        &self,
        content: &str,
        format: ConfigFormat,
        path: &Path,
    ) -> ConfigResult<AgriguardConfig> {
        let content = if self.resolve_env_vars {
            self.resolve_env_placeholders(content)
        } else {
            content.to_string()
        };

        parse_str(&content, format).map_err(|e| match e {
            ConfigError::Serialization { message } => ConfigError::parse(path, message),
            other => other,
        })
    }

    /// Resolves `${VAR_NAME}` and `${VAR_NAME:default}` placeholders.
    ///
    /// Unknown variables without a default are left in place.
    fn resolve_env_placeholders(&self, content: &str) -> String {
        let mut result = String::with_capacity(content.len());
        let mut chars = content.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' || chars.peek() != Some(&'{') {
                result.push(c);
                continue;
            }
            chars.next();

            let mut var_content = String::new();
            let mut found_close = false;
            for c in chars.by_ref() {
                if c == '}' {
                    found_close = true;
                    break;
                }
                var_content.push(c);
            }

            if !found_close {
                result.push_str("${");
                result.push_str(&var_content);
                continue;
            }

            let (var_name, default_value) = match var_content.split_once(':') {
                Some((name, default)) => (name, Some(default)),
                None => (var_content.as_str(), None),
            };

            match (env::var(var_name), default_value) {
                (Ok(value), _) => result.push_str(&value),
                (Err(_), Some(default)) => result.push_str(default),
                (Err(_), None) => {
                    warn!(variable = var_name, "Environment variable not found");
                    result.push_str(&format!("${{{}}}", var_name));
                }
            }
        }

        result
    }

    fn env_var(&self, suffix: &str) -> Option<(String, String)> {
        let name = format!("{}_{}", self.env_prefix, suffix);
        env::var(&name).ok().map(|value| (name, value))
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&self, config: &mut AgriguardConfig) -> ConfigResult<()> {
        // API
        if let Some((_, value)) = self.env_var("API_BASE_URL") {
            config.api.base_url = value;
        }
        if let Some((name, value)) = self.env_var("API_MODE") {
            config.api.mode = match value.to_lowercase().as_str() {
                "http" => AuthMode::Http,
                "directory" => AuthMode::Directory,
                _ => return Err(ConfigError::invalid_env_var(name, "expected http or directory")),
            };
        }
        if let Some((_, value)) = self.env_var("API_DIRECTORY_SECRET") {
            config.api.directory.secret = value;
        }

        // Storage
        if let Some((name, value)) = self.env_var("STORAGE_BACKEND") {
            config.storage.backend = match value.to_lowercase().as_str() {
                "memory" => StorageKind::Memory,
                "file" => StorageKind::File,
                "disabled" => StorageKind::Disabled,
                _ => {
                    return Err(ConfigError::invalid_env_var(
                        name,
                        "expected memory, file or disabled",
                    ))
                }
            };
        }
        if let Some((_, value)) = self.env_var("STORAGE_PATH") {
            config.storage.path = PathBuf::from(value);
        }
        if let Some((_, value)) = self.env_var("STORAGE_NAMESPACE") {
            config.storage.namespace = value;
        }

        // Session
        if let Some((_, value)) = self.env_var("SESSION_AUTO_REFRESH") {
            config.session.auto_refresh = parse_bool(&value);
        }

        // Logging
        if let Some((name, value)) = self.env_var("LOG_LEVEL") {
            config.logging.level = LogLevel::parse(&value)
                .ok_or_else(|| ConfigError::invalid_env_var(name, "expected a log level"))?;
        }
        if let Some((name, value)) = self.env_var("LOG_FORMAT") {
            config.logging.format = match value.to_lowercase().as_str() {
                "text" => LogFormat::Text,
                "compact" => LogFormat::Compact,
                "json" => LogFormat::Json,
                _ => return Err(ConfigError::invalid_env_var(name, "expected text, compact or json")),
            };
        }

        Ok(())
    }

    /// Resolves relative paths in configuration.
    fn resolve_relative_paths(&self, config: &mut AgriguardConfig, base_path: &Path) {
        if config.storage.path.is_relative() {
            config.storage.path = base_path.join(&config.storage.path);
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ConfigFormat
// =============================================================================

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format.
    Yaml,
    /// TOML format.
    Toml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Determines the format from a file path.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(other) => Err(ConfigError::unsupported_format(other)),
            None => Err(ConfigError::unsupported_format("(no extension)")),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parses a string to bool.
fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "true" | "1" | "yes" | "on" | "enabled"
    )
}

/// Parses a string based on format.
fn parse_str<T: DeserializeOwned>(content: &str, format: ConfigFormat) -> ConfigResult<T> {
    match format {
        ConfigFormat::Yaml => parse_yaml(content),
        ConfigFormat::Toml => {
            toml::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
        }
        ConfigFormat::Json => {
            serde_json::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
        }
    }
}

/// YAML parsing through the `config` crate.
fn parse_yaml<T: DeserializeOwned>(content: &str) -> ConfigResult<T> {
    let config = config::Config::builder()
        .add_source(config::File::from_str(content, config::FileFormat::Yaml))
        .build()
        .map_err(|e| ConfigError::serialization(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| ConfigError::serialization(e.to_string()))
}

// =============================================================================
// Convenience Functions
// =============================================================================

/// Loads configuration from a file with default settings.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<AgriguardConfig> {
    ConfigLoader::new().load(path)
}

/// Loads configuration from a string with the specified format.
pub fn load_config_str(content: &str, format: ConfigFormat) -> ConfigResult<AgriguardConfig> {
    ConfigLoader::new().load_from_str(content, format)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use agriguard_core::Role;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn test_yaml() -> &'static str {
        r#"
session:
  refresh_window: 2m
  expiry_check_interval: 500ms
  reconcile_interval: 1m
  auto_refresh: false

storage:
  backend: file
  path: state
  namespace: farmhub
  retention: 12h

api:
  base_url: https://dashboard.example.org
  request_timeout: 10s

routes:
  login_path: /signin
  table:
    - prefix: /dashboard
      roles: [centralAdmin, zoneAdmin, investor]

logging:
  level: debug
  format: json
"#
    }

    /// Loader that ignores the process environment.
    fn isolated() -> ConfigLoader {
        ConfigLoader::new().with_env_prefix("AGRIGUARD_TEST_UNSET_PREFIX")
    }

    #[test]
    fn test_load_yaml() {
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        file.write_all(test_yaml().as_bytes()).unwrap();

        let config = isolated().load(file.path()).unwrap();

        assert_eq!(config.session.refresh_window, Duration::from_secs(120));
        assert_eq!(config.session.expiry_check_interval, Duration::from_millis(500));
        assert!(!config.session.auto_refresh);
        assert_eq!(config.storage.backend, StorageKind::File);
        assert_eq!(config.storage.namespace, "farmhub");
        assert_eq!(config.storage.retention, Duration::from_secs(12 * 3600));
        assert_eq!(config.api.base_url, "https://dashboard.example.org");
        assert_eq!(config.routes.login_path, "/signin");
        assert_eq!(config.routes.unauthorized_path, "/unauthorized");
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Json);

        let table = config.routes.route_table();
        assert!(table.has_route_access(Role::ZoneAdmin, "/dashboard"));
        assert!(!table.has_route_access(Role::CentralAdmin, "/users"));
    }

    #[test]
    fn test_relative_storage_path_resolved_against_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agriguard.yaml");
        fs::write(&path, test_yaml()).unwrap();

        let config = isolated().load(&path).unwrap();
        assert_eq!(config.storage.path, dir.path().join("state"));
    }

    #[test]
    fn test_load_toml() {
        let toml = r#"
[session]
refresh_window = "10m"

[storage]
backend = "memory"

[logging]
level = "warn"
"#;
        let config = isolated().load_from_str(toml, ConfigFormat::Toml).unwrap();

        assert_eq!(config.session.refresh_window, Duration::from_secs(600));
        assert_eq!(config.logging.level, LogLevel::Warn);
    }

    #[test]
    fn test_load_json() {
        let json = r#"{"api": {"mode": "directory", "directory": {"secret": "0123456789abcdef0123", "users": []}}}"#;
        let config = isolated().load_from_str(json, ConfigFormat::Json).unwrap();

        assert_eq!(config.api.mode, AuthMode::Directory);
        assert_eq!(config.api.directory.token_lifetime, Duration::from_secs(3600));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = isolated().load_from_str(r#"{"session": {"refresh": "1m"}}"#, ConfigFormat::Json);
        assert!(matches!(result, Err(ConfigError::Serialization { .. })));
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let result = isolated().load_from_str(
            r#"{"session": {"expiry_check_interval": "10m", "reconcile_interval": "5m"}}"#,
            ConfigFormat::Json,
        );
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_env_placeholder_with_default() {
        let loader = ConfigLoader::new();
        let result = loader.resolve_env_placeholders("url: ${AGRIGUARD_TEST_NONEXISTENT:http://x}");
        assert_eq!(result, "url: http://x");
    }

    #[test]
    fn test_env_placeholder_missing_kept() {
        let loader = ConfigLoader::new();
        let result = loader.resolve_env_placeholders("a: ${AGRIGUARD_TEST_NONEXISTENT} b: ${open");
        assert_eq!(result, "a: ${AGRIGUARD_TEST_NONEXISTENT} b: ${open");
    }

    #[test]
    fn test_env_overrides() {
        let prefix = "AGRIGUARD_TEST_OVERRIDES";
        env::set_var(format!("{}_API_BASE_URL", prefix), "https://override.example.org");
        env::set_var(format!("{}_STORAGE_BACKEND", prefix), "disabled");
        env::set_var(format!("{}_LOG_LEVEL", prefix), "trace");

        let config = ConfigLoader::new()
            .with_env_prefix(prefix)
            .load_from_str("{}", ConfigFormat::Json)
            .unwrap();

        assert_eq!(config.api.base_url, "https://override.example.org");
        assert_eq!(config.storage.backend, StorageKind::Disabled);
        assert_eq!(config.logging.level, LogLevel::Trace);
    }

    #[test]
    fn test_invalid_env_override() {
        let prefix = "AGRIGUARD_TEST_BAD_OVERRIDE";
        env::set_var(format!("{}_STORAGE_BACKEND", prefix), "floppy");

        let result = ConfigLoader::new()
            .with_env_prefix(prefix)
            .load_from_str("{}", ConfigFormat::Json);
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar { .. })));
    }

    #[test]
    fn test_config_format_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.yml")).unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.TOML")).unwrap(), ConfigFormat::Toml);
        assert!(ConfigFormat::from_path(Path::new("a.ini")).is_err());
        assert!(ConfigFormat::from_path(Path::new("config")).is_err());
    }

    #[test]
    fn test_file_not_found() {
        let result = ConfigLoader::new().load("/nonexistent/path/agriguard.yaml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("yes"));
        assert!(parse_bool("ON"));
        assert!(!parse_bool("0"));
    }
}
