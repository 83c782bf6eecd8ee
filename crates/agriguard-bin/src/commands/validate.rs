// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use agriguard_config::{AgriguardConfig, AuthMode, StorageKind};

use crate::cli::{Cli, OutputFormat, ValidateArgs};
use crate::error::{BinError, BinResult};

/// Executes the `validate` command to validate configuration.
pub fn validate(cli: &Cli, args: &ValidateArgs) -> BinResult<()> {
    let config_path = &cli.config;

    if !config_path.exists() {
        return Err(BinError::Configuration(format!(
            "Configuration file not found: {}",
            config_path.display()
        )));
    }

    let config = agriguard_config::load_config(config_path).map_err(|e| {
        BinError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    let warnings = collect_warnings(&config);

    match args.format {
        OutputFormat::Text => {
            println!("✓ Configuration is valid: {}", config_path.display());
            println!();
            println!("Summary:");
            println!("  Auth mode:      {}", auth_mode(&config));
            match config.api.mode {
                AuthMode::Http => println!("  Backend:        {}", config.api.base_url),
                AuthMode::Directory => {
                    println!("  Directory users: {}", config.api.directory.users.len())
                }
            }
            println!("  Storage:        {}", config.storage.backend.as_str());
            println!("  Namespace:      {}", config.storage.namespace);
            println!(
                "  Refresh window: {}",
                humantime::format_duration(config.session.refresh_window)
            );
            println!("  Auto refresh:   {}", if config.session.auto_refresh { "enabled" } else { "disabled" });
            println!("  Routes:         {}", config.routes.route_table().entries().len());

            if !warnings.is_empty() {
                println!();
                println!("Warnings:");
                for warning in &warnings {
                    println!("  ⚠ {}", warning);
                }
            }

            if args.show_config {
                println!();
                println!("Parsed configuration:");
                println!(
                    "{}",
                    serde_json::to_string_pretty(&redacted(&config))
                        .unwrap_or_else(|_| "(serialization error)".to_string())
                );
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "valid": true,
                "config_path": config_path.display().to_string(),
                "summary": {
                    "auth_mode": auth_mode(&config),
                    "base_url": config.api.base_url,
                    "directory_users": config.api.directory.users.len(),
                    "storage": config.storage.backend.as_str(),
                    "namespace": config.storage.namespace,
                    "auto_refresh": config.session.auto_refresh,
                    "route_count": config.routes.route_table().entries().len(),
                },
                "warnings": warnings,
                "config": if args.show_config { Some(redacted(&config)) } else { None },
            });
            let rendered = serde_json::to_string_pretty(&output)
                .map_err(|e| BinError::runtime(format!("Failed to render output: {}", e)))?;
            println!("{}", rendered);
        }
    }

    if args.strict && !warnings.is_empty() {
        return Err(BinError::Configuration(format!(
            "Strict mode: {} warning(s) found",
            warnings.len()
        )));
    }

    Ok(())
}

fn auth_mode(config: &AgriguardConfig) -> &'static str {
    match config.api.mode {
        AuthMode::Http => "http",
        AuthMode::Directory => "directory",
    }
}

/// Problems that do not make the config unusable.
pub(crate) fn collect_warnings(config: &AgriguardConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    match config.storage.backend {
        StorageKind::Memory => {
            warnings.push("Memory storage: sessions do not survive a restart".to_string())
        }
        StorageKind::Disabled => {
            warnings.push("Storage disabled: every login is lost immediately".to_string())
        }
        StorageKind::File => {
            if let Some(parent) = config.storage.path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    warnings.push(format!(
                        "Storage parent directory does not exist: {}",
                        parent.display()
                    ));
                }
            }
        }
    }

    match config.api.mode {
        AuthMode::Http => {
            if config.api.base_url.starts_with("http://")
                && !config.api.base_url.contains("localhost")
                && !config.api.base_url.contains("127.0.0.1")
            {
                warnings.push(format!(
                    "Backend is not using TLS: {}",
                    config.api.base_url
                ));
            }
        }
        AuthMode::Directory => {
            if config.api.directory.users.is_empty() {
                warnings.push("Directory mode with no users: nobody can log in".to_string());
            }
            for user in &config.api.directory.users {
                if user.password.is_some() {
                    warnings.push(format!(
                        "Directory user '{}' has a plaintext password",
                        user.id
                    ));
                }
            }
        }
    }

    if config.session.refresh_window.is_zero() {
        warnings.push("session.refresh_window is zero: sessions never enter the expiring state".to_string());
    }

    warnings
}

fn redacted(config: &AgriguardConfig) -> AgriguardConfig {
    let mut config = config.clone();
    if !config.api.directory.secret.is_empty() {
        config.api.directory.secret = "***".to_string();
    }
    for user in &mut config.api.directory.users {
        if user.password.is_some() {
            user.password = Some("***".to_string());
        }
        if user.password_hash.is_some() {
            user.password_hash = Some("***".to_string());
        }
    }
    config
}
