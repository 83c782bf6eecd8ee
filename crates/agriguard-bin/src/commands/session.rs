// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `login`, `logout` and `whoami` commands.

use agriguard_config::AgriguardConfig;
use agriguard_core::{AuthError, Session};
use chrono::{DateTime, Utc};

use super::build_client;
use crate::cli::{LoginArgs, OutputArgs, OutputFormat};
use crate::error::{BinError, BinResult};

/// Executes the `login` command.
pub async fn login(config: &AgriguardConfig, args: &LoginArgs) -> BinResult<()> {
    let password = args.password.as_deref().ok_or_else(|| {
        BinError::config("A password is required (--password or AGRIGUARD_PASSWORD)")
    })?;

    let client = build_client(config)?;
    let session = client
        .try_login(&args.identifier, password)
        .await
        .map_err(|e| BinError::from(e).with_context("Login failed"))?;

    println!(
        "✓ Logged in as {} ({})",
        session.user().name,
        session.role().label()
    );
    println!("  Expires: {}", format_expiry(&session));
    Ok(())
}

/// Executes the `logout` command.
pub fn logout(config: &AgriguardConfig) -> BinResult<()> {
    let client = build_client(config)?;
    let was_logged_in = client.current_user().is_some();
    client.logout();

    if was_logged_in {
        println!("✓ Logged out");
    } else {
        println!("Not logged in");
    }
    Ok(())
}

/// Executes the `whoami` command.
pub fn whoami(config: &AgriguardConfig, args: &OutputArgs) -> BinResult<()> {
    let client = build_client(config)?;
    let state = client.state();
    let session = state.session().ok_or(AuthError::AuthenticationRequired)?;
    let user = session.user();

    match args.format {
        OutputFormat::Text => {
            println!("User:    {} <{}>", user.name, user.email);
            println!("ID:      {}", user.id);
            println!("Role:    {} ({})", user.role.label(), user.role);
            if let Some(zone) = &user.zone_id {
                println!("Zone:    {}", zone);
            }
            println!("State:   {}", state);
            println!("Expires: {}", format_expiry(session));

            let permissions = client.engine().permissions_for(user.role);
            let mut keys: Vec<&str> = permissions.iter().map(|key| key.as_str()).collect();
            keys.sort_unstable();
            println!("Permissions:");
            for key in keys {
                println!("  {}", key);
            }
        }
        OutputFormat::Json => {
            let permissions: Vec<&str> = client
                .engine()
                .permissions_for(user.role)
                .iter()
                .map(|key| key.as_str())
                .collect();
            let output = serde_json::json!({
                "state": state.name(),
                "user": user,
                "expiresAt": session.expires_at(),
                "permissions": permissions,
                "routes": client.engine().routes_for(user.role),
            });
            let rendered = serde_json::to_string_pretty(&output)
                .map_err(|e| BinError::runtime(format!("Failed to render output: {}", e)))?;
            println!("{}", rendered);
        }
    }
    Ok(())
}

fn format_expiry(session: &Session) -> String {
    let expires_at = session.expires_at();
    match DateTime::<Utc>::from_timestamp(expires_at, 0) {
        Some(at) => at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => expires_at.to_string(),
    }
}
