// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `can-access` and `can` commands.
//!
//! Both check the logged-in user unless `--role` names a role to check
//! instead. A negative answer exits with the "denied" code.

use agriguard_config::AgriguardConfig;
use agriguard_core::{AuthError, PermissionEngine, PermissionMatrix, ZoneId};

use super::build_client;
use crate::cli::{CanAccessArgs, CanArgs};
use crate::error::{BinError, BinResult};

/// Executes the `can-access` command.
pub fn can_access(config: &AgriguardConfig, args: &CanAccessArgs) -> BinResult<()> {
    let allowed = match args.role {
        Some(role) => engine(config).has_route_access(role, &args.path),
        None => {
            let client = build_client(config)?;
            if client.current_user().is_none() {
                return Err(AuthError::AuthenticationRequired.into());
            }
            client.has_route_access(&args.path)
        }
    };

    report(allowed, &args.path)
}

/// Executes the `can` command.
pub fn can(config: &AgriguardConfig, args: &CanArgs) -> BinResult<()> {
    let resource_zone = args.zone.as_deref().map(ZoneId::from);
    let subject = describe(args.permission.as_str(), resource_zone.as_ref());

    let allowed = match args.role {
        Some(role) => {
            let user_zone = args.user_zone.as_deref().map(ZoneId::from);
            let engine = engine(config);
            match &resource_zone {
                Some(zone) => {
                    engine.can_access_resource(role, user_zone.as_ref(), args.permission, Some(zone))
                }
                None => engine.has_permission(role, args.permission),
            }
        }
        None => {
            let client = build_client(config)?;
            if client.current_user().is_none() {
                return Err(AuthError::AuthenticationRequired.into());
            }
            match &resource_zone {
                Some(zone) => client.can_access_resource(args.permission, Some(zone)),
                None => client.has_permission(args.permission),
            }
        }
    };

    report(allowed, &subject)
}

fn engine(config: &AgriguardConfig) -> PermissionEngine {
    PermissionEngine::new(PermissionMatrix::dashboard(), config.routes.route_table())
}

fn describe(permission: &str, zone: Option<&ZoneId>) -> String {
    match zone {
        Some(zone) => format!("{} in zone {}", permission, zone),
        None => permission.to_string(),
    }
}

fn report(allowed: bool, subject: &str) -> BinResult<()> {
    if allowed {
        println!("✓ allowed: {}", subject);
        Ok(())
    } else {
        println!("✗ denied: {}", subject);
        Err(BinError::denied(subject))
    }
}
