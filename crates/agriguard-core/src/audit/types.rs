// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Audit record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;
use crate::permission::PermissionKey;
use crate::types::{Role, UserId, ZoneId};

// =============================================================================
// Audit Log Entry
// =============================================================================

/// A single audit record of a session lifecycle event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    /// Unique entry ID.
    pub id: Uuid,

    /// When the event occurred.
    pub timestamp: DateTime<Utc>,

    /// What happened.
    pub action: AuditAction,

    /// Subject of the session, when known.
    pub user_id: Option<UserId>,

    /// Role of the session, when known.
    pub role: Option<Role>,

    /// Outcome.
    pub result: ActionResult,

    /// Free-form details.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
}

impl AuditLog {
    /// Creates a new entry stamped with the current time.
    pub fn new(action: AuditAction, result: ActionResult) -> Self {
        Self {
            id: Uuid::now_v7(),
            timestamp: Utc::now(),
            action,
            user_id: None,
            role: None,
            result,
            details: serde_json::Value::Null,
        }
    }

    /// Sets the subject.
    pub fn with_user(mut self, user_id: UserId, role: Role) -> Self {
        self.user_id = Some(user_id);
        self.role = Some(role);
        self
    }

    /// Sets the details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    // =========================================================================
    // Factory methods
    // =========================================================================

    /// Successful login.
    pub fn login(user_id: UserId, role: Role) -> Self {
        Self::new(AuditAction::Login, ActionResult::Success).with_user(user_id, role)
    }

    /// Rejected login. Only the error code is recorded, never the identifier.
    pub fn login_failed(error: &AuthError) -> Self {
        Self::new(
            AuditAction::LoginFailed,
            ActionResult::failure(error.error_code()),
        )
    }

    /// Explicit logout.
    pub fn logout(user_id: UserId, role: Role) -> Self {
        Self::new(AuditAction::Logout, ActionResult::Success).with_user(user_id, role)
    }

    /// Session dropped because the credential reached its expiry.
    pub fn session_expired(user_id: UserId, role: Role) -> Self {
        Self::new(AuditAction::SessionExpired, ActionResult::Success).with_user(user_id, role)
    }

    /// Credential replaced by the refresh endpoint.
    pub fn token_refresh(user_id: UserId, role: Role, expires_at: i64) -> Self {
        Self::new(AuditAction::TokenRefresh, ActionResult::Success)
            .with_user(user_id, role)
            .with_details(serde_json::json!({ "expiresAt": expires_at }))
    }

    /// Session invalidated because storage changed underneath it.
    pub fn external_logout(user_id: UserId, role: Role, reason: impl Into<String>) -> Self {
        Self::new(AuditAction::ExternalLogout, ActionResult::Success)
            .with_user(user_id, role)
            .with_details(serde_json::json!({ "reason": reason.into() }))
    }

    /// A permission or route check refused an action.
    pub fn access_denied(
        user_id: UserId,
        role: Role,
        permission: PermissionKey,
        resource_zone: Option<&ZoneId>,
    ) -> Self {
        Self::new(AuditAction::AccessDenied, ActionResult::Denied)
            .with_user(user_id, role)
            .with_details(serde_json::json!({
                "permission": permission.as_str(),
                "resourceZone": resource_zone.map(ZoneId::as_str),
            }))
    }
}

// =============================================================================
// Audit Action
// =============================================================================

/// Kind of session event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// User logged in.
    Login,
    /// Login attempt was rejected.
    LoginFailed,
    /// User logged out.
    Logout,
    /// Session ended by credential expiry.
    SessionExpired,
    /// Credential refreshed.
    TokenRefresh,
    /// Session ended by another tab or process.
    ExternalLogout,
    /// Action refused by the permission engine.
    AccessDenied,
}

impl AuditAction {
    /// Returns the action as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Login => "user_login",
            AuditAction::LoginFailed => "user_login_failed",
            AuditAction::Logout => "user_logout",
            AuditAction::SessionExpired => "session_expired",
            AuditAction::TokenRefresh => "token_refresh",
            AuditAction::ExternalLogout => "external_logout",
            AuditAction::AccessDenied => "access_denied",
        }
    }

    /// Returns `true` for events worth surfacing at warn level.
    pub fn is_security_sensitive(&self) -> bool {
        matches!(self, AuditAction::LoginFailed | AuditAction::AccessDenied)
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Action Result
// =============================================================================

/// Outcome of an audited event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionResult {
    /// Completed.
    Success,
    /// Failed with a reason code.
    Failure {
        /// Reason code.
        reason: String,
    },
    /// Refused by policy.
    Denied,
}

impl ActionResult {
    /// Creates a failure result.
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    /// Returns `true` on success.
    pub fn is_success(&self) -> bool {
        matches!(self, ActionResult::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_failed_omits_identifier() {
        let log = AuditLog::login_failed(&AuthError::InvalidCredentials);

        assert_eq!(log.action, AuditAction::LoginFailed);
        assert!(log.user_id.is_none());
        assert_eq!(log.result, ActionResult::failure("INVALID_CREDENTIALS"));
    }

    #[test]
    fn test_serialized_shape() {
        let log = AuditLog::login(UserId::new("7"), Role::ZoneAdmin);
        let json = serde_json::to_value(&log).unwrap();

        assert_eq!(json["action"], "login");
        assert_eq!(json["role"], "zoneAdmin");
        assert_eq!(json["result"]["status"], "success");
        assert!(json.get("details").is_none());
    }
}
