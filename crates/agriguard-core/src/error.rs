// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Authentication and authorization error types.
//!
//! Every failure the auth core can produce is one of the variants of
//! [`AuthError`]. Token and validation errors are collapsed to an
//! unauthenticated state by the session layer; permission and ownership
//! failures are surfaced to callers so the UI can show a distinct
//! "access denied" state.

use thiserror::Error;

use crate::permission::PermissionKey;
use crate::types::{Role, ZoneId};

/// Result type alias for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;

// =============================================================================
// AuthError
// =============================================================================

/// Errors produced by the authentication and authorization core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The credential does not have three base64url segments.
    #[error("Malformed token: {reason}")]
    MalformedToken {
        /// Why the token was rejected.
        reason: String,
    },

    /// The credential payload is not a well-formed claim set.
    #[error("Invalid token payload: {reason}")]
    InvalidPayload {
        /// Why the payload was rejected.
        reason: String,
    },

    /// The auth service rejected the identifier/secret pair.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The auth service or resource endpoint could not be reached.
    #[error("Network error: {message}")]
    Network {
        /// Transport error description.
        message: String,
    },

    /// No authenticated user is present (or the server reported 401).
    #[error("Authentication required")]
    AuthenticationRequired,

    /// The current role or zone does not permit the operation.
    #[error("Access denied: {permission}{}", zone_suffix(.resource_zone))]
    AccessDenied {
        /// The permission that was checked.
        permission: PermissionKey,
        /// Zone of the targeted resource, if any.
        resource_zone: Option<ZoneId>,
    },

    /// The session's user role does not match the credential's role claim.
    #[error("Role mismatch: credential says {claimed}, user record says {recorded}")]
    RoleMismatch {
        /// Role embedded in the credential.
        claimed: Role,
        /// Role on the denormalized user record.
        recorded: Role,
    },

    /// The credential's subject or zone claim disagrees with the user record.
    #[error("Identity mismatch: credential {field} is {claimed}, user record says {recorded}")]
    IdentityMismatch {
        /// Which claim disagrees (`sub` or `zone`).
        field: &'static str,
        /// Value embedded in the credential.
        claimed: String,
        /// Value on the denormalized user record.
        recorded: String,
    },

    /// A resource endpoint failed with a non-auth status.
    #[error("Upstream error (status {status}): {message}")]
    Upstream {
        /// HTTP-equivalent status code.
        status: u16,
        /// Error message.
        message: String,
    },

    /// Internal error.
    #[error("Internal error: {message}")]
    Internal {
        /// Error message (for logging, not user-facing).
        message: String,
    },
}

fn zone_suffix(zone: &Option<ZoneId>) -> String {
    match zone {
        Some(zone) => format!(" (zone {})", zone),
        None => String::new(),
    }
}

impl AuthError {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Creates a malformed token error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedToken {
            reason: reason.into(),
        }
    }

    /// Creates an invalid payload error.
    pub fn invalid_payload(reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            reason: reason.into(),
        }
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates an access denied error.
    pub fn access_denied(permission: PermissionKey, resource_zone: Option<ZoneId>) -> Self {
        Self::AccessDenied {
            permission,
            resource_zone,
        }
    }

    /// Creates an upstream error.
    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Returns the error code for categorization.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MalformedToken { .. } => "MALFORMED_TOKEN",
            AuthError::InvalidPayload { .. } => "INVALID_PAYLOAD",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::Network { .. } => "NETWORK_ERROR",
            AuthError::AuthenticationRequired => "AUTHENTICATION_REQUIRED",
            AuthError::AccessDenied { .. } => "ACCESS_DENIED",
            AuthError::RoleMismatch { .. } => "ROLE_MISMATCH",
            AuthError::IdentityMismatch { .. } => "IDENTITY_MISMATCH",
            AuthError::Upstream { .. } => "UPSTREAM_ERROR",
            AuthError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Returns a message that is safe to show to end users.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::MalformedToken { .. }
            | AuthError::InvalidPayload { .. }
            | AuthError::RoleMismatch { .. }
            | AuthError::IdentityMismatch { .. }
            | AuthError::AuthenticationRequired => "Please sign in to continue".to_string(),
            AuthError::InvalidCredentials => {
                "Sign-in failed. Check your email or phone number and password".to_string()
            }
            AuthError::Network { .. } => {
                "Could not reach the server. Check your connection and try again".to_string()
            }
            AuthError::AccessDenied { .. } => {
                "You do not have access to this resource".to_string()
            }
            AuthError::Upstream { status, .. } => {
                format!("The server could not complete the request ({})", status)
            }
            AuthError::Internal { .. } => "Something went wrong".to_string(),
        }
    }

    /// Returns `true` if the error means the credential itself is unusable.
    pub fn is_credential_error(&self) -> bool {
        matches!(
            self,
            AuthError::MalformedToken { .. }
                | AuthError::InvalidPayload { .. }
                | AuthError::RoleMismatch { .. }
                | AuthError::IdentityMismatch { .. }
        )
    }

    /// Returns `true` if this is a transport failure.
    pub fn is_network(&self) -> bool {
        matches!(self, AuthError::Network { .. })
    }

    /// Returns `true` if this error should be audited.
    pub fn should_audit(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials
                | AuthError::AccessDenied { .. }
                | AuthError::RoleMismatch { .. }
                | AuthError::IdentityMismatch { .. }
        )
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        AuthError::invalid_payload(err.to_string())
    }
}

// =============================================================================
// Tests
// =============================================================================
