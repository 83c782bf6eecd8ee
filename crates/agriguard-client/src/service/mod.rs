// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Credential issuance.
//!
//! The session manager talks to an [`AuthService`] to exchange an identifier
//! and secret for a session, and to re-issue a credential before it expires.
//!
//! - [`HttpAuthService`]: the dashboard backend over HTTP
//! - [`DirectoryAuthService`]: an in-process user directory

mod directory;
mod http;

use std::fmt;
use std::sync::Arc;

use agriguard_config::{ApiConfig, AuthMode};
use agriguard_core::{AuthResult, Session, SharedClock};
use async_trait::async_trait;

pub use directory::{hash_password, DirectoryAuthService};
pub use http::HttpAuthService;

// =============================================================================
// Identifier
// =============================================================================

/// What the user types into the login form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    /// An email address, lowercased.
    Email(String),
    /// A phone number, as typed.
    Phone(String),
}

impl Identifier {
    /// Classifies a raw identifier. Anything containing `@` is an email.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.contains('@') {
            Identifier::Email(raw.to_lowercase())
        } else {
            Identifier::Phone(raw.to_string())
        }
    }

    /// Returns the identifier value.
    pub fn as_str(&self) -> &str {
        match self {
            Identifier::Email(value) | Identifier::Phone(value) => value,
        }
    }

    /// Returns the wire field name (`email` or `phone_number`).
    pub fn field_name(&self) -> &'static str {
        match self {
            Identifier::Email(_) => "email",
            Identifier::Phone(_) => "phone_number",
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// LoginRequest
// =============================================================================

/// An identifier and secret pair.
#[derive(Clone)]
pub struct LoginRequest {
    /// The identifier.
    pub identifier: Identifier,
    secret: String,
}

impl LoginRequest {
    /// Creates a login request.
    pub fn new(identifier: Identifier, secret: impl Into<String>) -> Self {
        Self {
            identifier,
            secret: secret.into(),
        }
    }

    /// Returns the secret.
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// AuthService Trait
// =============================================================================

/// Issues and re-issues credentials.
#[async_trait]
pub trait AuthService: Send + Sync + fmt::Debug {
    /// Exchanges an identifier and secret for a session.
    ///
    /// # Errors
    ///
    /// - [`agriguard_core::AuthError::InvalidCredentials`] on rejection
    /// - [`agriguard_core::AuthError::Network`] if the service is unreachable
    async fn issue(&self, request: &LoginRequest) -> AuthResult<Session>;

    /// Re-issues the credential of a live session.
    async fn refresh(&self, session: &Session) -> AuthResult<Session>;

    /// Returns the service name.
    fn name(&self) -> &str;
}

/// Shared auth service handle.
pub type SharedAuthService = Arc<dyn AuthService>;

/// Builds the auth service selected by `api.mode`.
pub fn from_config(config: &ApiConfig, clock: SharedClock) -> AuthResult<SharedAuthService> {
    let service: SharedAuthService = match config.mode {
        AuthMode::Http => Arc::new(HttpAuthService::new(config)?),
        AuthMode::Directory => Arc::new(DirectoryAuthService::from_config(&config.directory, clock)?),
    };
    Ok(service)
}
