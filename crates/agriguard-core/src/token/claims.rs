// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Credential claims.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Role, UserId, ZoneId};

/// Claims embedded in a bearer credential.
///
/// This is the only shape downstream code sees; raw decoded JSON never leaves
/// the codec. Timestamps are Unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    // =========================================================================
    // Identity
    // =========================================================================
    /// Subject - the user ID.
    #[serde(rename = "subjectId", alias = "sub")]
    pub subject_id: UserId,

    /// User's email.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,

    /// User's display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    // =========================================================================
    // Authorization
    // =========================================================================
    /// The single role of this session.
    pub role: Role,

    /// Zone the user is scoped to (zone administrators).
    #[serde(
        rename = "zoneId",
        alias = "zone_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub zone_id: Option<ZoneId>,

    // =========================================================================
    // Validity
    // =========================================================================
    /// Issued at time (Unix timestamp).
    #[serde(rename = "issuedAt", alias = "iat")]
    pub issued_at: i64,

    /// Expiration time (Unix timestamp).
    #[serde(rename = "expiresAt", alias = "exp")]
    pub expires_at: i64,
}

impl Claims {
    /// Creates a builder for constructing claims.
    pub fn builder(subject_id: impl Into<UserId>) -> ClaimsBuilder {
        ClaimsBuilder::new(subject_id)
    }

    /// Returns the subject (user ID).
    pub fn subject(&self) -> &UserId {
        &self.subject_id
    }

    /// Returns `true` if the claims have expired at `now`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        super::is_expired(self, now)
    }

    /// Returns `true` if the claims expire within `window` of `now`.
    pub fn expires_within(&self, now: i64, window: Duration) -> bool {
        super::expires_within(self, now, window)
    }

    /// Returns the time remaining until expiration.
    pub fn time_until_expiration(&self, now: i64) -> Option<Duration> {
        if self.expires_at > now {
            Some(Duration::from_secs((self.expires_at - now) as u64))
        } else {
            None
        }
    }

    /// Returns the expiration time as a DateTime.
    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.expires_at, 0)
    }

    /// Returns the issued at time as a DateTime.
    pub fn issued_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.issued_at, 0)
    }
}

// =============================================================================
// Claims Builder
// =============================================================================

/// Builder for constructing claims.
#[derive(Debug)]
pub struct ClaimsBuilder {
    subject_id: UserId,
    email: String,
    name: Option<String>,
    role: Role,
    zone_id: Option<ZoneId>,
    issued_at: Option<i64>,
    expires_at: Option<i64>,
    expires_in_secs: i64,
}

impl ClaimsBuilder {
    /// Creates a new builder.
    pub fn new(subject_id: impl Into<UserId>) -> Self {
        Self {
            subject_id: subject_id.into(),
            email: String::new(),
            name: None,
            role: Role::Investor,
            zone_id: None,
            issued_at: None,
            expires_at: None,
            expires_in_secs: 3600, // 1 hour default
        }
    }

    /// Sets the email.
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    /// Sets the display name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the role.
    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Sets the zone.
    pub fn zone(mut self, zone_id: impl Into<ZoneId>) -> Self {
        self.zone_id = Some(zone_id.into());
        self
    }

    /// Sets the issued-at timestamp. Defaults to now.
    pub fn issued_at(mut self, issued_at: i64) -> Self {
        self.issued_at = Some(issued_at);
        self
    }

    /// Sets an absolute expiry timestamp.
    pub fn expires_at(mut self, expires_at: i64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Sets the lifetime relative to the issued-at time.
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.expires_in_secs = seconds;
        self.expires_at = None;
        self
    }

    /// Builds the claims.
    pub fn build(self) -> Claims {
        let issued_at = self.issued_at.unwrap_or_else(|| Utc::now().timestamp());
        let expires_at = self
            .expires_at
            .unwrap_or(issued_at + self.expires_in_secs);

        Claims {
            subject_id: self.subject_id,
            email: self.email,
            name: self.name,
            role: self.role,
            zone_id: self.zone_id,
            issued_at,
            expires_at,
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
    fn test_claims_builder() {
        let claims = Claims::builder("42")
            .email("musa@example.com")
            .name("Musa")
            .role(Role::ZoneAdmin)
            .zone("z1")
            .issued_at(1_000)
            .expires_in(600)
            .build();

        assert_eq!(claims.subject().as_str(), "42");
        assert_eq!(claims.role, Role::ZoneAdmin);
        assert_eq!(claims.zone_id, Some(ZoneId::new("z1")));
        assert_eq!(claims.expires_at, 1_600);
    }

    #[test]
    fn test_time_until_expiration() {
        let claims = Claims::builder("1").issued_at(0).expires_at(100).build();

        assert_eq!(claims.time_until_expiration(40), Some(Duration::from_secs(60)));
        assert_eq!(claims.time_until_expiration(100), None);
    }

    #[test]
    fn test_standard_jwt_names_are_accepted() {
        let claims: Claims = serde_json::from_str(
            r#"{"sub": "9", "role": "central_admin", "iat": 10, "exp": 20}"#,
        )
        .unwrap();

        assert_eq!(claims.subject().as_str(), "9");
        assert_eq!(claims.role, Role::CentralAdmin);
        assert_eq!(claims.issued_at, 10);
        assert_eq!(claims.expires_at, 20);
        assert!(claims.email.is_empty());
    }
}
