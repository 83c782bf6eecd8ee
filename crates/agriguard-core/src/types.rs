// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core domain types: roles, identifiers, users and sessions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};
use crate::token::Credential;

// =============================================================================
// Role
// =============================================================================

/// Dashboard roles.
///
/// The set is closed: every session has exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    /// Manages every zone, device and user.
    #[serde(alias = "central_admin")]
    CentralAdmin,
    /// Manages farmers and data of a single zone.
    #[serde(alias = "zone_admin")]
    ZoneAdmin,
    /// Read-only view of recommendations and analytics.
    Investor,
}

impl Role {
    /// All roles, in a stable order.
    pub const ALL: [Role; 3] = [Role::CentralAdmin, Role::ZoneAdmin, Role::Investor];

    /// Returns the role name as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::CentralAdmin => "centralAdmin",
            Role::ZoneAdmin => "zoneAdmin",
            Role::Investor => "investor",
        }
    }

    /// Parses a role from a string.
    ///
    /// Accepts the camelCase wire names and the backend's snake_case names.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "centralAdmin" | "central_admin" | "CENTRAL_ADMIN" => Some(Role::CentralAdmin),
            "zoneAdmin" | "zone_admin" | "ZONE_ADMIN" => Some(Role::ZoneAdmin),
            "investor" | "INVESTOR" => Some(Role::Investor),
            _ => None,
        }
    }

    /// Returns `true` if resources are scoped to the user's own zone.
    pub fn is_zone_scoped(&self) -> bool {
        matches!(self, Role::ZoneAdmin)
    }

    /// Returns a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Role::CentralAdmin => "Central administrator",
            Role::ZoneAdmin => "Zone administrator",
            Role::Investor => "Investor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse(s).ok_or_else(|| AuthError::invalid_payload(format!("unknown role '{}'", s)))
    }
}

// =============================================================================
// Identifiers
// =============================================================================

/// Zone identifier.
///
/// Zones are numeric on the backend; the client treats them as opaque strings
/// and also accepts JSON numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(#[serde(deserialize_with = "string_or_number")] String);

impl ZoneId {
    /// Creates a new zone ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ZoneId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// User identifier (the credential's subject).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(#[serde(deserialize_with = "string_or_number")] String);

impl UserId {
    /// Creates a new user ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Str(s) => Ok(s),
        Raw::Int(n) => Ok(n.to_string()),
    }
}

// =============================================================================
// User
// =============================================================================

/// Human-readable projection of a credential's claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Email address.
    #[serde(default)]
    pub email: String,
    /// Role.
    pub role: Role,
    /// Zone the user administers (zone administrators only).
    #[serde(default, alias = "zone_id", skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<ZoneId>,
}

impl User {
    /// Creates a new user without a zone.
    pub fn new(id: impl Into<UserId>, name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            role,
            zone_id: None,
        }
    }

    /// Sets the zone.
    pub fn with_zone(mut self, zone_id: impl Into<ZoneId>) -> Self {
        self.zone_id = Some(zone_id.into());
        self
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<String> for ZoneId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// =============================================================================
// Session
// =============================================================================

/// An authenticated session: the credential and its user projection.
///
/// A session can only be constructed when the user record agrees with the
/// credential: same subject, same role, and no conflicting zone. A zone set
/// on only one side is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    credential: Credential,
    user: User,
}

impl Session {
    /// Creates a session, checking that the user record matches the claims.
    pub fn new(credential: Credential, user: User) -> AuthResult<Self> {
        let claims = credential.claims();
        if claims.subject_id != user.id {
            return Err(AuthError::IdentityMismatch {
                field: "sub",
                claimed: claims.subject_id.to_string(),
                recorded: user.id.to_string(),
            });
        }
        if claims.role != user.role {
            return Err(AuthError::RoleMismatch {
                claimed: claims.role,
                recorded: user.role,
            });
        }
        if let (Some(claimed), Some(recorded)) = (&claims.zone_id, &user.zone_id) {
            if claimed != recorded {
                return Err(AuthError::IdentityMismatch {
                    field: "zone",
                    claimed: claimed.to_string(),
                    recorded: recorded.to_string(),
                });
            }
        }
        Ok(Self { credential, user })
    }

    /// Returns the credential.
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Returns the user.
    pub fn user(&self) -> &User {
        &self.user
    }

    /// Returns the session role.
    pub fn role(&self) -> Role {
        self.user.role
    }

    /// Returns the zone the session is scoped to.
    ///
    /// Taken from the credential claim, or from the user record when the
    /// credential carries none.
    pub fn zone_id(&self) -> Option<&ZoneId> {
        self.credential
            .claims()
            .zone_id
            .as_ref()
            .or(self.user.zone_id.as_ref())
    }

    /// Returns the credential expiry (Unix seconds).
    pub fn expires_at(&self) -> i64 {
        self.credential.claims().expires_at
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{encode, Claims};

    fn credential(role: Role) -> Credential {
        let claims = Claims::builder("7")
            .email("amina@example.com")
            .role(role)
            .issued_at(1_000)
            .expires_at(4_600)
            .build();
        Credential::parse(encode(&claims)).unwrap()
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("centralAdmin"), Some(Role::CentralAdmin));
        assert_eq!(Role::parse("zone_admin"), Some(Role::ZoneAdmin));
        assert_eq!(Role::parse("investor"), Some(Role::Investor));
        assert_eq!(Role::parse("farmer"), None);
        assert!("exporter".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serde_names() {
        assert_eq!(serde_json::to_string(&Role::ZoneAdmin).unwrap(), "\"zoneAdmin\"");
        let role: Role = serde_json::from_str("\"central_admin\"").unwrap();
        assert_eq!(role, Role::CentralAdmin);
    }

    #[test]
    fn test_zone_id_accepts_numbers() {
        let user: User = serde_json::from_str(
            r#"{"id": 12, "name": "Amina", "email": "a@x.io", "role": "zoneAdmin", "zone_id": 3}"#,
        )
        .unwrap();
        assert_eq!(user.id, UserId::new("12"));
        assert_eq!(user.zone_id, Some(ZoneId::new("3")));
    }

    #[test]
    fn test_session_role_invariant() {
        let user = User::new("7", "Amina", "amina@example.com", Role::ZoneAdmin);
        assert!(Session::new(credential(Role::ZoneAdmin), user.clone()).is_ok());

        let err = Session::new(credential(Role::CentralAdmin), user).unwrap_err();
        assert_eq!(
            err,
            AuthError::RoleMismatch {
                claimed: Role::CentralAdmin,
                recorded: Role::ZoneAdmin,
            }
        );
    }

    #[test]
    fn test_session_rejects_foreign_user_record() {
        let other = User::new("8", "Kwame", "kwame@example.com", Role::ZoneAdmin);
        let err = Session::new(credential(Role::ZoneAdmin), other).unwrap_err();
        assert_eq!(
            err,
            AuthError::IdentityMismatch {
                field: "sub",
                claimed: "7".to_string(),
                recorded: "8".to_string(),
            }
        );
        assert!(err.is_credential_error());
    }

    #[test]
    fn test_session_zone_must_not_conflict() {
        let claims = Claims::builder("7")
            .role(Role::ZoneAdmin)
            .zone("z1")
            .issued_at(1_000)
            .expires_at(4_600)
            .build();
        let zoned = Credential::parse(encode(&claims)).unwrap();
        let user = User::new("7", "Amina", "amina@example.com", Role::ZoneAdmin);

        let err = Session::new(zoned.clone(), user.clone().with_zone("z2")).unwrap_err();
        assert!(matches!(err, AuthError::IdentityMismatch { field: "zone", .. }));

        let session = Session::new(zoned, user.clone().with_zone("z1")).unwrap();
        assert_eq!(session.zone_id(), Some(&ZoneId::new("z1")));

        // Zone present on one side only.
        let session = Session::new(credential(Role::ZoneAdmin), user.with_zone("z3")).unwrap();
        assert_eq!(session.zone_id(), Some(&ZoneId::new("z3")));
    }
}
