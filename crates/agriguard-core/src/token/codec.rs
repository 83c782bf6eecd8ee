// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Bearer credential codec.
//!
//! Credentials have the three-segment `header.payload.signature` shape of a
//! JWT. The client never verifies the signature; it only checks structure and
//! the self-reported claims.

use std::fmt;
use std::time::Duration;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::Claims;
use crate::error::{AuthError, AuthResult};

/// URL-safe base64 that writes no padding and tolerates it on input.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Header written by [`encode`]. The credential is never signed client-side.
const UNSIGNED_HEADER: &str = r#"{"alg":"none","typ":"JWT"}"#;

// =============================================================================
// Codec Functions
// =============================================================================

/// Decodes a bearer credential into its claims.
///
/// # Errors
///
/// - [`AuthError::MalformedToken`] if the token does not have exactly three
///   segments or a segment is not base64url. Claims are not inspected.
/// - [`AuthError::InvalidPayload`] if the payload is not a JSON object with
///   at least `subjectId`, `role`, `issuedAt` and `expiresAt`.
pub fn decode(token: &str) -> AuthResult<Claims> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    if segments.len() != 3 {
        return Err(AuthError::malformed(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    }

    let mut decoded = Vec::with_capacity(3);
    for (index, segment) in segments.iter().enumerate() {
        let bytes = URL_SAFE_LENIENT.decode(segment).map_err(|e| {
            AuthError::malformed(format!("segment {} is not base64url: {}", index, e))
        })?;
        decoded.push(bytes);
    }

    let payload: serde_json::Value = serde_json::from_slice(&decoded[1])
        .map_err(|e| AuthError::invalid_payload(format!("payload is not JSON: {}", e)))?;

    if !payload.is_object() {
        return Err(AuthError::invalid_payload("payload is not an object"));
    }

    serde_json::from_value(payload).map_err(AuthError::from)
}

/// Encodes claims into an unsigned credential.
///
/// Deterministic inverse of [`decode`]; only used for demo and test
/// credentials.
pub fn encode(claims: &Claims) -> String {
    // Serializing a plain struct of strings and integers cannot fail.
    let payload = serde_json::to_vec(claims).unwrap_or_default();

    format!(
        "{}.{}.",
        URL_SAFE_LENIENT.encode(UNSIGNED_HEADER),
        URL_SAFE_LENIENT.encode(payload)
    )
}

/// Returns `true` iff `now >= expiresAt`.
pub fn is_expired(claims: &Claims, now: i64) -> bool {
    now >= claims.expires_at
}

/// Returns `true` iff `expiresAt - now < window`.
pub fn expires_within(claims: &Claims, now: i64, window: Duration) -> bool {
    let window = i64::try_from(window.as_secs()).unwrap_or(i64::MAX);
    claims.expires_at.saturating_sub(now) < window
}

// =============================================================================
// Credential
// =============================================================================

/// A bearer credential together with its decoded claims.
///
/// Never mutated; replaced wholesale on login, refresh and logout.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    raw: String,
    claims: Claims,
}

impl Credential {
    /// Parses a raw bearer string.
    pub fn parse(raw: impl Into<String>) -> AuthResult<Self> {
        let raw = raw.into().trim().to_string();
        let claims = decode(&raw)?;
        Ok(Self { raw, claims })
    }

    /// Returns the raw bearer string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the decoded claims.
    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    /// Returns the value for an `Authorization` header.
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.raw)
    }

    /// Returns `true` if the credential has expired at `now`.
    pub fn is_expired(&self, now: i64) -> bool {
        is_expired(&self.claims, now)
    }

    /// Returns `true` if the credential expires within `window` of `now`.
    pub fn expires_within(&self, now: i64, window: Duration) -> bool {
        expires_within(&self.claims, now, window)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("subject", &self.claims.subject_id)
            .field("role", &self.claims.role)
            .field("expires_at", &self.claims.expires_at)
            .finish_non_exhaustive()
    }
}

impl Serialize for Credential {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Credential {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Credential::parse(raw).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Tests
// =============================================================================
