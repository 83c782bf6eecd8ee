// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-process user directory.
//!
//! Verifies argon2 password hashes and mints HS256-signed credentials whose
//! payload is the standard claim set, so the client codec reads them like any
//! other credential.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use agriguard_config::{DirectoryConfig, DirectoryUser};
use agriguard_core::{AuthError, AuthResult, Claims, Credential, Session, SharedClock, User, UserId};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::{debug, info};

use super::{AuthService, Identifier, LoginRequest};

/// Hashes a password into an argon2 PHC string.
pub fn hash_password(password: &str) -> AuthResult<String> {
    let salt = SaltString::encode_b64(uuid::Uuid::new_v4().as_bytes())
        .map_err(|e| AuthError::internal(format!("invalid salt: {}", e)))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::internal(format!("password hashing failed: {}", e)))
}

// =============================================================================
// Directory Entry
// =============================================================================

#[derive(Debug, Clone)]
struct DirectoryEntry {
    user: User,
    email: Option<String>,
    phone_number: Option<String>,
    password_hash: String,
}

impl DirectoryEntry {
    fn from_config(config: &DirectoryUser) -> AuthResult<Self> {
        let password_hash = match (&config.password_hash, &config.password) {
            (Some(hash), _) => hash.clone(),
            (None, Some(password)) => hash_password(password)?,
            (None, None) => {
                return Err(AuthError::internal(format!(
                    "directory user '{}' has no password",
                    config.id
                )))
            }
        };
        PasswordHash::new(&password_hash).map_err(|e| {
            AuthError::internal(format!("directory user '{}' has an invalid hash: {}", config.id, e))
        })?;

        let email = config.email.as_ref().map(|email| email.trim().to_lowercase());
        let mut user = User::new(
            config.id.as_str(),
            config.name.as_str(),
            email.clone().unwrap_or_default(),
            config.role,
        );
        user.zone_id = config.zone_id.as_deref().map(Into::into);

        Ok(Self {
            user,
            email,
            phone_number: config.phone_number.as_ref().map(|phone| phone.trim().to_string()),
            password_hash,
        })
    }

    fn matches(&self, identifier: &Identifier) -> bool {
        match identifier {
            Identifier::Email(email) => self.email.as_deref() == Some(email.as_str()),
            Identifier::Phone(phone) => self.phone_number.as_deref() == Some(phone.as_str()),
        }
    }

    fn verify(&self, secret: &str) -> bool {
        PasswordHash::new(&self.password_hash)
            .map(|hash| Argon2::default().verify_password(secret.as_bytes(), &hash).is_ok())
            .unwrap_or(false)
    }
}

// =============================================================================
// DirectoryAuthService
// =============================================================================

/// Auth service over a fixed set of users.
#[derive(Clone)]
pub struct DirectoryAuthService {
    entries: Arc<Vec<DirectoryEntry>>,
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    validation: Arc<Validation>,
    token_lifetime: Duration,
    clock: SharedClock,
}

impl DirectoryAuthService {
    /// Builds the directory, hashing any plain passwords.
    pub fn from_config(config: &DirectoryConfig, clock: SharedClock) -> AuthResult<Self> {
        config
            .validate()
            .map_err(|e| AuthError::internal(format!("invalid user directory: {}", e)))?;

        let entries = config
            .users
            .iter()
            .map(DirectoryEntry::from_config)
            .collect::<AuthResult<Vec<_>>>()?;

        // Expiry is checked against the injected clock, not the wall clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        info!(users = entries.len(), "User directory loaded");

        Ok(Self {
            entries: Arc::new(entries),
            encoding_key: Arc::new(EncodingKey::from_secret(config.secret.as_bytes())),
            decoding_key: Arc::new(DecodingKey::from_secret(config.secret.as_bytes())),
            validation: Arc::new(validation),
            token_lifetime: config.token_lifetime,
            clock,
        })
    }

    /// Returns the number of users.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the directory has no users.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn mint(&self, user: &User) -> AuthResult<Session> {
        let lifetime = i64::try_from(self.token_lifetime.as_secs()).unwrap_or(i64::MAX);
        let mut builder = Claims::builder(user.id.clone())
            .email(user.email.as_str())
            .name(user.name.as_str())
            .role(user.role)
            .issued_at(self.clock.now_secs())
            .expires_in(lifetime);
        if let Some(zone) = &user.zone_id {
            builder = builder.zone(zone.clone());
        }

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &builder.build(), &self.encoding_key)
            .map_err(|e| AuthError::internal(format!("Failed to create token: {}", e)))?;

        Session::new(Credential::parse(token)?, user.clone())
    }

    fn verify_signature(&self, credential: &Credential) -> AuthResult<Claims> {
        jsonwebtoken::decode::<Claims>(credential.as_str(), &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "Credential signature rejected");
                AuthError::AuthenticationRequired
            })
    }

    fn find_by_id(&self, id: &UserId) -> Option<&DirectoryEntry> {
        self.entries.iter().find(|entry| &entry.user.id == id)
    }
}

impl fmt::Debug for DirectoryAuthService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryAuthService")
            .field("users", &self.entries.len())
            .field("token_lifetime", &self.token_lifetime)
            .finish()
    }
}

#[async_trait]
impl AuthService for DirectoryAuthService {
    async fn issue(&self, request: &LoginRequest) -> AuthResult<Session> {
        let entry = self
            .entries
            .iter()
            .find(|entry| entry.matches(&request.identifier))
            .ok_or(AuthError::InvalidCredentials)?;

        if !entry.verify(request.secret()) {
            return Err(AuthError::InvalidCredentials);
        }

        self.mint(&entry.user)
    }

    async fn refresh(&self, session: &Session) -> AuthResult<Session> {
        let claims = self.verify_signature(session.credential())?;
        if claims.is_expired_at(self.clock.now_secs()) {
            return Err(AuthError::AuthenticationRequired);
        }

        let entry = self
            .find_by_id(&claims.subject_id)
            .ok_or(AuthError::AuthenticationRequired)?;

        self.mint(&entry.user)
    }

    fn name(&self) -> &str {
        "directory"
    }
}

// =============================================================================
// Tests
// =============================================================================
