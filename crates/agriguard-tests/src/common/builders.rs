// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Builders
//!
//! Fluent construction of sessions whose credential and user record agree.

use agriguard_core::token::encode;
use agriguard_core::{Claims, Credential, Role, Session, User, ZoneId};

use super::fixtures::NOW;

// =============================================================================
// SessionBuilder
// =============================================================================

/// Builder for [`Session`] values.
///
/// The credential is encoded from claims that mirror the user record, so the
/// result always satisfies the role invariant.
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    user: User,
    issued_at: i64,
    lifetime: i64,
    claimed_role: Option<Role>,
}

impl SessionBuilder {
    /// Starts a session for a new user with the given role.
    pub fn new(role: Role) -> Self {
        Self::for_user(User::new("100", "Test User", "test@example.com", role))
    }

    /// Starts a session for an existing user.
    pub fn for_user(user: User) -> Self {
        Self {
            user,
            issued_at: NOW,
            lifetime: 3600,
            claimed_role: None,
        }
    }

    /// Sets the user ID.
    pub fn id(mut self, id: &str) -> Self {
        self.user.id = id.into();
        self
    }

    /// Sets the display name.
    pub fn name(mut self, name: &str) -> Self {
        self.user.name = name.to_string();
        self
    }

    /// Sets the email.
    pub fn email(mut self, email: &str) -> Self {
        self.user.email = email.to_string();
        self
    }

    /// Sets the zone.
    pub fn zone(mut self, zone: &str) -> Self {
        self.user.zone_id = Some(ZoneId::new(zone));
        self
    }

    /// Sets the issue time (Unix seconds).
    pub fn issued_at(mut self, issued_at: i64) -> Self {
        self.issued_at = issued_at;
        self
    }

    /// Sets the lifetime in seconds.
    pub fn lifetime(mut self, seconds: i64) -> Self {
        self.lifetime = seconds;
        self
    }

    /// Makes the credential claim a different role than the user record.
    pub fn claiming(mut self, role: Role) -> Self {
        self.claimed_role = Some(role);
        self
    }

    /// Builds the claims.
    pub fn claims(&self) -> Claims {
        let mut builder = Claims::builder(self.user.id.clone())
            .email(self.user.email.clone())
            .name(self.user.name.clone())
            .role(self.claimed_role.unwrap_or(self.user.role))
            .issued_at(self.issued_at)
            .expires_in(self.lifetime);
        if let Some(zone) = &self.user.zone_id {
            builder = builder.zone(zone.clone());
        }
        builder.build()
    }

    /// Builds the encoded credential string.
    pub fn token(&self) -> String {
        encode(&self.claims())
    }

    /// Builds the session.
    ///
    /// # Panics
    ///
    /// Panics if [`SessionBuilder::claiming`] set a different role.
    pub fn build(self) -> Session {
        let credential = Credential::parse(self.token()).expect("encoded claims always parse");
        Session::new(credential, self.user).expect("claims mirror the user record")
    }
}
