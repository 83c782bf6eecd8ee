// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session state machine values.

use std::fmt;

use agriguard_core::{Session, User};
use serde::Serialize;

/// Why there is no authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnauthenticatedCause {
    /// Nothing has been hydrated yet, or the store was empty.
    Initial,
    /// The user logged out in this handle.
    LoggedOut,
    /// The credential reached its expiry.
    Expired,
    /// The stored session disappeared or failed validation.
    Invalidated,
}

impl UnauthenticatedCause {
    /// Returns the cause as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::LoggedOut => "logged_out",
            Self::Expired => "expired",
            Self::Invalidated => "invalidated",
        }
    }
}

/// Snapshot of the session manager state.
///
/// `Authenticated` and `Expiring` always carry a session whose user role
/// equals its credential's role claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No authenticated user.
    Unauthenticated {
        /// Why.
        cause: UnauthenticatedCause,
    },
    /// Reading the stored session.
    Hydrating,
    /// A valid session outside the refresh window.
    Authenticated(Session),
    /// A valid session inside the refresh window.
    Expiring(Session),
}

impl SessionState {
    /// The state before hydration.
    pub const INITIAL: SessionState = SessionState::Unauthenticated {
        cause: UnauthenticatedCause::Initial,
    };

    /// Creates an unauthenticated state.
    pub fn unauthenticated(cause: UnauthenticatedCause) -> Self {
        SessionState::Unauthenticated { cause }
    }

    /// Returns the session, if any.
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Authenticated(session) | SessionState::Expiring(session) => Some(session),
            _ => None,
        }
    }

    /// Returns the user, if any.
    pub fn user(&self) -> Option<&User> {
        self.session().map(Session::user)
    }

    /// Returns `true` if a user is present.
    pub fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }

    /// Returns `true` while hydrating.
    pub fn is_hydrating(&self) -> bool {
        matches!(self, SessionState::Hydrating)
    }

    /// Returns `true` inside the refresh window.
    pub fn is_expiring(&self) -> bool {
        matches!(self, SessionState::Expiring(_))
    }

    /// Returns the unauthenticated cause.
    pub fn cause(&self) -> Option<UnauthenticatedCause> {
        match self {
            SessionState::Unauthenticated { cause } => Some(*cause),
            _ => None,
        }
    }

    /// Returns the state name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Unauthenticated { cause: UnauthenticatedCause::LoggedOut } => "logged_out",
            SessionState::Unauthenticated { .. } => "unauthenticated",
            SessionState::Hydrating => "hydrating",
            SessionState::Authenticated(_) => "authenticated",
            SessionState::Expiring(_) => "expiring",
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.user() {
            Some(user) => write!(f, "{} ({}, {})", self.name(), user.id, user.role),
            None => write!(f, "{}", self.name()),
        }
    }
}
