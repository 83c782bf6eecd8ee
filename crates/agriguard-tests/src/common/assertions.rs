// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Custom Test Assertions
//!
//! Assertions with informative failure messages, plus waiting helpers for
//! the background session tasks.

use std::fmt::Debug;
use std::time::Duration;

use agriguard_client::{GuardDecision, GuardedRoute, SessionManager, SessionState, UnauthenticatedCause};
use agriguard_core::{AuditAction, AuthError, AuthResult, InMemoryAuditLogger};

/// How long the waiting helpers wait before failing.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// State Assertions
// =============================================================================

/// Asserts the state is unauthenticated with the given cause.
pub fn assert_unauthenticated(state: &SessionState, cause: UnauthenticatedCause) {
    assert_eq!(
        state.cause(),
        Some(cause),
        "Expected unauthenticated ({}), got {}",
        cause.as_str(),
        state
    );
}

/// Asserts the audit trail recorded exactly these actions, in order.
pub fn assert_audit_actions(audit: &InMemoryAuditLogger, expected: &[AuditAction]) {
    assert_eq!(audit.actions(), expected, "Unexpected audit trail");
}

/// Asserts the result is an access denial.
pub fn assert_access_denied<T: Debug>(result: &AuthResult<T>) {
    assert!(
        matches!(result, Err(AuthError::AccessDenied { .. })),
        "Expected AccessDenied, got {:?}",
        result
    );
}

// =============================================================================
// Waiting Helpers
// =============================================================================

/// Waits until the manager's state satisfies `predicate`.
///
/// # Panics
///
/// Panics after [`WAIT_TIMEOUT`].
pub async fn wait_for_state<F>(manager: &SessionManager, predicate: F) -> SessionState
where
    F: Fn(&SessionState) -> bool,
{
    let mut changes = manager.subscribe();
    let waited = tokio::time::timeout(WAIT_TIMEOUT, async {
        loop {
            let state = changes.borrow_and_update().clone();
            if predicate(&state) {
                return state;
            }
            if changes.changed().await.is_err() {
                return manager.state();
            }
        }
    })
    .await;

    match waited {
        Ok(state) if predicate(&state) => state,
        Ok(state) => panic!("Session manager dropped in state {}", state),
        Err(_) => panic!("Timed out waiting for state; last state {}", manager.state()),
    }
}

/// Drives a mounted route until it decides to redirect.
///
/// # Panics
///
/// Panics after [`WAIT_TIMEOUT`].
pub async fn wait_for_redirect(route: &mut GuardedRoute) -> GuardDecision {
    let waited = tokio::time::timeout(WAIT_TIMEOUT, async {
        while !route.decision().is_redirect() {
            if route.next_change().await.is_none() {
                break;
            }
        }
        route.decision().clone()
    })
    .await;

    waited.unwrap_or_else(|_| panic!("Timed out waiting for redirect on {}", route.path()))
}
