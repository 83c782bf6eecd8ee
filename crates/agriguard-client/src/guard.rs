// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Route guard.
//!
//! Decides whether a page subtree may render for the current session, and
//! keeps deciding for as long as the subtree stays mounted.

use std::sync::Arc;

use agriguard_config::RoutesConfig;
use agriguard_core::{PermissionEngine, Role};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::session::{SessionManager, SessionState};

// =============================================================================
// GuardDecision
// =============================================================================

/// What a guarded subtree should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// The session is still hydrating; show a placeholder.
    Loading,
    /// Render the children.
    Render {
        /// The session is inside its refresh window.
        expiring: bool,
    },
    /// No session; go to the login page.
    RedirectToLogin {
        /// Login path.
        to: String,
        /// The path originally requested.
        return_to: String,
    },
    /// Authenticated but not allowed here.
    RedirectUnauthorized {
        /// Unauthorized page path.
        to: String,
    },
}

impl GuardDecision {
    /// Returns `true` for either redirect.
    pub fn is_redirect(&self) -> bool {
        matches!(
            self,
            GuardDecision::RedirectToLogin { .. } | GuardDecision::RedirectUnauthorized { .. }
        )
    }

    /// Returns `true` if children render.
    pub fn is_render(&self) -> bool {
        matches!(self, GuardDecision::Render { .. })
    }

    /// Returns the redirect target, if any.
    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            GuardDecision::RedirectToLogin { to, .. } | GuardDecision::RedirectUnauthorized { to } => {
                Some(to)
            }
            _ => None,
        }
    }
}

// =============================================================================
// RouteGuard
// =============================================================================

/// Render-time gate over the session manager and permission engine.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    session: SessionManager,
    engine: PermissionEngine,
    login_path: Arc<str>,
    unauthorized_path: Arc<str>,
}

impl RouteGuard {
    /// Creates a guard with the configured redirect targets.
    pub fn new(session: SessionManager, engine: PermissionEngine, routes: &RoutesConfig) -> Self {
        Self {
            session,
            engine,
            login_path: Arc::from(routes.login_path.as_str()),
            unauthorized_path: Arc::from(routes.unauthorized_path.as_str()),
        }
    }

    /// Returns the login path.
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Returns the unauthorized page path.
    pub fn unauthorized_path(&self) -> &str {
        &self.unauthorized_path
    }

    /// Decides for a given state. Pure.
    ///
    /// `required_role`, when given, pins the route to that role even if the
    /// route table would admit others.
    pub fn evaluate(&self, state: &SessionState, path: &str, required_role: Option<Role>) -> GuardDecision {
        let session = match state {
            SessionState::Hydrating => return GuardDecision::Loading,
            SessionState::Unauthenticated { .. } => {
                return GuardDecision::RedirectToLogin {
                    to: self.login_path.to_string(),
                    return_to: path.to_string(),
                }
            }
            SessionState::Authenticated(session) | SessionState::Expiring(session) => session,
        };

        let role = session.role();
        let pinned_elsewhere = required_role.is_some_and(|required| required != role);
        if pinned_elsewhere || !self.engine.has_route_access(role, path) {
            debug!(path, role = %role, ?required_role, "Route refused");
            return GuardDecision::RedirectUnauthorized {
                to: self.unauthorized_path.to_string(),
            };
        }

        GuardDecision::Render {
            expiring: state.is_expiring(),
        }
    }

    /// Mounts a guarded subtree at `path`.
    pub fn mount(&self, path: &str, required_role: Option<Role>) -> GuardedRoute {
        let mut route = GuardedRoute {
            guard: self.clone(),
            path: path.to_string(),
            required_role,
            changes: self.session.subscribe(),
            decision: GuardDecision::Loading,
            torn_down: false,
        };
        route.poll();
        route
    }
}

// =============================================================================
// GuardedRoute
// =============================================================================

/// A mounted guarded subtree.
///
/// A redirect, once decided, is latched for the life of the mount. A subtree
/// that was rendering is torn down when a later session change refuses it.
#[derive(Debug)]
pub struct GuardedRoute {
    guard: RouteGuard,
    path: String,
    required_role: Option<Role>,
    changes: watch::Receiver<SessionState>,
    decision: GuardDecision,
    torn_down: bool,
}

impl GuardedRoute {
    /// Returns the current decision.
    pub fn decision(&self) -> &GuardDecision {
        &self.decision
    }

    /// Returns the guarded path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns `true` if rendered children were torn down by a later change.
    pub fn was_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Re-evaluates against the latest session state without waiting.
    pub fn poll(&mut self) -> &GuardDecision {
        if !self.decision.is_redirect() {
            let state = self.changes.borrow_and_update().clone();
            self.apply(&state);
        }
        &self.decision
    }

    /// Waits until hydration has settled.
    pub async fn settled(&mut self) -> &GuardDecision {
        while self.poll() == &GuardDecision::Loading {
            if self.changes.changed().await.is_err() {
                break;
            }
        }
        &self.decision
    }

    /// Waits for the next session change and re-evaluates.
    ///
    /// Returns `None` once the decision is a latched redirect or the session
    /// manager is gone.
    pub async fn next_change(&mut self) -> Option<&GuardDecision> {
        if self.decision.is_redirect() {
            return None;
        }
        self.changes.changed().await.ok()?;
        Some(self.poll())
    }

    fn apply(&mut self, state: &SessionState) {
        let next = self.guard.evaluate(state, &self.path, self.required_role);
        if self.decision.is_render() && next.is_redirect() {
            self.torn_down = true;
            info!(
                path = %self.path,
                target = next.redirect_target().unwrap_or_default(),
                "Guarded subtree torn down"
            );
        }
        self.decision = next;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use agriguard_core::token::encode;
    use agriguard_core::{Claims, Credential, Session, User};

    const NOW: i64 = 1_700_000_000;

    fn session(role: Role) -> Session {
        let claims = Claims::builder("5")
            .role(role)
            .issued_at(NOW)
            .expires_in(3600)
            .build();
        Session::new(
            Credential::parse(encode(&claims)).unwrap(),
            User::new("5", "Esi", "esi@example.com", role),
        )
        .unwrap()
    }

    fn guard() -> RouteGuard {
        use crate::service::DirectoryAuthService;
        use crate::store::{CredentialStore, MemoryStorage};
        use agriguard_config::DirectoryConfig;
        use agriguard_core::SystemClock;
        use std::time::Duration;

        let clock = Arc::new(SystemClock);
        let config = DirectoryConfig {
            secret: "guard-test-secret-value".to_string(),
            ..DirectoryConfig::default()
        };
        let service = Arc::new(DirectoryAuthService::from_config(&config, clock.clone()).unwrap());
        let store = CredentialStore::new(
            Arc::new(MemoryStorage::new()),
            "agriguard",
            Duration::from_secs(3600),
            clock,
        );
        let manager = SessionManager::builder(service, store).build();
        RouteGuard::new(manager, PermissionEngine::dashboard(), &RoutesConfig::default())
    }

    #[test]
    fn test_evaluate_states() {
        let guard = guard();

        assert_eq!(
            guard.evaluate(&SessionState::Hydrating, "/farmers", None),
            GuardDecision::Loading
        );
        assert_eq!(
            guard.evaluate(&SessionState::default(), "/farmers?page=2", None),
            GuardDecision::RedirectToLogin {
                to: "/login".to_string(),
                return_to: "/farmers?page=2".to_string(),
            }
        );
        assert_eq!(
            guard.evaluate(&SessionState::Authenticated(session(Role::ZoneAdmin)), "/farmers/12", None),
            GuardDecision::Render { expiring: false }
        );
        assert_eq!(
            guard.evaluate(&SessionState::Expiring(session(Role::ZoneAdmin)), "/farmers", None),
            GuardDecision::Render { expiring: true }
        );
    }

    #[test]
    fn test_evaluate_refuses_route_and_pinned_role() {
        let guard = guard();
        let zone_admin = SessionState::Authenticated(session(Role::ZoneAdmin));
        let unauthorized = GuardDecision::RedirectUnauthorized {
            to: "/unauthorized".to_string(),
        };

        assert_eq!(guard.evaluate(&zone_admin, "/zones", None), unauthorized);
        assert_eq!(guard.evaluate(&zone_admin, "/farmersmarket", None), unauthorized);
        assert_eq!(
            guard.evaluate(&zone_admin, "/dashboard", Some(Role::CentralAdmin)),
            unauthorized
        );
        assert!(guard
            .evaluate(&zone_admin, "/dashboard", Some(Role::ZoneAdmin))
            .is_render());
    }

    #[test]
    fn test_mount_before_login_latches_redirect() {
        let guard = guard();
        let mut route = guard.mount("/dashboard", None);

        assert!(route.decision().is_redirect());
        assert_eq!(route.decision().redirect_target(), Some("/login"));
        assert!(!route.was_torn_down());
        assert!(route.poll().is_redirect());
    }
}
