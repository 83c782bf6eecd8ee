// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The auth client facade handed to the UI layer.

use std::sync::Arc;

use agriguard_config::AgriguardConfig;
use agriguard_core::{
    AuthError, AuthResult, PermissionEngine, PermissionKey, PermissionMatrix, Role, Session,
    SharedAuditLogger, SharedClock, SystemClock, TracingAuditLogger, User, ZoneId,
};

use crate::data::{DataClient, HttpTransport, SharedTransport};
use crate::guard::{GuardedRoute, RouteGuard};
use crate::service::{self, SharedAuthService};
use crate::session::{SessionManager, SessionSettings, SessionState};
use crate::store::{open_backend, CredentialStore, SharedStorage};

// =============================================================================
// AuthClient
// =============================================================================

/// Session, permissions, route guard and data client behind one handle.
///
/// The session is hydrated from storage when the client is built, so a guard
/// mounted right away already sees the restored session.
#[derive(Debug, Clone)]
pub struct AuthClient {
    session: SessionManager,
    engine: PermissionEngine,
    guard: RouteGuard,
    data: DataClient,
}

impl AuthClient {
    /// Builds a client with the wall clock and default collaborators.
    pub fn from_config(config: &AgriguardConfig) -> AuthResult<Self> {
        Self::builder(config.clone()).build()
    }

    /// Starts building a client.
    pub fn builder(config: AgriguardConfig) -> AuthClientBuilder {
        AuthClientBuilder::new(config)
    }

    /// Logs in. Returns `false` on any failure; see [`AuthClient::try_login`]
    /// for the reason.
    pub async fn login(&self, identifier: &str, secret: &str) -> bool {
        self.session.login(identifier, secret).await.is_ok()
    }

    /// Logs in, reporting why it failed.
    pub async fn try_login(&self, identifier: &str, secret: &str) -> AuthResult<Session> {
        self.session.login(identifier, secret).await
    }

    /// Logs out.
    pub fn logout(&self) {
        self.session.logout();
    }

    /// Returns the current user.
    pub fn current_user(&self) -> Option<User> {
        self.session.current_user()
    }

    /// Returns the current state.
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Returns `true` if the current user's role grants `key`.
    pub fn has_permission(&self, key: PermissionKey) -> bool {
        self.current_role()
            .is_some_and(|role| self.engine.has_permission(role, key))
    }

    /// Returns `true` if the current user may open `path`.
    pub fn has_route_access(&self, path: &str) -> bool {
        self.current_role()
            .is_some_and(|role| self.engine.has_route_access(role, path))
    }

    /// Returns `true` if the current user may apply `key` to a resource in
    /// `resource_zone`.
    pub fn can_access_resource(&self, key: PermissionKey, resource_zone: Option<&ZoneId>) -> bool {
        self.session.current_session().is_some_and(|session| {
            self.engine
                .can_access_resource(session.role(), session.zone_id(), key, resource_zone)
        })
    }

    /// Returns the route guard.
    pub fn guard(&self) -> &RouteGuard {
        &self.guard
    }

    /// Mounts a guarded route.
    pub fn mount(&self, path: &str, required_role: Option<Role>) -> GuardedRoute {
        self.guard.mount(path, required_role)
    }

    /// Returns the data client.
    pub fn data(&self) -> &DataClient {
        &self.data
    }

    /// Returns the session manager.
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Returns the permission engine.
    pub fn engine(&self) -> &PermissionEngine {
        &self.engine
    }

    /// Re-hydrates and starts the background session tasks.
    pub fn init(&self) -> SessionState {
        self.session.init()
    }

    /// Stops the background session tasks.
    pub fn teardown(&self) {
        self.session.teardown();
    }

    fn current_role(&self) -> Option<Role> {
        self.session.current_user().map(|user| user.role)
    }
}

// =============================================================================
// AuthClientBuilder
// =============================================================================

/// Builder for [`AuthClient`]. Unset collaborators come from the config.
pub struct AuthClientBuilder {
    config: AgriguardConfig,
    clock: Option<SharedClock>,
    audit: Option<SharedAuditLogger>,
    storage: Option<SharedStorage>,
    service: Option<SharedAuthService>,
    transport: Option<SharedTransport>,
    matrix: Option<PermissionMatrix>,
}

impl AuthClientBuilder {
    /// Creates a builder.
    pub fn new(config: AgriguardConfig) -> Self {
        Self {
            config,
            clock: None,
            audit: None,
            storage: None,
            service: None,
            transport: None,
            matrix: None,
        }
    }

    /// Sets the clock.
    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the audit logger.
    pub fn audit_logger(mut self, audit: SharedAuditLogger) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Sets the storage backend instead of opening `storage.backend`.
    pub fn storage(mut self, storage: SharedStorage) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Sets the auth service instead of building it from `api`.
    pub fn auth_service(mut self, service: SharedAuthService) -> Self {
        self.service = Some(service);
        self
    }

    /// Sets the resource transport.
    pub fn transport(mut self, transport: SharedTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets a non-default permission matrix.
    pub fn permission_matrix(mut self, matrix: PermissionMatrix) -> Self {
        self.matrix = Some(matrix);
        self
    }

    /// Builds and hydrates the client.
    pub fn build(self) -> AuthResult<AuthClient> {
        let config = self.config;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let storage = match self.storage {
            Some(storage) => storage,
            None => open_backend(&config.storage)
                .map_err(|e| AuthError::internal(format!("Failed to open session storage: {}", e)))?,
        };
        let store = CredentialStore::from_config(storage, &config.storage, clock.clone());

        let auth_service = match self.service {
            Some(service) => service,
            None => service::from_config(&config.api, clock.clone())?,
        };
        let transport: SharedTransport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(&config.api)?),
        };

        let engine = PermissionEngine::new(
            self.matrix.unwrap_or_else(PermissionMatrix::dashboard),
            config.routes.route_table(),
        );

        let session = SessionManager::builder(auth_service, store)
            .settings(SessionSettings::from(&config.session))
            .clock(clock)
            .audit_logger(
                self.audit
                    .unwrap_or_else(|| Arc::new(TracingAuditLogger::new())),
            )
            .build();
        session.hydrate();

        let guard = RouteGuard::new(session.clone(), engine.clone(), &config.routes);
        let data = DataClient::new(session.clone(), engine.clone(), transport);

        Ok(AuthClient {
            session,
            engine,
            guard,
            data,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use agriguard_config::{AuthMode, DirectoryUser};
    use agriguard_core::{InMemoryAuditLogger, ManualClock};

    const NOW: i64 = 1_700_000_000;

    fn config() -> AgriguardConfig {
        let mut config = AgriguardConfig::default();
        config.api.mode = AuthMode::Directory;
        config.api.directory.secret = "client-test-secret-value".to_string();
        config.api.directory.users = vec![DirectoryUser {
            id: "3".to_string(),
            name: "Yaw".to_string(),
            email: Some("yaw@example.com".to_string()),
            phone_number: None,
            role: Role::ZoneAdmin,
            zone_id: Some("z1".to_string()),
            password_hash: None,
            password: Some("yaw-password".to_string()),
        }];
        config
    }

    #[tokio::test]
    async fn test_login_and_queries() {
        let audit = InMemoryAuditLogger::new();
        let client = AuthClient::builder(config())
            .clock(Arc::new(ManualClock::at_secs(NOW)))
            .audit_logger(Arc::new(audit.clone()))
            .build()
            .unwrap();

        assert!(!client.has_route_access("/dashboard"));
        assert!(!client.login("yaw@example.com", "nope").await);
        assert!(client.login("yaw@example.com", "yaw-password").await);

        assert_eq!(client.current_user().map(|u| u.role), Some(Role::ZoneAdmin));
        assert!(client.has_permission(PermissionKey::FarmersWrite));
        assert!(!client.has_permission(PermissionKey::ZonesRead));
        assert!(client.has_route_access("/farmers/7"));
        assert!(!client.has_route_access("/zones"));
        assert!(client.can_access_resource(PermissionKey::FarmersRead, Some(&ZoneId::new("z1"))));
        assert!(!client.can_access_resource(PermissionKey::FarmersRead, Some(&ZoneId::new("z2"))));

        client.logout();
        assert!(client.current_user().is_none());
        assert_eq!(audit.len(), 3);
    }

    #[tokio::test]
    async fn test_build_hydrates_from_shared_storage() {
        let storage: SharedStorage = Arc::new(crate::store::MemoryStorage::new());
        let clock: SharedClock = Arc::new(ManualClock::at_secs(NOW));

        let first = AuthClient::builder(config())
            .clock(clock.clone())
            .storage(storage.clone())
            .build()
            .unwrap();
        assert!(first.login("yaw@example.com", "yaw-password").await);

        let second = AuthClient::builder(config())
            .clock(clock)
            .storage(storage)
            .build()
            .unwrap();
        assert_eq!(second.current_user(), first.current_user());
        assert!(second.mount("/farmers", None).decision().is_render());
    }
}
