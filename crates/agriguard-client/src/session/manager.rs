// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session manager.
//!
//! Owns the single current session. Every transition is one synchronous
//! replacement of the watch-channel value, taken under the transition lock,
//! so observers never see a half-applied transition.
//!
//! Async operations (login, refresh) remember the logout epoch they started
//! in. A result that arrives after a logout or invalidation is discarded.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use agriguard_config::SessionConfig;
use agriguard_core::{
    AuditLog, AuthError, AuthResult, PermissionKey, Session, SharedAuditLogger, SharedClock,
    SystemClock, TracingAuditLogger, User, ZoneId,
};
use parking_lot::Mutex;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::state::{SessionState, UnauthenticatedCause};
use crate::service::{Identifier, LoginRequest, SharedAuthService};
use crate::store::{CredentialStore, LoadOutcome};

// =============================================================================
// SessionSettings
// =============================================================================

/// Timing settings of the session manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Remaining lifetime below which a session is `Expiring`.
    pub refresh_window: Duration,
    /// Expiry tick while `Expiring`.
    pub expiry_check_interval: Duration,
    /// Reconciliation poll, and the longest the monitor sleeps.
    pub reconcile_interval: Duration,
    /// Refresh automatically once per credential while `Expiring`.
    pub auto_refresh: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&SessionConfig::default())
    }
}

impl From<&SessionConfig> for SessionSettings {
    fn from(config: &SessionConfig) -> Self {
        Self {
            refresh_window: config.refresh_window,
            expiry_check_interval: config.expiry_check_interval,
            reconcile_interval: config.reconcile_interval,
            auto_refresh: config.auto_refresh,
        }
    }
}

// =============================================================================
// SessionManager
// =============================================================================

struct Inner {
    service: SharedAuthService,
    store: CredentialStore,
    audit: SharedAuditLogger,
    clock: SharedClock,
    settings: SessionSettings,

    state: watch::Sender<SessionState>,
    /// Serializes read-modify-write of `state`. Never held across an await.
    transition: Mutex<()>,
    /// Bumped whenever the session is torn down.
    epoch: AtomicU64,
    /// Credential for which an automatic refresh was already attempted.
    auto_refreshed: Mutex<Option<String>>,
    /// Whether storage holds the current session's record.
    persisted: AtomicBool,

    running: AtomicBool,
    shutdown: Arc<Notify>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// The session state machine.
///
/// Cloning is cheap; clones share the same session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    /// Starts building a manager.
    pub fn builder(service: SharedAuthService, store: CredentialStore) -> SessionManagerBuilder {
        SessionManagerBuilder::new(service, store)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Returns a snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Returns the current user without any I/O.
    pub fn current_user(&self) -> Option<User> {
        self.inner.state.borrow().user().cloned()
    }

    /// Returns the current session.
    pub fn current_session(&self) -> Option<Session> {
        self.inner.state.borrow().session().cloned()
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Returns the timing settings.
    pub fn settings(&self) -> &SessionSettings {
        &self.inner.settings
    }

    /// Returns the credential store.
    pub fn store(&self) -> &CredentialStore {
        &self.inner.store
    }

    /// Returns `true` while the background tasks are running.
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Reads the stored session and settles into a steady state.
    pub fn hydrate(&self) -> SessionState {
        let _transition = self.inner.transition.lock();
        self.set_state(SessionState::Hydrating);

        let next = match self.inner.store.load() {
            Some(session) => {
                self.inner.persisted.store(true, Ordering::SeqCst);
                self.classify(session)
            }
            None => SessionState::unauthenticated(UnauthenticatedCause::Initial),
        };

        if let Some(user) = next.user() {
            info!(user_id = %user.id, role = %user.role, "Session restored");
        }
        self.set_state(next.clone());
        next
    }

    /// Exchanges an identifier (email or phone number) and secret for a
    /// session. A successful login replaces any current session.
    ///
    /// No retry is attempted.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidCredentials`] if the service rejects the pair
    /// - [`AuthError::Network`] if the service is unreachable
    /// - [`AuthError::AuthenticationRequired`] if a logout happened while the
    ///   request was in flight
    pub async fn login(&self, identifier: &str, secret: &str) -> AuthResult<Session> {
        let request = LoginRequest::new(Identifier::parse(identifier), secret);
        let epoch = self.epoch();

        let issued = self.inner.service.issue(&request).await.and_then(|session| {
            if session.credential().is_expired(self.inner.clock.now_secs()) {
                Err(AuthError::invalid_payload("issued credential is already expired"))
            } else {
                Ok(session)
            }
        });

        let session = match issued {
            Ok(session) => session,
            Err(e) => {
                warn!(
                    field = request.identifier.field_name(),
                    error_code = e.error_code(),
                    "Login failed"
                );
                self.inner.audit.log(AuditLog::login_failed(&e));
                return Err(e);
            }
        };

        let _transition = self.inner.transition.lock();
        if self.epoch() != epoch {
            info!(user_id = %session.user().id, "Discarding login that completed after logout");
            return Err(AuthError::AuthenticationRequired);
        }

        let persisted = self.inner.store.save(&session);
        self.inner.persisted.store(persisted, Ordering::SeqCst);
        let next = self.classify(session.clone());
        self.set_state(next);

        let user = session.user();
        info!(user_id = %user.id, role = %user.role, "User logged in");
        self.inner.audit.log(AuditLog::login(user.id.clone(), user.role));
        Ok(session)
    }

    /// Clears the session. Never touches the network and is idempotent.
    pub fn logout(&self) {
        let _transition = self.inner.transition.lock();
        self.bump_epoch();
        self.inner.store.clear();

        let previous = self.inner.state.borrow().user().cloned();
        if let Some(user) = previous {
            info!(user_id = %user.id, role = %user.role, "User logged out");
            self.inner.audit.log(AuditLog::logout(user.id, user.role));
        }

        self.set_state(SessionState::unauthenticated(UnauthenticatedCause::LoggedOut));
    }

    /// Re-derives the state from durable storage.
    ///
    /// Picks up a logout or login performed by another handle that shares the
    /// same storage.
    pub fn check_auth(&self) -> SessionState {
        let _transition = self.inner.transition.lock();
        let current = self.state();
        if current.is_hydrating() {
            return current;
        }

        if let Some(session) = current.session() {
            if session.credential().is_expired(self.inner.clock.now_secs()) {
                return self.expire(session);
            }
        }

        let stored = match self.inner.store.read() {
            LoadOutcome::Unavailable => {
                debug!("Storage unavailable; keeping the in-memory session");
                return current;
            }
            outcome => outcome.into_session(),
        };
        let persisted = self.inner.persisted.load(Ordering::SeqCst);

        let next = match (current.session(), stored) {
            (Some(session), Some(stored))
                if stored.user().id == session.user().id
                    && stored.expires_at() < session.expires_at() =>
            {
                debug!(user_id = %session.user().id, "Stored credential is older; keeping ours");
                current
            }
            (_, Some(stored)) => {
                if current.session().map(|s| s.credential()) != Some(stored.credential()) {
                    info!(user_id = %stored.user().id, "Session picked up from storage");
                }
                self.inner.persisted.store(true, Ordering::SeqCst);
                self.classify(stored)
            }
            (Some(_), None) if !persisted => {
                debug!("Session was never persisted; nothing to reconcile against");
                current
            }
            (Some(session), None) => {
                let user = session.user();
                info!(user_id = %user.id, "Session ended by another handle");
                self.inner.audit.log(AuditLog::external_logout(
                    user.id.clone(),
                    user.role,
                    "session no longer in storage",
                ));
                self.bump_epoch();
                SessionState::unauthenticated(UnauthenticatedCause::Invalidated)
            }
            (None, None) => current,
        };

        self.set_state(next.clone());
        next
    }

    /// Evaluates expiry once.
    ///
    /// Moves `Authenticated` into `Expiring` inside the refresh window, and
    /// any session past its expiry into `Unauthenticated`, clearing storage.
    pub fn check_expiry(&self) -> SessionState {
        let _transition = self.inner.transition.lock();
        let current = self.state();
        let Some(session) = current.session() else {
            return current;
        };

        if session.credential().is_expired(self.inner.clock.now_secs()) {
            return self.expire(session);
        }

        let next = self.classify(session.clone());
        self.set_state(next.clone());
        next
    }

    /// Asks the auth service to re-issue the current credential.
    ///
    /// # Errors
    ///
    /// - [`AuthError::AuthenticationRequired`] without a session, if the
    ///   service refuses, or if the session changed while the request was in
    ///   flight
    /// - whatever the service reports otherwise; the session is kept
    pub async fn refresh(&self) -> AuthResult<Session> {
        let current = self.current_session().ok_or(AuthError::AuthenticationRequired)?;
        let epoch = self.epoch();

        let refreshed = match self.inner.service.refresh(&current).await {
            Ok(session) => session,
            Err(e) => {
                warn!(user_id = %current.user().id, error = %e, "Credential refresh failed");
                return Err(e);
            }
        };

        let _transition = self.inner.transition.lock();
        let still_current = self
            .inner
            .state
            .borrow()
            .user()
            .is_some_and(|user| user.id == refreshed.user().id);
        if self.epoch() != epoch || !still_current {
            info!(user_id = %refreshed.user().id, "Discarding refresh for an ended session");
            return Err(AuthError::AuthenticationRequired);
        }

        let next = self.classify(refreshed.clone());
        if !next.is_authenticated() {
            return Err(AuthError::invalid_payload("refreshed credential is already expired"));
        }

        let persisted = self.inner.store.save(&refreshed);
        self.inner.persisted.store(persisted, Ordering::SeqCst);
        self.set_state(next);

        let user = refreshed.user();
        info!(user_id = %user.id, expires_at = refreshed.expires_at(), "Credential refreshed");
        self.inner.audit.log(AuditLog::token_refresh(
            user.id.clone(),
            user.role,
            refreshed.expires_at(),
        ));
        Ok(refreshed)
    }

    /// Reacts to a resource endpoint rejecting the credential.
    pub fn handle_unauthorized(&self) -> SessionState {
        debug!("Resource endpoint reported 401; re-checking expiry");
        self.check_expiry()
    }

    /// Records a refused permission check against the current user.
    pub fn record_denied(&self, permission: PermissionKey, resource_zone: Option<&ZoneId>) {
        if let Some(user) = self.current_user() {
            warn!(
                user_id = %user.id,
                role = %user.role,
                permission = %permission,
                resource_zone = resource_zone.map(ZoneId::as_str),
                "Access denied"
            );
            self.inner
                .audit
                .log(AuditLog::access_denied(user.id, user.role, permission, resource_zone));
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Hydrates and starts the reconciliation poll and the expiry monitor.
    ///
    /// Calling it again while running only re-hydrates.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn init(&self) -> SessionState {
        let state = self.hydrate();

        let mut tasks = self.inner.tasks.lock();
        if tasks.is_empty() {
            self.inner.running.store(true, Ordering::SeqCst);
            tasks.push(self.spawn_reconciler());
            tasks.push(self.spawn_expiry_monitor());
            info!(
                reconcile_interval_ms = self.inner.settings.reconcile_interval.as_millis() as u64,
                refresh_window_s = self.inner.settings.refresh_window.as_secs(),
                "Session background tasks started"
            );
        }
        state
    }

    /// Stops the background tasks. The session itself is kept.
    pub fn teardown(&self) {
        let handles: Vec<_> = self.inner.tasks.lock().drain(..).collect();
        if handles.is_empty() {
            return;
        }

        self.inner.running.store(false, Ordering::SeqCst);
        self.inner.shutdown.notify_waiters();
        for handle in handles {
            handle.abort();
        }
        info!("Session background tasks stopped");
    }

    fn spawn_reconciler(&self) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        let shutdown = self.inner.shutdown.clone();
        let period = self.inner.settings.reconcile_interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let Some(manager) = Self::upgrade(&weak) else { break };
                        let state = manager.check_auth();
                        debug!(state = state.name(), "Session reconciled with storage");
                    }
                    _ = shutdown.notified() => break,
                }
            }
            debug!("Session reconciler stopped");
        })
    }

    fn spawn_expiry_monitor(&self) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        let shutdown = self.inner.shutdown.clone();
        let mut changes = self.subscribe();

        tokio::spawn(async move {
            loop {
                let delay = {
                    let Some(manager) = Self::upgrade(&weak) else { break };
                    if manager.take_auto_refresh() {
                        // Failures are logged by `refresh`; the hard expiry still applies.
                        let _ = manager.refresh().await;
                    }
                    let _ = changes.borrow_and_update();
                    manager.next_tick()
                };

                tokio::select! {
                    _ = Self::sleep_for(delay) => {
                        let Some(manager) = Self::upgrade(&weak) else { break };
                        manager.check_expiry();
                    }
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = shutdown.notified() => break,
                }
            }
            debug!("Expiry monitor stopped");
        })
    }

    /// Upgrades a task's handle while the tasks are meant to run.
    fn upgrade(weak: &Weak<Inner>) -> Option<SessionManager> {
        let inner = weak.upgrade()?;
        inner
            .running
            .load(Ordering::SeqCst)
            .then_some(SessionManager { inner })
    }

    async fn sleep_for(delay: Option<Duration>) {
        match delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => std::future::pending::<()>().await,
        }
    }

    /// How long the monitor may sleep before the next expiry evaluation.
    ///
    /// `None` without a session; the next state change wakes the monitor.
    fn next_tick(&self) -> Option<Duration> {
        let state = self.state();
        let session = state.session()?;
        let settings = &self.inner.settings;

        if state.is_expiring() {
            return Some(settings.expiry_check_interval);
        }

        let window = i64::try_from(settings.refresh_window.as_secs()).unwrap_or(i64::MAX);
        let enters_window_ms = session
            .expires_at()
            .saturating_sub(window)
            .saturating_add(1)
            .saturating_mul(1000);
        let until = enters_window_ms.saturating_sub(self.inner.clock.now_millis()).max(0);

        Some(
            Duration::from_millis(until as u64)
                .min(settings.reconcile_interval)
                .max(settings.expiry_check_interval),
        )
    }

    /// Claims the single automatic refresh of the current credential.
    fn take_auto_refresh(&self) -> bool {
        if !self.inner.settings.auto_refresh {
            return false;
        }

        let state = self.state();
        let Some(session) = state.session().filter(|_| state.is_expiring()) else {
            return false;
        };

        let mut attempted = self.inner.auto_refreshed.lock();
        if attempted.as_deref() == Some(session.credential().as_str()) {
            return false;
        }
        *attempted = Some(session.credential().as_str().to_string());
        true
    }

    // =========================================================================
    // Helpers (caller holds the transition lock)
    // =========================================================================

    fn classify(&self, session: Session) -> SessionState {
        let now = self.inner.clock.now_secs();
        if session.credential().is_expired(now) {
            SessionState::unauthenticated(UnauthenticatedCause::Expired)
        } else if session.credential().expires_within(now, self.inner.settings.refresh_window) {
            SessionState::Expiring(session)
        } else {
            SessionState::Authenticated(session)
        }
    }

    fn expire(&self, session: &Session) -> SessionState {
        let user = session.user();
        info!(user_id = %user.id, role = %user.role, "Session expired");

        self.bump_epoch();
        self.inner.store.clear();
        self.inner
            .audit
            .log(AuditLog::session_expired(user.id.clone(), user.role));

        let next = SessionState::unauthenticated(UnauthenticatedCause::Expired);
        self.set_state(next.clone());
        next
    }

    fn set_state(&self, next: SessionState) {
        let mut previous = None;
        self.inner.state.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            previous = Some(std::mem::replace(state, next.clone()));
            true
        });

        if let Some(previous) = previous {
            debug!(from = previous.name(), to = next.name(), "Session state changed");
        }
    }

    fn epoch(&self) -> u64 {
        self.inner.epoch.load(Ordering::SeqCst)
    }

    fn bump_epoch(&self) {
        self.inner.persisted.store(false, Ordering::SeqCst);
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &self.inner.state.borrow().name())
            .field("service", &self.inner.service.name())
            .field("settings", &self.inner.settings)
            .field("running", &self.is_running())
            .finish()
    }
}

// =============================================================================
// SessionManagerBuilder
// =============================================================================

/// Builder for [`SessionManager`].
pub struct SessionManagerBuilder {
    service: SharedAuthService,
    store: CredentialStore,
    settings: SessionSettings,
    clock: SharedClock,
    audit: SharedAuditLogger,
}

impl SessionManagerBuilder {
    /// Creates a builder with the wall clock and tracing audit logger.
    pub fn new(service: SharedAuthService, store: CredentialStore) -> Self {
        Self {
            service,
            store,
            settings: SessionSettings::default(),
            clock: Arc::new(SystemClock),
            audit: Arc::new(TracingAuditLogger::new()),
        }
    }

    /// Sets the timing settings.
    pub fn settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the clock. Use the same clock as the credential store.
    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the audit logger.
    pub fn audit_logger(mut self, audit: SharedAuditLogger) -> Self {
        self.audit = audit;
        self
    }

    /// Builds the manager in the initial `Unauthenticated` state.
    pub fn build(self) -> SessionManager {
        let (state, _) = watch::channel(SessionState::INITIAL);

        SessionManager {
            inner: Arc::new(Inner {
                service: self.service,
                store: self.store,
                audit: self.audit,
                clock: self.clock,
                settings: self.settings,
                state,
                transition: Mutex::new(()),
                epoch: AtomicU64::new(0),
                auto_refreshed: Mutex::new(None),
                persisted: AtomicBool::new(false),
                running: AtomicBool::new(false),
                shutdown: Arc::new(Notify::new()),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::AuthService;
    use crate::store::{
        DisabledStorage, MemoryStorage, SharedStorage, StorageBackend, StorageError, StorageResult,
    };
    use agriguard_core::token::encode;
    use agriguard_core::{
        AuditAction, Claims, Clock, Credential, InMemoryAuditLogger, ManualClock, Role,
    };
    use async_trait::async_trait;

    const NOW: i64 = 1_700_000_000;

    /// Issues a fixed session; optionally waits for a release signal.
    #[derive(Debug, Default)]
    struct StubService {
        lifetime: i64,
        gated: bool,
        started: Notify,
        release: Notify,
        clock: Option<ManualClock>,
    }

    impl StubService {
        fn session(&self, role: Role) -> Session {
            let now = self.clock.as_ref().map(|c| c.now_secs()).unwrap_or(NOW);
            let claims = Claims::builder("42")
                .email("ama@example.com")
                .role(role)
                .issued_at(now)
                .expires_in(self.lifetime)
                .build();
            Session::new(
                Credential::parse(encode(&claims)).unwrap(),
                User::new("42", "Ama", "ama@example.com", role),
            )
            .unwrap()
        }
    }

    #[async_trait]
    impl AuthService for StubService {
        async fn issue(&self, request: &LoginRequest) -> AuthResult<Session> {
            if self.gated {
                self.started.notify_one();
                self.release.notified().await;
            }
            if request.secret() != "correct" {
                return Err(AuthError::InvalidCredentials);
            }
            Ok(self.session(Role::CentralAdmin))
        }

        async fn refresh(&self, session: &Session) -> AuthResult<Session> {
            Ok(self.session(session.role()))
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    struct Fixture {
        manager: SessionManager,
        storage: MemoryStorage,
        clock: ManualClock,
        audit: InMemoryAuditLogger,
    }

    fn fixture_with(service: StubService, storage: MemoryStorage, clock: ManualClock) -> Fixture {
        let audit = InMemoryAuditLogger::new();
        let store = CredentialStore::new(
            Arc::new(storage.clone()),
            "agriguard",
            Duration::from_secs(24 * 3600),
            Arc::new(clock.clone()),
        );
        let manager = SessionManager::builder(Arc::new(service), store)
            .clock(Arc::new(clock.clone()))
            .audit_logger(Arc::new(audit.clone()))
            .build();
        Fixture {
            manager,
            storage,
            clock,
            audit,
        }
    }

    fn fixture(lifetime: i64) -> Fixture {
        let clock = ManualClock::at_secs(NOW);
        let service = StubService {
            lifetime,
            clock: Some(clock.clone()),
            ..StubService::default()
        };
        fixture_with(service, MemoryStorage::new(), clock)
    }

    #[test]
    fn test_hydrate_empty_store() {
        let f = fixture(3600);
        let state = f.manager.hydrate();
        assert_eq!(state.cause(), Some(UnauthenticatedCause::Initial));
        assert!(f.manager.current_user().is_none());
    }

    #[tokio::test]
    async fn test_login_persists_and_audits() {
        let f = fixture(3600);

        let session = f.manager.login("ama@example.com", "correct").await.unwrap();

        assert!(matches!(f.manager.state(), SessionState::Authenticated(_)));
        assert_eq!(f.manager.current_user().as_ref(), Some(session.user()));
        assert!(f.storage.get("agriguard.session").unwrap().is_some());
        assert_eq!(f.audit.actions(), vec![AuditAction::Login]);
    }

    #[tokio::test]
    async fn test_failed_login_keeps_state() {
        let f = fixture(3600);
        f.manager.hydrate();

        let err = f.manager.login("ama@example.com", "wrong").await.unwrap_err();

        assert_eq!(err, AuthError::InvalidCredentials);
        assert_eq!(f.manager.state().cause(), Some(UnauthenticatedCause::Initial));
        assert!(f.storage.is_empty());
        assert_eq!(f.audit.actions(), vec![AuditAction::LoginFailed]);
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let f = fixture(3600);
        f.manager.login("ama@example.com", "correct").await.unwrap();

        f.manager.logout();
        f.manager.logout();

        assert_eq!(f.manager.state().cause(), Some(UnauthenticatedCause::LoggedOut));
        assert!(f.storage.is_empty());
        assert_eq!(f.audit.actions(), vec![AuditAction::Login, AuditAction::Logout]);
    }

    #[tokio::test]
    async fn test_expiry_transitions() {
        let f = fixture(3600);
        f.manager.login("ama@example.com", "correct").await.unwrap();

        f.clock.set_secs(NOW + 3600 - 300);
        assert!(matches!(f.manager.check_expiry(), SessionState::Authenticated(_)));

        f.clock.set_secs(NOW + 3600 - 299);
        assert!(f.manager.check_expiry().is_expiring());

        f.clock.set_secs(NOW + 3600);
        let state = f.manager.check_expiry();
        assert_eq!(state.cause(), Some(UnauthenticatedCause::Expired));
        assert!(f.storage.is_empty());
        assert_eq!(
            f.audit.actions(),
            vec![AuditAction::Login, AuditAction::SessionExpired]
        );
    }

    #[tokio::test]
    async fn test_check_auth_follows_other_handle() {
        let tab_a = fixture(3600);
        let tab_b = fixture_with(
            StubService {
                lifetime: 3600,
                ..StubService::default()
            },
            tab_a.storage.clone(),
            tab_a.clock.clone(),
        );

        tab_a.manager.login("ama@example.com", "correct").await.unwrap();
        assert!(tab_b.manager.hydrate().is_authenticated());

        tab_a.manager.logout();
        let state = tab_b.manager.check_auth();

        assert_eq!(state.cause(), Some(UnauthenticatedCause::Invalidated));
        assert_eq!(tab_b.audit.actions(), vec![AuditAction::ExternalLogout]);
    }

    #[tokio::test]
    async fn test_check_auth_picks_up_login_elsewhere() {
        let tab_a = fixture(3600);
        let tab_b = fixture_with(StubService::default(), tab_a.storage.clone(), tab_a.clock.clone());
        tab_b.manager.hydrate();

        tab_a.manager.login("ama@example.com", "correct").await.unwrap();

        assert!(tab_b.manager.check_auth().is_authenticated());
        assert!(tab_b.audit.is_empty());
    }

    /// Reads succeed and find nothing; writes always fail.
    #[derive(Debug)]
    struct ReadOnlyStorage;

    impl StorageBackend for ReadOnlyStorage {
        fn get(&self, _key: &str) -> StorageResult<Option<String>> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
            Err(StorageError::Unavailable("quota exceeded".to_string()))
        }

        fn remove(&self, _key: &str) -> StorageResult<()> {
            Ok(())
        }

        fn keys(&self) -> StorageResult<Vec<String>> {
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            "read-only"
        }
    }

    fn manager_over(backend: SharedStorage) -> (SessionManager, InMemoryAuditLogger) {
        let clock = ManualClock::at_secs(NOW);
        let audit = InMemoryAuditLogger::new();
        let store = CredentialStore::new(
            backend,
            "agriguard",
            Duration::from_secs(24 * 3600),
            Arc::new(clock.clone()),
        );
        let service = StubService {
            lifetime: 3600,
            clock: Some(clock.clone()),
            ..StubService::default()
        };
        let manager = SessionManager::builder(Arc::new(service), store)
            .clock(Arc::new(clock))
            .audit_logger(Arc::new(audit.clone()))
            .build();
        (manager, audit)
    }

    #[tokio::test]
    async fn test_check_auth_keeps_session_when_storage_is_disabled() {
        let (manager, audit) = manager_over(Arc::new(DisabledStorage));
        manager.hydrate();
        manager.login("ama@example.com", "correct").await.unwrap();

        let state = manager.check_auth();

        assert!(state.is_authenticated());
        assert_eq!(manager.current_user().map(|u| u.id.to_string()).as_deref(), Some("42"));
        assert_eq!(audit.actions(), vec![AuditAction::Login]);
    }

    #[tokio::test]
    async fn test_check_auth_keeps_session_that_was_never_saved() {
        let (manager, audit) = manager_over(Arc::new(ReadOnlyStorage));
        manager.login("ama@example.com", "correct").await.unwrap();

        assert!(manager.check_auth().is_authenticated());
        assert!(!audit.actions().contains(&AuditAction::ExternalLogout));

        manager.logout();
        assert_eq!(manager.check_auth().cause(), Some(UnauthenticatedCause::LoggedOut));
    }

    #[tokio::test]
    async fn test_logout_during_login_discards_result() {
        let clock = ManualClock::at_secs(NOW);
        let service = Arc::new(StubService {
            lifetime: 3600,
            gated: true,
            ..StubService::default()
        });
        let store = CredentialStore::new(
            Arc::new(MemoryStorage::new()),
            "agriguard",
            Duration::from_secs(3600),
            Arc::new(clock.clone()),
        );
        let manager = SessionManager::builder(service.clone(), store)
            .clock(Arc::new(clock))
            .build();

        let pending = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.login("ama@example.com", "correct").await })
        };

        service.started.notified().await;
        manager.logout();
        service.release.notify_one();

        let result = pending.await.unwrap();
        assert_eq!(result.unwrap_err(), AuthError::AuthenticationRequired);
        assert!(manager.current_user().is_none());
        assert!(manager.store().load().is_none());
    }

    #[tokio::test]
    async fn test_refresh_replaces_session() {
        let f = fixture(3600);
        f.manager.login("ama@example.com", "correct").await.unwrap();

        f.clock.set_secs(NOW + 3500);
        assert!(f.manager.check_expiry().is_expiring());

        let refreshed = f.manager.refresh().await.unwrap();
        assert_eq!(refreshed.expires_at(), NOW + 3500 + 3600);
        assert!(matches!(f.manager.state(), SessionState::Authenticated(_)));
        assert_eq!(
            f.manager.store().load().map(|s| s.expires_at()),
            Some(NOW + 3500 + 3600)
        );
    }

    #[tokio::test]
    async fn test_refresh_without_session() {
        let f = fixture(3600);
        assert_eq!(
            f.manager.refresh().await.unwrap_err(),
            AuthError::AuthenticationRequired
        );
    }

    #[tokio::test]
    async fn test_subscribe_sees_transitions() {
        let f = fixture(3600);
        let mut changes = f.manager.subscribe();

        f.manager.login("ama@example.com", "correct").await.unwrap();
        assert!(changes.has_changed().unwrap());
        assert!(changes.borrow_and_update().is_authenticated());

        f.manager.logout();
        assert!(changes.has_changed().unwrap());
        assert_eq!(
            changes.borrow_and_update().cause(),
            Some(UnauthenticatedCause::LoggedOut)
        );
    }

    #[test]
    fn test_record_denied_requires_user() {
        let f = fixture(3600);
        f.manager.record_denied(PermissionKey::ZonesWrite, None);
        assert!(f.audit.is_empty());
    }
}
