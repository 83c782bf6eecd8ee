// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Implementations
//!
//! Mock auth service and resource transport.
//!
//! - Configurable behavior for different test scenarios
//! - Recording of interactions for verification
//! - Thread-safe for concurrent testing

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU16, AtomicU64, Ordering};

use agriguard_client::{AuthService, LoginRequest, Transport, TransportRequest, TransportResponse};
use agriguard_core::{AuthError, AuthResult, Clock, ManualClock, Session, User};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::builders::SessionBuilder;
use super::fixtures::{UserFixtures, PASSWORD};

// =============================================================================
// Mock Auth Service
// =============================================================================

/// Auth service that knows the fixture users and mints unsigned credentials
/// at the time of a shared [`ManualClock`].
#[derive(Debug)]
pub struct MockAuthService {
    clock: ManualClock,
    users: Vec<User>,
    lifetime: AtomicI64,

    /// Hold `issue` until [`MockAuthService::release`] is called.
    gated: AtomicBool,
    started: Notify,
    release: Notify,

    fail_network: AtomicBool,
    reject_refresh: AtomicBool,

    issue_count: AtomicU64,
    refresh_count: AtomicU64,
}

impl MockAuthService {
    /// Creates a service issuing one-hour credentials.
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            users: UserFixtures::all(),
            lifetime: AtomicI64::new(3600),
            gated: AtomicBool::new(false),
            started: Notify::new(),
            release: Notify::new(),
            fail_network: AtomicBool::new(false),
            reject_refresh: AtomicBool::new(false),
            issue_count: AtomicU64::new(0),
            refresh_count: AtomicU64::new(0),
        }
    }

    /// Sets the lifetime of issued credentials.
    pub fn set_lifetime(&self, seconds: i64) {
        self.lifetime.store(seconds, Ordering::SeqCst);
    }

    /// Makes `issue` wait for [`MockAuthService::release`].
    pub fn set_gated(&self, gated: bool) {
        self.gated.store(gated, Ordering::SeqCst);
    }

    /// Waits until a gated `issue` call has started.
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    /// Lets a gated `issue` call finish.
    pub fn release(&self) {
        self.release.notify_one();
    }

    /// Makes every call fail as if the service were unreachable.
    pub fn set_fail_network(&self, fail: bool) {
        self.fail_network.store(fail, Ordering::SeqCst);
    }

    /// Makes `refresh` reject the credential.
    pub fn set_reject_refresh(&self, reject: bool) {
        self.reject_refresh.store(reject, Ordering::SeqCst);
    }

    /// Number of `issue` calls.
    pub fn issue_count(&self) -> u64 {
        self.issue_count.load(Ordering::SeqCst)
    }

    /// Number of `refresh` calls.
    pub fn refresh_count(&self) -> u64 {
        self.refresh_count.load(Ordering::SeqCst)
    }

    fn mint(&self, user: User) -> Session {
        SessionBuilder::for_user(user)
            .issued_at(self.clock.now_secs())
            .lifetime(self.lifetime.load(Ordering::SeqCst))
            .build()
    }

    fn find(&self, request: &LoginRequest) -> Option<User> {
        let identifier = request.identifier.as_str();
        self.users
            .iter()
            .find(|user| {
                user.email.eq_ignore_ascii_case(identifier)
                    || (user.id.as_str() == "2" && identifier == UserFixtures::ZONE_PHONE)
            })
            .cloned()
    }
}

#[async_trait]
impl AuthService for MockAuthService {
    async fn issue(&self, request: &LoginRequest) -> AuthResult<Session> {
        self.issue_count.fetch_add(1, Ordering::SeqCst);

        if self.gated.load(Ordering::SeqCst) {
            self.started.notify_one();
            self.release.notified().await;
        }
        if self.fail_network.load(Ordering::SeqCst) {
            return Err(AuthError::network("connection refused"));
        }

        match self.find(request) {
            Some(user) if request.secret() == PASSWORD => Ok(self.mint(user)),
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    async fn refresh(&self, session: &Session) -> AuthResult<Session> {
        self.refresh_count.fetch_add(1, Ordering::SeqCst);

        if self.fail_network.load(Ordering::SeqCst) {
            return Err(AuthError::network("connection refused"));
        }
        if self.reject_refresh.load(Ordering::SeqCst) {
            return Err(AuthError::AuthenticationRequired);
        }
        Ok(self.mint(session.user().clone()))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// =============================================================================
// Mock Transport
// =============================================================================

/// Transport that records requests and answers with a configurable status.
#[derive(Debug)]
pub struct MockTransport {
    status: AtomicU16,
    body: Mutex<serde_json::Value>,
    fail_network: AtomicBool,
    requests: Mutex<Vec<TransportRequest>>,
}

impl MockTransport {
    /// Creates a transport answering `200 []`.
    pub fn new() -> Self {
        Self {
            status: AtomicU16::new(200),
            body: Mutex::new(serde_json::json!([])),
            fail_network: AtomicBool::new(false),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Sets the response.
    pub fn respond_with(&self, status: u16, body: serde_json::Value) {
        self.status.store(status, Ordering::SeqCst);
        *self.body.lock() = body;
    }

    /// Makes every send fail at the transport level.
    pub fn set_fail_network(&self, fail: bool) {
        self.fail_network.store(fail, Ordering::SeqCst);
    }

    /// Requests sent so far.
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests sent so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: TransportRequest) -> AuthResult<TransportResponse> {
        self.requests.lock().push(request);

        if self.fail_network.load(Ordering::SeqCst) {
            return Err(AuthError::network("connection reset"));
        }
        Ok(TransportResponse::new(
            self.status.load(Ordering::SeqCst),
            self.body.lock().clone(),
        ))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
