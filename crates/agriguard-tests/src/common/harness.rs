// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Harness
//!
//! Wires the mocks, a manual clock, shared memory storage and an in-memory
//! audit trail into clients. Every client built from one harness shares the
//! same storage, which is how separate tabs of the dashboard see each other.

use std::sync::Arc;

use agriguard_client::{AuthClient, CredentialStore, MemoryStorage, SessionManager, SessionSettings};
use agriguard_config::AgriguardConfig;
use agriguard_core::{InMemoryAuditLogger, ManualClock};

use super::fixtures::{ConfigFixtures, NOW};
use super::mocks::{MockAuthService, MockTransport};

/// Shared collaborators for one test.
#[derive(Debug, Clone)]
pub struct TestHarness {
    /// Clock shared by everything built from this harness.
    pub clock: ManualClock,
    /// Storage shared by every client.
    pub storage: MemoryStorage,
    /// Audit trail shared by every client.
    pub audit: InMemoryAuditLogger,
    /// Auth service.
    pub service: Arc<MockAuthService>,
    /// Resource transport.
    pub transport: Arc<MockTransport>,
    /// Config used for clients.
    pub config: AgriguardConfig,
}

impl TestHarness {
    /// Creates a harness at [`NOW`] with fast session timers.
    pub fn new() -> Self {
        Self::with_config(ConfigFixtures::fast())
    }

    /// Creates a harness with a specific config.
    pub fn with_config(config: AgriguardConfig) -> Self {
        super::init_test_logging();
        let clock = ManualClock::at_secs(NOW);
        Self {
            service: Arc::new(MockAuthService::new(clock.clone())),
            clock,
            storage: MemoryStorage::new(),
            audit: InMemoryAuditLogger::new(),
            transport: Arc::new(MockTransport::new()),
            config,
        }
    }

    /// Builds (and hydrates) a client over the shared collaborators.
    pub fn client(&self) -> AuthClient {
        AuthClient::builder(self.config.clone())
            .clock(Arc::new(self.clock.clone()))
            .storage(Arc::new(self.storage.clone()))
            .audit_logger(Arc::new(self.audit.clone()))
            .auth_service(self.service.clone())
            .transport(self.transport.clone())
            .build()
            .expect("client builds from mocks")
    }

    /// Builds a bare session manager over the shared collaborators.
    pub fn manager(&self) -> SessionManager {
        SessionManager::builder(self.service.clone(), self.store())
            .settings(SessionSettings::from(&self.config.session))
            .clock(Arc::new(self.clock.clone()))
            .audit_logger(Arc::new(self.audit.clone()))
            .build()
    }

    /// A credential store over the shared storage.
    pub fn store(&self) -> CredentialStore {
        CredentialStore::from_config(
            Arc::new(self.storage.clone()),
            &self.config.storage,
            Arc::new(self.clock.clone()),
        )
    }

    /// Moves the clock to `NOW + offset` seconds.
    pub fn at(&self, offset: i64) {
        self.clock.set_secs(NOW + offset);
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
