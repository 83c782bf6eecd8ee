// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! One user per role, sessions for them, and configurations that log them in.

use std::time::Duration;

use agriguard_config::{AgriguardConfig, AuthMode, DirectoryUser, StorageKind};
use agriguard_core::{Role, Session, User};

use super::builders::SessionBuilder;

/// Fixed "now" used by every manual clock (2023-11-14T22:13:20Z).
pub const NOW: i64 = 1_700_000_000;

/// One hour, in seconds.
pub const HOUR: i64 = 3600;

/// Password accepted for every fixture user.
pub const PASSWORD: &str = "correct-horse-battery";

/// Zone administered by the zone administrator fixture.
pub const HOME_ZONE: &str = "4";

/// A zone nobody in the fixtures administers.
pub const OTHER_ZONE: &str = "9";

// =============================================================================
// User Fixtures
// =============================================================================

/// Fixture providing one user per role.
pub struct UserFixtures;

impl UserFixtures {
    /// Email of the central administrator.
    pub const CENTRAL_EMAIL: &'static str = "kofi@example.com";
    /// Email of the zone administrator.
    pub const ZONE_EMAIL: &'static str = "abena@example.com";
    /// Phone number of the zone administrator.
    pub const ZONE_PHONE: &'static str = "+233200000002";
    /// Email of the investor.
    pub const INVESTOR_EMAIL: &'static str = "kwame@example.com";

    /// The central administrator.
    pub fn central_admin() -> User {
        User::new("1", "Kofi Mensah", Self::CENTRAL_EMAIL, Role::CentralAdmin)
    }

    /// The zone administrator of [`HOME_ZONE`].
    pub fn zone_admin() -> User {
        User::new("2", "Abena Owusu", Self::ZONE_EMAIL, Role::ZoneAdmin).with_zone(HOME_ZONE)
    }

    /// The investor.
    pub fn investor() -> User {
        User::new("3", "Kwame Asante", Self::INVESTOR_EMAIL, Role::Investor)
    }

    /// All fixture users.
    pub fn all() -> Vec<User> {
        vec![Self::central_admin(), Self::zone_admin(), Self::investor()]
    }
}

// =============================================================================
// Session Fixtures
// =============================================================================

/// Fixture providing sessions issued at [`NOW`] for one hour.
pub struct SessionFixtures;

impl SessionFixtures {
    /// A session for the given user.
    pub fn for_user(user: User) -> Session {
        SessionBuilder::for_user(user).build()
    }

    /// A central administrator session.
    pub fn central_admin() -> Session {
        Self::for_user(UserFixtures::central_admin())
    }

    /// A zone administrator session.
    pub fn zone_admin() -> Session {
        Self::for_user(UserFixtures::zone_admin())
    }

    /// An investor session.
    pub fn investor() -> Session {
        Self::for_user(UserFixtures::investor())
    }
}

// =============================================================================
// Config Fixtures
// =============================================================================

/// Fixture providing client configurations.
pub struct ConfigFixtures;

impl ConfigFixtures {
    /// Defaults with fast session timers, suitable for background task tests.
    pub fn fast() -> AgriguardConfig {
        let mut config = AgriguardConfig::default();
        config.session.expiry_check_interval = Duration::from_millis(10);
        config.session.reconcile_interval = Duration::from_millis(50);
        config
    }

    /// An in-process directory with the fixture users and [`PASSWORD`].
    pub fn directory() -> AgriguardConfig {
        let mut config = Self::fast();
        config.api.mode = AuthMode::Directory;
        config.api.directory.secret = "integration-test-signing-secret".to_string();
        config.api.directory.users = UserFixtures::all()
            .into_iter()
            .map(|user| DirectoryUser {
                id: user.id.to_string(),
                name: user.name,
                email: Some(user.email),
                phone_number: (user.role == Role::ZoneAdmin)
                    .then(|| UserFixtures::ZONE_PHONE.to_string()),
                role: user.role,
                zone_id: user.zone_id.map(|zone| zone.to_string()),
                password_hash: None,
                password: Some(PASSWORD.to_string()),
            })
            .collect();
        config
    }

    /// File-backed storage under `dir`.
    pub fn with_file_storage(mut config: AgriguardConfig, dir: &std::path::Path) -> AgriguardConfig {
        config.storage.backend = StorageKind::File;
        config.storage.path = dir.to_path_buf();
        config
    }

    /// A complete YAML configuration.
    pub fn yaml() -> &'static str {
        r#"
session:
  refresh_window: 5m
  expiry_check_interval: 1s
  reconcile_interval: 2s
  auto_refresh: false

storage:
  backend: file
  path: /var/lib/agriguard
  namespace: dashboard
  retention: 12h

api:
  mode: directory
  directory:
    secret: "a-long-enough-signing-secret"
    token_lifetime: 30m
    users:
      - id: "1"
        name: Kofi Mensah
        email: kofi@example.com
        role: centralAdmin
        password: correct-horse-battery
      - id: "2"
        name: Abena Owusu
        phone_number: "+233200000002"
        role: zoneAdmin
        zone_id: "4"
        password: correct-horse-battery

routes:
  login_path: /signin
  unauthorized_path: /forbidden

logging:
  level: debug
  format: json
"#
    }
}
