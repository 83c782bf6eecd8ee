// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Integration tests for the session manager and credential store.
//!
//! Covers persistence through shared storage, the background expiry monitor
//! and reconciler, automatic refresh, and logout racing a login.

use std::sync::Arc;
use std::time::Duration;

use agriguard_client::{AuthClient, SessionState, StorageBackend, UnauthenticatedCause};
use agriguard_core::{AuditAction, AuthError, ManualClock, Role};
use agriguard_tests::prelude::*;

// =============================================================================
// Login, Logout, Hydration
// =============================================================================

#[tokio::test]
async fn test_login_is_visible_to_a_new_client() {
    let harness = TestHarness::new();
    let first = harness.client();

    assert!(first.login(UserFixtures::CENTRAL_EMAIL, PASSWORD).await);
    let second = harness.client();

    assert_eq!(second.current_user(), Some(UserFixtures::central_admin()));
    assert!(matches!(second.state(), SessionState::Authenticated(_)));
}

#[tokio::test]
async fn test_login_with_phone_number() {
    let harness = TestHarness::new();
    let client = harness.client();

    let session = client.try_login(UserFixtures::ZONE_PHONE, PASSWORD).await.unwrap();

    assert_eq!(session.role(), Role::ZoneAdmin);
    assert_eq!(session.zone_id().map(|z| z.as_str()), Some(HOME_ZONE));
}

#[tokio::test]
async fn test_failed_logins_are_reported_and_audited() {
    let harness = TestHarness::new();
    let client = harness.client();

    let err = client.try_login(UserFixtures::INVESTOR_EMAIL, "wrong").await.unwrap_err();
    assert_eq!(err, AuthError::InvalidCredentials);

    harness.service.set_fail_network(true);
    let err = client.try_login(UserFixtures::INVESTOR_EMAIL, PASSWORD).await.unwrap_err();
    assert!(err.is_network());

    assert!(client.current_user().is_none());
    assert!(harness.storage.is_empty());
    assert_audit_actions(&harness.audit, &[AuditAction::LoginFailed, AuditAction::LoginFailed]);
}

#[tokio::test]
async fn test_logout_is_idempotent_and_clears_session_data() {
    let harness = TestHarness::new();
    let client = harness.client();
    assert!(client.login(UserFixtures::ZONE_EMAIL, PASSWORD).await);

    let store = harness.store();
    store.set_session_data("farmer-filter", "zone:4");
    assert_eq!(store.session_data("farmer-filter").as_deref(), Some("zone:4"));

    client.logout();
    client.logout();

    assert_unauthenticated(&client.state(), UnauthenticatedCause::LoggedOut);
    assert!(store.session_data("farmer-filter").is_none());
    assert!(harness.storage.is_empty());
    assert_audit_actions(&harness.audit, &[AuditAction::Login, AuditAction::Logout]);
}

#[test]
fn test_stored_session_older_than_retention_is_absent() {
    let harness = TestHarness::new();
    let store = harness.store();
    let session = SessionBuilder::for_user(UserFixtures::central_admin())
        .lifetime(48 * HOUR)
        .build();
    store.save(&session);

    harness.at(23 * HOUR);
    assert_eq!(store.load(), Some(session));

    harness.at(25 * HOUR);
    assert_eq!(store.load(), None);
    assert_eq!(harness.storage.get(&store.session_key()).unwrap(), None);
}

#[test]
fn test_expired_record_hydrates_as_initial() {
    let harness = TestHarness::new();
    harness.store().save(&SessionFixtures::investor());
    harness.at(HOUR);

    let client = harness.client();

    assert_unauthenticated(&client.state(), UnauthenticatedCause::Initial);
    assert!(harness.storage.is_empty());
}

// =============================================================================
// Reconciliation Between Handles
// =============================================================================

#[tokio::test]
async fn test_check_auth_follows_the_other_handle() {
    let harness = TestHarness::new();
    let tab_a = harness.manager();
    let tab_b = harness.manager();
    tab_a.hydrate();
    tab_b.hydrate();

    tab_a.login(UserFixtures::CENTRAL_EMAIL, PASSWORD).await.unwrap();
    let state = tab_b.check_auth();
    assert_eq!(state.user(), Some(&UserFixtures::central_admin()));

    tab_a.logout();
    let state = tab_b.check_auth();
    assert_unauthenticated(&state, UnauthenticatedCause::Invalidated);
    assert_audit_actions(
        &harness.audit,
        &[AuditAction::Login, AuditAction::Logout, AuditAction::ExternalLogout],
    );
}

#[tokio::test]
async fn test_reconciler_picks_up_changes_in_background() {
    let harness = TestHarness::new();
    let tab_a = harness.client();
    let tab_b = harness.client();
    tab_a.init();
    tab_b.init();

    assert!(tab_a.login(UserFixtures::INVESTOR_EMAIL, PASSWORD).await);
    let state = wait_for_state(tab_b.session(), SessionState::is_authenticated).await;
    assert_eq!(state.user().map(|u| u.role), Some(Role::Investor));

    tab_a.logout();
    wait_for_state(tab_b.session(), |s| s.cause() == Some(UnauthenticatedCause::Invalidated)).await;

    tab_a.teardown();
    tab_b.teardown();
    assert!(!tab_b.session().is_running());
}

// =============================================================================
// Expiry Monitor
// =============================================================================

fn without_auto_refresh() -> TestHarness {
    let mut config = ConfigFixtures::fast();
    config.session.auto_refresh = false;
    TestHarness::with_config(config)
}

#[tokio::test]
async fn test_monitor_moves_through_expiring_to_expired() {
    let harness = without_auto_refresh();
    let client = harness.client();
    assert!(client.login(UserFixtures::CENTRAL_EMAIL, PASSWORD).await);
    client.init();

    harness.at(HOUR - 299);
    wait_for_state(client.session(), SessionState::is_expiring).await;

    harness.at(HOUR);
    let state = wait_for_state(client.session(), |s| !s.is_authenticated()).await;

    assert_unauthenticated(&state, UnauthenticatedCause::Expired);
    assert!(harness.storage.is_empty());
    assert_audit_actions(&harness.audit, &[AuditAction::Login, AuditAction::SessionExpired]);
    assert_eq!(harness.service.refresh_count(), 0);
    client.teardown();
}

#[tokio::test]
async fn test_monitor_refreshes_once_inside_window() {
    let harness = TestHarness::new();
    let client = harness.client();
    assert!(client.login(UserFixtures::ZONE_EMAIL, PASSWORD).await);
    client.init();

    harness.at(HOUR - 100);
    let renewed_until = NOW + 2 * HOUR - 100;
    let state = wait_for_state(client.session(), |s| {
        s.session().is_some_and(|session| session.expires_at() == renewed_until)
    })
    .await;

    assert!(!state.is_expiring());
    assert_eq!(harness.service.refresh_count(), 1);
    assert_eq!(harness.store().load().map(|s| s.expires_at()), Some(renewed_until));
    assert!(harness.audit.actions().contains(&AuditAction::TokenRefresh));
    client.teardown();
}

#[tokio::test]
async fn test_rejected_refresh_is_not_retried_and_session_expires() {
    let harness = TestHarness::new();
    harness.service.set_reject_refresh(true);
    let client = harness.client();
    assert!(client.login(UserFixtures::ZONE_EMAIL, PASSWORD).await);
    client.init();

    harness.at(HOUR - 100);
    wait_for_state(client.session(), SessionState::is_expiring).await;
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(harness.service.refresh_count(), 1);
    assert!(client.state().is_expiring());

    harness.at(HOUR);
    let state = wait_for_state(client.session(), |s| !s.is_authenticated()).await;
    assert_unauthenticated(&state, UnauthenticatedCause::Expired);
    client.teardown();
}

#[tokio::test]
async fn test_teardown_stops_the_monitor() {
    let harness = without_auto_refresh();
    let client = harness.client();
    assert!(client.login(UserFixtures::CENTRAL_EMAIL, PASSWORD).await);
    client.init();
    client.teardown();

    harness.at(HOUR);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(client.state().is_authenticated());
    assert_unauthenticated(&client.session().check_expiry(), UnauthenticatedCause::Expired);
}

// =============================================================================
// Races
// =============================================================================

#[tokio::test]
async fn test_logout_during_login_discards_the_result() {
    let harness = TestHarness::new();
    harness.service.set_gated(true);
    let manager = harness.manager();
    manager.hydrate();

    let pending = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.login(UserFixtures::CENTRAL_EMAIL, PASSWORD).await })
    };
    harness.service.wait_started().await;

    manager.logout();
    harness.service.release();
    let result = pending.await.unwrap();

    assert_eq!(result.unwrap_err(), AuthError::AuthenticationRequired);
    assert_unauthenticated(&manager.state(), UnauthenticatedCause::LoggedOut);
    assert!(harness.storage.is_empty());
    assert!(!harness.audit.actions().contains(&AuditAction::Login));
}

// =============================================================================
// Directory Mode With File Storage
// =============================================================================

#[tokio::test]
async fn test_directory_login_survives_restart_on_file_storage() {
    init_test_logging();
    let dir = temp_test_dir("agriguard-session");
    let config = ConfigFixtures::with_file_storage(ConfigFixtures::directory(), dir.path());
    let clock = ManualClock::at_secs(NOW);

    let first = AuthClient::builder(config.clone())
        .clock(Arc::new(clock.clone()))
        .build()
        .unwrap();
    assert!(first.login(UserFixtures::ZONE_EMAIL, PASSWORD).await);
    assert!(!first.login(UserFixtures::ZONE_EMAIL, "nope").await);
    assert_eq!(first.current_user().map(|u| u.role), Some(Role::ZoneAdmin));

    let restarted = AuthClient::builder(config)
        .clock(Arc::new(clock))
        .build()
        .unwrap();
    let user = restarted.current_user().unwrap();
    assert_eq!(user.email, UserFixtures::ZONE_EMAIL);
    assert_eq!(user.zone_id.map(|z| z.to_string()).as_deref(), Some(HOME_ZONE));
}
