// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Integration tests for the token codec and the permission engine.

use agriguard_core::token::{decode, encode};
use agriguard_core::{
    AuthError, Credential, PermissionEngine, PermissionKey, PermissionMatrix, Role, RouteTable,
    Session, ZoneId,
};
use agriguard_tests::prelude::*;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use proptest::prelude::*;

// =============================================================================
// Token Codec
// =============================================================================

#[test]
fn test_two_segment_token_is_malformed_before_claims() {
    // A valid payload in the second segment must not rescue the token.
    let payload = SessionBuilder::new(Role::CentralAdmin).token();
    let two_segments: String = payload.rsplitn(2, '.').nth(1).unwrap().to_string();

    let err = decode(&two_segments).unwrap_err();
    assert!(matches!(err, AuthError::MalformedToken { .. }), "{:?}", err);
}

#[test]
fn test_non_base64_segment_is_malformed() {
    let err = decode("eyJhbGciOiJub25lIn0.@@@.").unwrap_err();
    assert!(matches!(err, AuthError::MalformedToken { .. }));
}

#[test]
fn test_payload_missing_role_is_invalid() {
    let token = format!(
        "e30.{}.",
        base64_url(r#"{"subjectId":"1","issuedAt":1,"expiresAt":2}"#)
    );
    let err = decode(&token).unwrap_err();
    assert!(matches!(err, AuthError::InvalidPayload { .. }), "{:?}", err);
}

#[test]
fn test_decode_accepts_backend_claim_names() {
    let token = format!(
        "e30.{}.sig",
        base64_url(r#"{"sub":7,"role":"zone_admin","zone_id":4,"iat":10,"exp":20}"#)
    );
    let claims = decode(&token).unwrap();
    assert_eq!(claims.subject_id.as_str(), "7");
    assert_eq!(claims.role, Role::ZoneAdmin);
    assert_eq!(claims.zone_id, Some(ZoneId::new("4")));
    assert_eq!(claims.expires_at, 20);
}

#[test]
fn test_session_rejects_role_mismatch() {
    let builder = SessionBuilder::for_user(UserFixtures::investor()).claiming(Role::CentralAdmin);
    let credential = Credential::parse(builder.token()).unwrap();

    let err = Session::new(credential, UserFixtures::investor()).unwrap_err();
    assert_eq!(
        err,
        AuthError::RoleMismatch {
            claimed: Role::CentralAdmin,
            recorded: Role::Investor,
        }
    );
}

#[test]
fn test_session_rejects_another_users_record() {
    let token = SessionBuilder::for_user(UserFixtures::zone_admin()).token();

    let stranger = Session::new(Credential::parse(token.clone()).unwrap(), UserFixtures::investor());
    assert!(stranger.is_err());

    let mut moved = UserFixtures::zone_admin();
    moved.zone_id = Some(ZoneId::new("99"));
    let err = Session::new(Credential::parse(token).unwrap(), moved).unwrap_err();
    assert_eq!(err.error_code(), "IDENTITY_MISMATCH");
}

fn base64_url(json: &str) -> String {
    URL_SAFE_NO_PAD.encode(json)
}

// =============================================================================
// Permission Engine
// =============================================================================

#[test]
fn test_zone_admin_cannot_open_central_routes() {
    let engine = PermissionEngine::dashboard();

    assert!(!engine.has_route_access(Role::ZoneAdmin, "/zones"));
    assert!(!engine.has_route_access(Role::ZoneAdmin, "/users/3"));
    assert!(engine.has_route_access(Role::ZoneAdmin, "/farmers/12"));
    assert!(engine.has_route_access(Role::ZoneAdmin, "/zone-data"));
    assert!(!engine.has_route_access(Role::ZoneAdmin, "/farmers/../zones"));
}

#[test]
fn test_investor_override_survives_misconfigured_matrix() {
    let matrix = PermissionMatrix::builder()
        .grant(Role::Investor, [PermissionKey::RecommendationsRead, PermissionKey::RecommendationsWrite])
        .build();
    let engine = PermissionEngine::new(matrix, RouteTable::dashboard());

    assert!(engine.matrix().grants(Role::Investor, PermissionKey::RecommendationsWrite));
    assert!(!engine.has_permission(Role::Investor, PermissionKey::RecommendationsWrite));
    assert!(engine.has_permission(Role::Investor, PermissionKey::RecommendationsRead));
    assert!(!engine
        .permissions_for(Role::Investor)
        .contains(PermissionKey::RecommendationsWrite));
}

#[test]
fn test_zone_scoping() {
    let engine = PermissionEngine::dashboard();
    let home = ZoneId::new(HOME_ZONE);
    let other = ZoneId::new(OTHER_ZONE);
    let key = PermissionKey::FarmersWrite;

    assert!(engine.can_access_resource(Role::ZoneAdmin, Some(&home), key, Some(&home)));
    assert!(!engine.can_access_resource(Role::ZoneAdmin, Some(&home), key, Some(&other)));
    assert!(!engine.can_access_resource(Role::ZoneAdmin, None, key, Some(&home)));
    assert!(engine.can_access_resource(Role::ZoneAdmin, Some(&home), key, None));
    assert!(engine.can_access_resource(Role::CentralAdmin, None, key, Some(&other)));
    assert!(!engine.can_access_resource(Role::Investor, None, PermissionKey::FarmersRead, None));
}

// =============================================================================
// Properties
// =============================================================================

fn role_strategy() -> impl Strategy<Value = Role> {
    prop::sample::select(Role::ALL.to_vec())
}

proptest! {
    #[test]
    fn prop_encoded_sessions_decode_to_their_claims(
        role in role_strategy(),
        id in "[0-9]{1,6}",
        issued_at in 0i64..4_000_000_000,
        lifetime in 1i64..100_000,
    ) {
        let builder = SessionBuilder::new(role).id(&id).issued_at(issued_at).lifetime(lifetime);
        let claims = decode(&encode(&builder.claims())).unwrap();
        prop_assert_eq!(claims, builder.claims());
    }

    #[test]
    fn prop_investor_never_holds_write_class_keys(
        key in prop::sample::select(PermissionKey::all().to_vec()),
    ) {
        let matrix = PermissionMatrix::builder()
            .grant(Role::Investor, PermissionKey::all().iter().copied())
            .build();
        let engine = PermissionEngine::new(matrix, RouteTable::dashboard());
        prop_assert_eq!(engine.has_permission(Role::Investor, key), !key.is_write_class());
    }
}
