// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Role-Based Access Control (RBAC).
//!
//! [`PermissionMatrix`] is the static role-to-permission table and
//! [`PermissionEngine`] layers the route table and zone ownership scoping on
//! top of it. Both are pure: no I/O, no clocks, no interior mutability.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::permission::{PermissionKey, PermissionSet};
use crate::routes::RouteTable;
use crate::types::{Role, ZoneId};

// =============================================================================
// Permission Matrix
// =============================================================================

/// Role to permission-key table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionMatrix {
    grants: HashMap<Role, PermissionSet>,
}

impl PermissionMatrix {
    /// Creates the dashboard's canonical matrix.
    ///
    /// | Permission                     | centralAdmin | zoneAdmin | investor |
    /// |--------------------------------|:---:|:---:|:---:|
    /// | zones:read/write/delete        | ✓ |   |   |
    /// | iot:read/write/delete          | ✓ |   |   |
    /// | farmers:read/write/delete      | ✓ | ✓ |   |
    /// | recommendations:read           | ✓ | ✓ | ✓ |
    /// | recommendations:write/approve  | ✓ | ✓ |   |
    /// | zone_data:read/write           | ✓ | ✓ |   |
    /// | users:read/write/delete        | ✓ |   |   |
    pub fn dashboard() -> Self {
        use PermissionKey::*;

        Self::builder()
            .grant(Role::CentralAdmin, PermissionKey::all().iter().copied())
            .grant(
                Role::ZoneAdmin,
                [
                    FarmersRead,
                    FarmersWrite,
                    FarmersDelete,
                    RecommendationsRead,
                    RecommendationsWrite,
                    RecommendationsApprove,
                    ZoneDataRead,
                    ZoneDataWrite,
                ],
            )
            .grant(Role::Investor, [RecommendationsRead])
            .build()
    }

    /// Creates a matrix builder with no grants.
    pub fn builder() -> PermissionMatrixBuilder {
        PermissionMatrixBuilder::default()
    }

    /// Returns the raw grants for a role, before any override.
    pub fn granted(&self, role: Role) -> Option<&PermissionSet> {
        self.grants.get(&role)
    }

    /// Returns `true` if the table row for `role` contains `key`.
    pub fn grants(&self, role: Role, key: PermissionKey) -> bool {
        self.grants
            .get(&role)
            .map(|set| set.contains(key))
            .unwrap_or(false)
    }
}

impl Default for PermissionMatrix {
    fn default() -> Self {
        Self::dashboard()
    }
}

/// Builder for constructing permission matrices.
#[derive(Debug, Default)]
pub struct PermissionMatrixBuilder {
    grants: HashMap<Role, PermissionSet>,
}

impl PermissionMatrixBuilder {
    /// Starts from the canonical dashboard matrix.
    pub fn from_dashboard() -> Self {
        Self {
            grants: PermissionMatrix::dashboard().grants,
        }
    }

    /// Adds permissions to a role.
    pub fn grant(mut self, role: Role, permissions: impl IntoIterator<Item = PermissionKey>) -> Self {
        let entry = self.grants.entry(role).or_default();
        for permission in permissions {
            entry.add(permission);
        }
        self
    }

    /// Removes permissions from a role.
    pub fn revoke(mut self, role: Role, permissions: impl IntoIterator<Item = PermissionKey>) -> Self {
        if let Some(entry) = self.grants.get_mut(&role) {
            for permission in permissions {
                entry.remove(permission);
            }
        }
        self
    }

    /// Builds the matrix.
    pub fn build(self) -> PermissionMatrix {
        PermissionMatrix {
            grants: self.grants,
        }
    }
}

// =============================================================================
// Permission Engine
// =============================================================================

/// Pure mapping from role to capability set.
///
/// Created once and shared; cloning is cheap.
#[derive(Debug, Clone)]
pub struct PermissionEngine {
    matrix: Arc<PermissionMatrix>,
    routes: Arc<RouteTable>,
}

impl PermissionEngine {
    /// Creates an engine from a matrix and a route table.
    pub fn new(matrix: PermissionMatrix, routes: RouteTable) -> Self {
        Self {
            matrix: Arc::new(matrix),
            routes: Arc::new(routes),
        }
    }

    /// Creates the engine with the dashboard matrix and route table.
    pub fn dashboard() -> Self {
        Self::new(PermissionMatrix::dashboard(), RouteTable::dashboard())
    }

    /// Returns the route table.
    pub fn route_table(&self) -> &RouteTable {
        &self.routes
    }

    /// Returns the permission matrix.
    pub fn matrix(&self) -> &PermissionMatrix {
        &self.matrix
    }

    /// Returns the path prefixes a role may view.
    pub fn routes_for(&self, role: Role) -> BTreeSet<String> {
        self.routes.routes_for(role)
    }

    /// Returns `true` if `path` equals or descends from a prefix allowed for `role`.
    pub fn has_route_access(&self, role: Role, path: &str) -> bool {
        self.routes.has_route_access(role, path)
    }

    /// Returns `true` if `role` holds `key`.
    ///
    /// Investors never hold a write-class key, whatever the matrix says.
    pub fn has_permission(&self, role: Role, key: PermissionKey) -> bool {
        if role == Role::Investor && key.is_write_class() {
            return false;
        }
        self.matrix.grants(role, key)
    }

    /// Returns the effective permissions of a role.
    pub fn permissions_for(&self, role: Role) -> PermissionSet {
        PermissionKey::all()
            .iter()
            .copied()
            .filter(|key| self.has_permission(role, *key))
            .collect()
    }

    /// Checks a permission together with zone ownership.
    ///
    /// Zone administrators may only touch resources of their own zone; a zone
    /// administrator without a zone is denied any zoned resource. Central
    /// administrators bypass zone scoping.
    pub fn can_access_resource(
        &self,
        role: Role,
        user_zone: Option<&ZoneId>,
        key: PermissionKey,
        resource_zone: Option<&ZoneId>,
    ) -> bool {
        if !self.has_permission(role, key) {
            return false;
        }

        match (role, resource_zone) {
            (Role::ZoneAdmin, Some(resource_zone)) => user_zone == Some(resource_zone),
            _ => true,
        }
    }
}

impl Default for PermissionEngine {
    fn default() -> Self {
        Self::dashboard()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use PermissionKey::*;

    /// The matrix written out row by row, independent of the builder.
    fn expected(role: Role, key: PermissionKey) -> bool {
        let (central, zone, investor) = match key {
            ZonesRead | ZonesWrite | ZonesDelete => (true, false, false),
            IotRead | IotWrite | IotDelete => (true, false, false),
            FarmersRead | FarmersWrite | FarmersDelete => (true, true, false),
            RecommendationsRead => (true, true, true),
            RecommendationsWrite | RecommendationsApprove => (true, true, false),
            ZoneDataRead | ZoneDataWrite => (true, true, false),
            UsersRead | UsersWrite | UsersDelete => (true, false, false),
        };
        match role {
            Role::CentralAdmin => central,
            Role::ZoneAdmin => zone,
            Role::Investor => investor,
        }
    }

    #[test]
    fn test_has_permission_matches_table_exhaustively() {
        let engine = PermissionEngine::dashboard();
        for role in Role::ALL {
            for key in PermissionKey::all() {
                assert_eq!(
                    engine.has_permission(role, *key),
                    expected(role, *key),
                    "{} / {}",
                    role,
                    key
                );
            }
        }
    }

    #[test]
    fn test_investor_write_override() {
        let matrix = PermissionMatrixBuilder::from_dashboard()
            .grant(Role::Investor, [RecommendationsWrite, RecommendationsApprove, FarmersRead])
            .build();
        let engine = PermissionEngine::new(matrix, RouteTable::dashboard());

        assert!(engine.matrix().grants(Role::Investor, RecommendationsWrite));
        assert!(!engine.has_permission(Role::Investor, RecommendationsWrite));
        assert!(!engine.has_permission(Role::Investor, RecommendationsApprove));
        // Read-class grants still apply.
        assert!(engine.has_permission(Role::Investor, FarmersRead));
    }

    #[test]
    fn test_zone_admin_foreign_zone_denied_for_every_key() {
        let engine = PermissionEngine::dashboard();
        let z1 = ZoneId::new("z1");
        let z2 = ZoneId::new("z2");

        for key in PermissionKey::all() {
            assert!(!engine.can_access_resource(Role::ZoneAdmin, Some(&z1), *key, Some(&z2)));
        }
    }

    #[test]
    fn test_zone_admin_own_zone() {
        let engine = PermissionEngine::dashboard();
        let z1 = ZoneId::new("z1");

        assert!(engine.can_access_resource(Role::ZoneAdmin, Some(&z1), FarmersWrite, Some(&z1)));
        assert!(engine.can_access_resource(Role::ZoneAdmin, Some(&z1), FarmersRead, None));
        assert!(!engine.can_access_resource(Role::ZoneAdmin, Some(&z1), ZonesRead, Some(&z1)));
        assert!(!engine.can_access_resource(Role::ZoneAdmin, None, FarmersRead, Some(&z1)));
    }

    #[test]
    fn test_central_admin_bypasses_zone_scoping() {
        let engine = PermissionEngine::dashboard();
        let z1 = ZoneId::new("z1");
        let z2 = ZoneId::new("z2");

        for key in PermissionKey::all() {
            assert!(engine.can_access_resource(Role::CentralAdmin, Some(&z1), *key, Some(&z2)));
            assert!(engine.can_access_resource(Role::CentralAdmin, None, *key, Some(&z2)));
        }
    }

    #[test]
    fn test_permissions_for() {
        let engine = PermissionEngine::dashboard();

        assert_eq!(engine.permissions_for(Role::CentralAdmin).len(), PermissionKey::all().len());
        assert_eq!(engine.permissions_for(Role::ZoneAdmin).len(), 8);
        let investor = engine.permissions_for(Role::Investor);
        assert_eq!(investor.len(), 1);
        assert!(investor.contains(RecommendationsRead));
    }

    #[test]
    fn test_builder_revoke() {
        let matrix = PermissionMatrixBuilder::from_dashboard()
            .revoke(Role::ZoneAdmin, [FarmersDelete])
            .build();

        assert!(!matrix.grants(Role::ZoneAdmin, FarmersDelete));
        assert!(matrix.grants(Role::ZoneAdmin, FarmersWrite));
    }
}
