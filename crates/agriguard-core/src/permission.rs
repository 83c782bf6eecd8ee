// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Permission keys for RBAC.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Namespaced `resource:action` keys.
///
/// The set is static; permission keys are never user-defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "&'static str", try_from = "String")]
pub enum PermissionKey {
    // =========================================================================
    // Zones
    // =========================================================================
    /// View zones.
    ZonesRead,
    /// Create and edit zones.
    ZonesWrite,
    /// Remove zones.
    ZonesDelete,

    // =========================================================================
    // IoT devices
    // =========================================================================
    /// View IoT devices.
    IotRead,
    /// Register and edit IoT devices.
    IotWrite,
    /// Remove IoT devices.
    IotDelete,

    // =========================================================================
    // Farmers
    // =========================================================================
    /// View farmers.
    FarmersRead,
    /// Register and edit farmers.
    FarmersWrite,
    /// Remove farmers.
    FarmersDelete,

    // =========================================================================
    // Recommendations
    // =========================================================================
    /// View crop recommendations.
    RecommendationsRead,
    /// Generate and edit recommendations.
    RecommendationsWrite,
    /// Approve or decline recommendations.
    RecommendationsApprove,

    // =========================================================================
    // Zone data
    // =========================================================================
    /// View sensor and land-condition data.
    ZoneDataRead,
    /// Upload and edit zone data.
    ZoneDataWrite,

    // =========================================================================
    // Users
    // =========================================================================
    /// View user accounts.
    UsersRead,
    /// Create and edit user accounts.
    UsersWrite,
    /// Remove user accounts.
    UsersDelete,
}

impl PermissionKey {
    /// Returns the key as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionKey::ZonesRead => "zones:read",
            PermissionKey::ZonesWrite => "zones:write",
            PermissionKey::ZonesDelete => "zones:delete",
            PermissionKey::IotRead => "iot:read",
            PermissionKey::IotWrite => "iot:write",
            PermissionKey::IotDelete => "iot:delete",
            PermissionKey::FarmersRead => "farmers:read",
            PermissionKey::FarmersWrite => "farmers:write",
            PermissionKey::FarmersDelete => "farmers:delete",
            PermissionKey::RecommendationsRead => "recommendations:read",
            PermissionKey::RecommendationsWrite => "recommendations:write",
            PermissionKey::RecommendationsApprove => "recommendations:approve",
            PermissionKey::ZoneDataRead => "zone_data:read",
            PermissionKey::ZoneDataWrite => "zone_data:write",
            PermissionKey::UsersRead => "users:read",
            PermissionKey::UsersWrite => "users:write",
            PermissionKey::UsersDelete => "users:delete",
        }
    }

    /// Parses a key from its `resource:action` form.
    pub fn parse(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|key| key.as_str() == s)
    }

    /// Returns all permission keys.
    pub fn all() -> &'static [PermissionKey] {
        &[
            PermissionKey::ZonesRead,
            PermissionKey::ZonesWrite,
            PermissionKey::ZonesDelete,
            PermissionKey::IotRead,
            PermissionKey::IotWrite,
            PermissionKey::IotDelete,
            PermissionKey::FarmersRead,
            PermissionKey::FarmersWrite,
            PermissionKey::FarmersDelete,
            PermissionKey::RecommendationsRead,
            PermissionKey::RecommendationsWrite,
            PermissionKey::RecommendationsApprove,
            PermissionKey::ZoneDataRead,
            PermissionKey::ZoneDataWrite,
            PermissionKey::UsersRead,
            PermissionKey::UsersWrite,
            PermissionKey::UsersDelete,
        ]
    }

    /// Returns the resource namespace (the part before the colon).
    pub fn resource(&self) -> &'static str {
        self.as_str().split_once(':').map(|(r, _)| r).unwrap_or("")
    }

    /// Returns the action (the part after the colon).
    pub fn action(&self) -> &'static str {
        self.as_str().split_once(':').map(|(_, a)| a).unwrap_or("")
    }

    /// Returns `true` for any key that changes state (write, delete, approve).
    pub fn is_write_class(&self) -> bool {
        self.action() != "read"
    }
}

impl fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<PermissionKey> for &'static str {
    fn from(key: PermissionKey) -> Self {
        key.as_str()
    }
}

impl TryFrom<String> for PermissionKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PermissionKey::parse(&value).ok_or_else(|| format!("unknown permission key '{}'", value))
    }
}

impl std::str::FromStr for PermissionKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PermissionKey::try_from(s.to_string())
    }
}

// =============================================================================
// Permission Set
// =============================================================================

/// A set of permission keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    permissions: BTreeSet<PermissionKey>,
}

impl PermissionSet {
    /// Creates an empty permission set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a permission set from a list of keys.
    pub fn from_permissions(permissions: impl IntoIterator<Item = PermissionKey>) -> Self {
        Self {
            permissions: permissions.into_iter().collect(),
        }
    }

    /// Adds a key to the set.
    pub fn add(&mut self, permission: PermissionKey) {
        self.permissions.insert(permission);
    }

    /// Removes a key from the set.
    pub fn remove(&mut self, permission: PermissionKey) {
        self.permissions.remove(&permission);
    }

    /// Returns `true` if the set contains the given key.
    pub fn contains(&self, permission: PermissionKey) -> bool {
        self.permissions.contains(&permission)
    }

    /// Returns `true` if the set contains all of the given keys.
    pub fn contains_all(&self, permissions: &[PermissionKey]) -> bool {
        permissions.iter().all(|p| self.permissions.contains(p))
    }

    /// Returns `true` if the set contains any of the given keys.
    pub fn contains_any(&self, permissions: &[PermissionKey]) -> bool {
        permissions.iter().any(|p| self.permissions.contains(p))
    }

    /// Returns the number of keys in the set.
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Returns `true` if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    /// Returns an iterator over the keys in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &PermissionKey> {
        self.permissions.iter()
    }

    /// Keeps only the keys matching the predicate.
    pub fn retain(&mut self, f: impl FnMut(&PermissionKey) -> bool) {
        self.permissions.retain(f);
    }
}

impl FromIterator<PermissionKey> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = PermissionKey>>(iter: I) -> Self {
        Self::from_permissions(iter)
    }
}

// =============================================================================
// Tests
// =============================================================================
