// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Route table: which roles may view which path prefixes.
//!
//! Matching is on path-segment boundaries: `/farmers` matches `/farmers` and
//! `/farmers/12/edit` but not `/farmers-archive`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::Role;

// =============================================================================
// RouteEntry
// =============================================================================

/// A path prefix and the roles allowed to reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteEntry {
    /// Normalized path prefix, e.g. `/zone-data`.
    pub path_prefix: String,
    /// Roles allowed under this prefix.
    pub allowed_roles: BTreeSet<Role>,
}

impl RouteEntry {
    /// Creates a new entry. The prefix is normalized.
    pub fn new(path_prefix: &str, allowed_roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            path_prefix: normalize_path(path_prefix).unwrap_or_else(|| "/".to_string()),
            allowed_roles: allowed_roles.into_iter().collect(),
        }
    }

    /// Returns `true` if `path` (already normalized) is this prefix or below it.
    pub fn matches(&self, path: &str) -> bool {
        is_segment_prefix(&self.path_prefix, path)
    }

    /// Returns `true` if the role is allowed.
    pub fn allows(&self, role: Role) -> bool {
        self.allowed_roles.contains(&role)
    }
}

// =============================================================================
// RouteTable
// =============================================================================

/// The authoritative route-to-role mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    /// Creates an empty table (no route reachable).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the dashboard's default route table.
    pub fn dashboard() -> Self {
        use Role::*;

        Self::new()
            .with_entry(RouteEntry::new("/dashboard", [CentralAdmin, ZoneAdmin, Investor]))
            .with_entry(RouteEntry::new("/profile", [CentralAdmin, ZoneAdmin, Investor]))
            .with_entry(RouteEntry::new("/recommendations", [CentralAdmin, ZoneAdmin, Investor]))
            .with_entry(RouteEntry::new("/analytics", [CentralAdmin, Investor]))
            .with_entry(RouteEntry::new("/farmers", [CentralAdmin, ZoneAdmin]))
            .with_entry(RouteEntry::new("/zone-data", [CentralAdmin, ZoneAdmin]))
            .with_entry(RouteEntry::new("/zones", [CentralAdmin]))
            .with_entry(RouteEntry::new("/iot", [CentralAdmin]))
            .with_entry(RouteEntry::new("/users", [CentralAdmin]))
    }

    /// Adds an entry.
    pub fn with_entry(mut self, entry: RouteEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Returns all entries.
    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    /// Returns the prefixes reachable by a role.
    pub fn routes_for(&self, role: Role) -> BTreeSet<String> {
        self.entries
            .iter()
            .filter(|entry| entry.allows(role))
            .map(|entry| entry.path_prefix.clone())
            .collect()
    }

    /// Returns `true` if some entry matches `path` and allows `role`.
    ///
    /// Paths that cannot be normalized (e.g. containing `..`) are denied.
    pub fn has_route_access(&self, role: Role, path: &str) -> bool {
        let Some(path) = normalize_path(path) else {
            return false;
        };

        self.entries
            .iter()
            .any(|entry| entry.allows(role) && entry.matches(&path))
    }

    /// Returns `true` if any entry covers the path, regardless of role.
    pub fn is_known(&self, path: &str) -> bool {
        normalize_path(path)
            .map(|path| self.entries.iter().any(|entry| entry.matches(&path)))
            .unwrap_or(false)
    }
}

// =============================================================================
// Path Helpers
// =============================================================================

/// Normalizes a request path.
///
/// Drops the query string and fragment, collapses repeated slashes, strips the
/// trailing slash and removes `.` segments. Returns `None` for paths with `..`
/// segments or that are not absolute.
pub fn normalize_path(path: &str) -> Option<String> {
    let path = path
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim();

    if !path.starts_with('/') {
        return None;
    }

    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            s => segments.push(s),
        }
    }

    Some(format!("/{}", segments.join("/")))
}

/// Returns `true` if `path` equals `prefix` or is a descendant of it.
fn is_segment_prefix(prefix: &str, path: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/farmers/"), Some("/farmers".to_string()));
        assert_eq!(normalize_path("//farmers//12"), Some("/farmers/12".to_string()));
        assert_eq!(normalize_path("/farmers?page=2#top"), Some("/farmers".to_string()));
        assert_eq!(normalize_path("/./zones"), Some("/zones".to_string()));
        assert_eq!(normalize_path("/"), Some("/".to_string()));
        assert_eq!(normalize_path("/farmers/../users"), None);
        assert_eq!(normalize_path("farmers"), None);
    }

    #[test]
    fn test_segment_boundary_matching() {
        let entry = RouteEntry::new("/farmers", [Role::ZoneAdmin]);

        assert!(entry.matches("/farmers"));
        assert!(entry.matches("/farmers/12/edit"));
        assert!(!entry.matches("/farmers-archive"));
        assert!(!entry.matches("/farm"));
        assert!(!entry.matches("/"));
    }

    #[test]
    fn test_dashboard_table() {
        let table = RouteTable::dashboard();

        assert!(table.has_route_access(Role::CentralAdmin, "/zones/3"));
        assert!(!table.has_route_access(Role::ZoneAdmin, "/zones"));
        assert!(table.has_route_access(Role::ZoneAdmin, "/zone-data/readings"));
        assert!(!table.has_route_access(Role::ZoneAdmin, "/zones-data"));
        assert!(table.has_route_access(Role::Investor, "/analytics?range=30d"));
        assert!(!table.has_route_access(Role::Investor, "/farmers"));
        assert!(!table.has_route_access(Role::CentralAdmin, "/unknown"));
        assert!(!table.has_route_access(Role::CentralAdmin, "/dashboard/../users"));
    }

    #[test]
    fn test_routes_for() {
        let table = RouteTable::dashboard();
        let investor = table.routes_for(Role::Investor);

        assert!(investor.contains("/dashboard"));
        assert!(investor.contains("/analytics"));
        assert!(!investor.contains("/users"));
        assert_eq!(table.routes_for(Role::CentralAdmin).len(), 9);
    }

    #[test]
    fn test_root_prefix_matches_everything() {
        let table = RouteTable::new().with_entry(RouteEntry::new("/", [Role::CentralAdmin]));
        assert!(table.has_route_access(Role::CentralAdmin, "/anything/at/all"));
        assert!(!table.has_route_access(Role::Investor, "/"));
    }

    proptest! {
        #[test]
        fn prop_descendants_match(prefix in "(/[a-z]{1,8}){1,3}", rest in "(/[a-z0-9]{1,6}){0,3}") {
            let entry = RouteEntry::new(&prefix, [Role::Investor]);
            let path = format!("{}{}", prefix, rest);
            prop_assert!(entry.matches(&path));
        }

        #[test]
        fn prop_sibling_with_shared_stem_does_not_match(prefix in "(/[a-z]{1,8}){1,3}", tail in "[a-z0-9-]{1,6}") {
            let entry = RouteEntry::new(&prefix, [Role::Investor]);
            let path = format!("{}{}", prefix, tail);
            prop_assert!(!entry.matches(&path));
        }
    }
}
