// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # agriguard-core
//!
//! Pure authentication and authorization primitives for the AgriGuard
//! agricultural dashboard.
//!
//! This crate provides:
//!
//! - **Token**: Bearer credential codec and typed claims
//! - **Types**: `Role`, `ZoneId`, `UserId`, `User`, `Session`
//! - **Permission**: The closed set of `resource:action` keys
//! - **Rbac**: Role-to-permission matrix and the permission engine
//! - **Routes**: Route-prefix table with segment-bounded matching
//! - **Clock**: Injectable time source
//! - **Audit**: Session lifecycle audit records and loggers
//! - **Error**: Unified [`AuthError`]
//!
//! Nothing here performs I/O; storage, transport and session state live in
//! `agriguard-client`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use agriguard_core::{PermissionEngine, PermissionKey, Role, ZoneId};
//!
//! let engine = PermissionEngine::dashboard();
//! assert!(engine.has_permission(Role::ZoneAdmin, PermissionKey::FarmersWrite));
//! assert!(!engine.can_access_resource(
//!     Role::ZoneAdmin,
//!     Some(&ZoneId::new("z1")),
//!     PermissionKey::FarmersWrite,
//!     Some(&ZoneId::new("z2")),
//! ));
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Core Modules
// =============================================================================

pub mod clock;
pub mod error;
pub mod token;
pub mod types;

// =============================================================================
// Authorization Modules
// =============================================================================

pub mod permission;
pub mod rbac;
pub mod routes;

// =============================================================================
// Audit
// =============================================================================

pub mod audit;

// =============================================================================
// Re-exports for convenience
// =============================================================================

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use error::{AuthError, AuthResult};
pub use permission::{PermissionKey, PermissionSet};
pub use rbac::{PermissionEngine, PermissionMatrix, PermissionMatrixBuilder};
pub use routes::{normalize_path, RouteEntry, RouteTable};
pub use token::{Claims, ClaimsBuilder, Credential};
pub use types::{Role, Session, User, UserId, ZoneId};

pub use audit::{
    ActionResult, AuditAction, AuditLog, AuditLogger, InMemoryAuditLogger, NoOpAuditLogger,
    SharedAuditLogger, TracingAuditLogger,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
