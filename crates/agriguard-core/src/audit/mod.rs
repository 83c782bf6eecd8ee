// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Audit trail for session lifecycle events.
//!
//! The session manager reports every login, logout, refresh, expiry and
//! external invalidation through an [`AuditLogger`]. Loggers are synchronous:
//! recording must never block or fail a state transition.
//!
//! # Components
//!
//! - [`AuditLogger`]: Sink trait
//! - [`AuditLog`]: A single record
//! - [`InMemoryAuditLogger`]: Queryable in-memory sink for tests
//! - [`TracingAuditLogger`]: Emits records as `tracing` events
//! - [`NoOpAuditLogger`]: Discards everything

mod memory_logger;
mod types;

pub use memory_logger::InMemoryAuditLogger;
pub use types::{ActionResult, AuditAction, AuditLog};

use std::sync::Arc;

// =============================================================================
// Core Trait
// =============================================================================

/// Sink for audit records.
pub trait AuditLogger: Send + Sync + std::fmt::Debug {
    /// Records an entry. Implementations swallow their own failures.
    fn log(&self, entry: AuditLog);

    /// Returns the logger name for identification.
    fn name(&self) -> &str {
        "audit_logger"
    }
}

/// Shared audit logger handle.
pub type SharedAuditLogger = Arc<dyn AuditLogger>;

impl<T: AuditLogger + ?Sized> AuditLogger for Arc<T> {
    fn log(&self, entry: AuditLog) {
        (**self).log(entry)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

// =============================================================================
// No-Op Logger
// =============================================================================

/// A logger that discards all entries.
#[derive(Debug, Default, Clone)]
pub struct NoOpAuditLogger;

impl NoOpAuditLogger {
    /// Creates a new no-op logger.
    pub fn new() -> Self {
        Self
    }
}

impl AuditLogger for NoOpAuditLogger {
    fn log(&self, _entry: AuditLog) {}

    fn name(&self) -> &str {
        "noop"
    }
}

// =============================================================================
// Tracing Logger
// =============================================================================

/// Emits every record as a structured `tracing` event on the `audit` target.
#[derive(Debug, Default, Clone)]
pub struct TracingAuditLogger;

impl TracingAuditLogger {
    /// Creates a new tracing logger.
    pub fn new() -> Self {
        Self
    }
}

impl AuditLogger for TracingAuditLogger {
    fn log(&self, entry: AuditLog) {
        let user_id = entry.user_id.as_ref().map(|id| id.as_str()).unwrap_or("-");
        let role = entry.role.map(|role| role.as_str()).unwrap_or("-");

        if entry.action.is_security_sensitive() {
            tracing::warn!(
                target: "audit",
                id = %entry.id,
                action = %entry.action,
                user_id,
                role,
                result = ?entry.result,
                details = %entry.details,
                "Audit event"
            );
        } else {
            tracing::info!(
                target: "audit",
                id = %entry.id,
                action = %entry.action,
                user_id,
                role,
                result = ?entry.result,
                "Audit event"
            );
        }
    }

    fn name(&self) -> &str {
        "tracing"
    }
}
