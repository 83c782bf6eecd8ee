// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-memory audit logger for testing and development.

use std::sync::Arc;

use parking_lot::RwLock;

use super::types::{AuditAction, AuditLog};
use super::AuditLogger;

/// In-memory audit logger.
///
/// Clones share the same buffer, so a test can keep one handle and give the
/// other to a session manager.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuditLogger {
    logs: Arc<RwLock<Vec<AuditLog>>>,
    /// Maximum number of entries to keep (0 = unlimited).
    max_entries: usize,
}

impl InMemoryAuditLogger {
    /// Creates a logger with unlimited capacity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a logger that keeps at most `max_entries`, dropping the oldest.
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            logs: Arc::new(RwLock::new(Vec::with_capacity(max_entries.min(1024)))),
            max_entries,
        }
    }

    /// Returns all entries.
    pub fn entries(&self) -> Vec<AuditLog> {
        self.logs.read().clone()
    }

    /// Returns the recorded actions in order.
    pub fn actions(&self) -> Vec<AuditAction> {
        self.logs.read().iter().map(|log| log.action).collect()
    }

    /// Returns entries for a specific action.
    pub fn entries_for_action(&self, action: AuditAction) -> Vec<AuditLog> {
        self.logs
            .read()
            .iter()
            .filter(|log| log.action == action)
            .cloned()
            .collect()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.logs.read().len()
    }

    /// Returns `true` if empty.
    pub fn is_empty(&self) -> bool {
        self.logs.read().is_empty()
    }

    /// Clears all entries.
    pub fn clear(&self) {
        self.logs.write().clear();
    }
}

impl AuditLogger for InMemoryAuditLogger {
    fn log(&self, entry: AuditLog) {
        let mut logs = self.logs.write();
        if self.max_entries > 0 && logs.len() >= self.max_entries {
            let overflow = logs.len() + 1 - self.max_entries;
            logs.drain(..overflow);
        }
        logs.push(entry);
    }

    fn name(&self) -> &str {
        "memory"
    }
}
