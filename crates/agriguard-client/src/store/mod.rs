// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session persistence.
//!
//! - [`StorageBackend`]: string key-value storage (memory, file, disabled)
//! - [`CredentialStore`]: the validated session record on top of a backend

mod backend;
mod credential;

use std::sync::Arc;

use agriguard_config::{StorageConfig, StorageKind};
use tracing::info;

pub use backend::{
    DisabledStorage, FileStorage, MemoryStorage, SharedStorage, StorageBackend, StorageError,
    StorageResult,
};
pub use credential::{CredentialStore, LoadOutcome};

/// Opens the backend selected by the storage configuration.
pub fn open_backend(config: &StorageConfig) -> StorageResult<SharedStorage> {
    let backend: SharedStorage = match config.backend {
        StorageKind::Memory => Arc::new(MemoryStorage::new()),
        StorageKind::File => Arc::new(FileStorage::open(&config.path)?),
        StorageKind::Disabled => Arc::new(DisabledStorage),
    };

    info!(
        backend = backend.name(),
        namespace = %config.namespace,
        "Session storage opened"
    );
    Ok(backend)
}
