// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # agriguard-client
//!
//! Client-side session handling for the AgriGuard dashboard.
//!
//! ## Components
//!
//! - [`store`]: durable, re-validated persistence of the session
//! - [`service`]: credential issuance over HTTP or from an in-process directory
//! - [`session`]: the session state machine with expiry monitoring and
//!   reconciliation against storage
//! - [`guard`]: render-time route gate
//! - [`data`]: resource client that re-checks role and zone on every call
//! - [`AuthClient`]: all of the above behind one handle
//!
//! ## Example
//!
//! ```no_run
//! use agriguard_client::AuthClient;
//! use agriguard_config::AgriguardConfig;
//!
//! # async fn run() -> agriguard_core::AuthResult<()> {
//! let client = AuthClient::from_config(&AgriguardConfig::default())?;
//! client.init();
//!
//! if client.login("amina@example.com", "secret").await {
//!     let route = client.mount("/farmers", None);
//!     println!("{:?}", route.decision());
//! }
//! client.teardown();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod data;
pub mod guard;
pub mod service;
pub mod session;
pub mod store;

pub use client::{AuthClient, AuthClientBuilder};
pub use data::{
    required_permission, DataClient, HttpTransport, Method, Operation, ResourceKind,
    ResourceRequest, SharedTransport, Transport, TransportRequest, TransportResponse,
};
pub use guard::{GuardDecision, GuardedRoute, RouteGuard};
pub use service::{
    AuthService, DirectoryAuthService, HttpAuthService, Identifier, LoginRequest,
    SharedAuthService,
};
pub use session::{
    SessionManager, SessionManagerBuilder, SessionSettings, SessionState, UnauthenticatedCause,
};
pub use store::{
    open_backend, CredentialStore, DisabledStorage, FileStorage, LoadOutcome, MemoryStorage,
    SharedStorage, StorageBackend, StorageError,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
