// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # AgriGuard Integration Tests
//!
//! Integration tests for the AgriGuard auth client, plus the fixtures,
//! builders and mocks they share.
//!
//! ## Module Structure
//!
//! - [`common`]: Shared test utilities
//!   - `fixtures`: Users, sessions and configs used across suites
//!   - `builders`: Builder for ad-hoc sessions
//!   - `assertions`: Assertion helpers for states, audit trails and errors
//!   - `mocks`: Mock auth service and transport
//!   - `harness`: Wires a client or session manager around the mocks
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all integration tests
//! cargo test -p agriguard-tests
//!
//! # Run specific test suite
//! cargo test -p agriguard-tests --test integration_core
//! cargo test -p agriguard-tests --test integration_session
//! cargo test -p agriguard-tests --test integration_guard
//! cargo test -p agriguard-tests --test integration_data
//! cargo test -p agriguard-tests --test integration_config
//! ```
//!
//! ## Test Categories
//!
//! ### Core Tests (`integration_core.rs`)
//! - Token codec failures and round trips
//! - Permission matrix, investor override and zone scoping
//!
//! ### Session Tests (`integration_session.rs`)
//! - Login, logout and hydration through durable storage
//! - Expiry monitor, auto-refresh and reconciliation between handles
//! - Logout racing an in-flight login
//!
//! ### Guard Tests (`integration_guard.rs`)
//! - Redirects by state and role
//! - Teardown of a rendered subtree when the session ends
//!
//! ### Data Tests (`integration_data.rs`)
//! - Denials never reach the transport
//! - Status mapping (401, 403, 5xx)
//!
//! ### Config Tests (`integration_config.rs`)
//! - YAML loading, defaults and validation
//!
//! ## Writing New Tests
//!
//! ```rust,ignore
//! use agriguard_tests::prelude::*;
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let harness = TestHarness::new();
//!     let client = harness.client();
//!     assert!(client.login(UserFixtures::CENTRAL_EMAIL, PASSWORD).await);
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Re-export commonly used items for convenience.
pub mod prelude {
    pub use crate::common::assertions::*;
    pub use crate::common::builders::*;
    pub use crate::common::fixtures::*;
    pub use crate::common::harness::*;
    pub use crate::common::mocks::*;
    pub use crate::common::{init_test_logging, temp_test_dir};
}
