// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session lifecycle.
//!
//! ```text
//! Unauthenticated --hydrate--> Hydrating --> Authenticated | Expiring | Unauthenticated
//! Unauthenticated --login----> Authenticated
//! Authenticated  --window----> Expiring --refresh--> Authenticated
//! Authenticated | Expiring --expiry--> Unauthenticated(expired)
//! any            --logout----> Unauthenticated(logged_out)
//! ```

mod manager;
mod state;

pub use manager::{SessionManager, SessionManagerBuilder, SessionSettings};
pub use state::{SessionState, UnauthenticatedCause};
