// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Bearer credential handling.
//!
//! This module provides:
//! - Typed claims and a claims builder
//! - The structural codec (`decode`, `encode`, expiry checks)
//! - [`Credential`], a raw bearer string paired with its validated claims

mod claims;
mod codec;

pub use claims::{Claims, ClaimsBuilder};
pub use codec::{decode, encode, expires_within, is_expired, Credential};
