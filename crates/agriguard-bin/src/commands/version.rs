// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `version` command.

use crate::cli::Cli;
use crate::error::BinResult;

/// Executes the `version` command to display version information.
pub fn version(_cli: &Cli) -> BinResult<()> {
    println!("AgriGuard - session and access control for the agricultural dashboard");
    println!();
    println!("Version Information:");
    println!("  agriguard-bin:    {}", env!("CARGO_PKG_VERSION"));
    println!("  agriguard-core:   {}", agriguard_core::VERSION);
    println!("  agriguard-config: {}", agriguard_config::VERSION);
    println!("  agriguard-client: {}", agriguard_client::VERSION);
    println!();
    println!("Build Information:");
    println!("  Target:       {}", std::env::consts::ARCH);
    println!("  OS:           {}", std::env::consts::OS);
    println!();
    println!("License: PolyForm Noncommercial License 1.0.0");
    println!("Copyright (c) 2025 Sylvex. All rights reserved.");

    Ok(())
}
