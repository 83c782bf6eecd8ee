// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! AgriGuard command-line entry point.

use agriguard_bin::commands;
use agriguard_bin::error::report_error_and_exit;
use agriguard_bin::{init_logging, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    let config = match commands::load_config(&cli) {
        Ok(config) => config,
        Err(e) => report_error_and_exit(e),
    };

    let level = cli
        .forced_log_level()
        .unwrap_or(config.logging.level.as_str())
        .to_string();
    let format = cli
        .log_format
        .map(Into::into)
        .unwrap_or(config.logging.format);
    init_logging(&level, format, config.logging.with_target);

    if let Err(e) = commands::execute(&cli, config).await {
        report_error_and_exit(e);
    }
}
