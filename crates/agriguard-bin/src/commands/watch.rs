// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `watch` command.

use std::future::pending;

use agriguard_config::AgriguardConfig;
use tokio::time::sleep;
use tracing::info;

use super::build_client;
use crate::cli::WatchArgs;
use crate::error::{BinError, BinResult};

/// Executes the `watch` command.
///
/// Starts the background session tasks and prints every state change until
/// the session ends, the duration elapses or Ctrl-C is pressed.
pub async fn watch(config: &AgriguardConfig, args: &WatchArgs) -> BinResult<()> {
    let client = build_client(config)?;
    let mut changes = client.session().subscribe();

    let initial = client.init();
    println!("{}  {}", timestamp(), initial);
    if !initial.is_authenticated() {
        client.teardown();
        return Ok(());
    }

    let deadline = async {
        match args.duration {
            Some(duration) => sleep(duration).await,
            None => pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    let result = loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break Err(BinError::runtime("Session manager stopped"));
                }
                let state = changes.borrow_and_update().clone();
                println!("{}  {}", timestamp(), state);
                if !state.is_authenticated() && !state.is_hydrating() {
                    break Ok(());
                }
            }
            _ = &mut deadline => {
                info!("Watch duration elapsed");
                break Ok(());
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    break Err(BinError::runtime(format!("Failed to listen for Ctrl-C: {}", e)));
                }
                info!("Interrupted");
                break Ok(());
            }
        }
    };

    client.teardown();
    result
}

fn timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}
