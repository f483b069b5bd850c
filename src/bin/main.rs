// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use anyhow::Context;
use clap::Parser;
use overdraft_ledger::config::load_accounts;
use overdraft_ledger::http::{AppState, create_router};
use overdraft_ledger::{Ledger, LedgerConfig, MovementLog};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Overdraft Ledger - bounded-overdraft account service
///
/// Serves movement and statement requests for a fixed set of accounts.
#[derive(Parser, Debug)]
#[command(name = "overdraft-ledger")]
#[command(about = "A bounded-overdraft ledger HTTP service", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "LEDGER_BIND", default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// CSV file with provisioned accounts
    ///
    /// Expected format: id,limit[,balance]
    /// Without it the five reference accounts are provisioned.
    #[arg(long, env = "LEDGER_ACCOUNTS", value_name = "FILE")]
    accounts: Option<PathBuf>,

    /// Maximum number of ledger operations in flight
    #[arg(long, env = "LEDGER_MAX_IN_FLIGHT", default_value_t = LedgerConfig::DEFAULT_MAX_IN_FLIGHT)]
    max_in_flight: usize,

    /// Per-operation deadline in milliseconds
    #[arg(long, env = "LEDGER_DEADLINE_MS", default_value_t = 10_000)]
    deadline_ms: u64,

    /// Movements kept in memory per account
    #[arg(long, env = "LEDGER_RETENTION", default_value_t = MovementLog::RECENT)]
    retention: usize,
}

impl Args {
    fn into_config(self) -> anyhow::Result<LedgerConfig> {
        let accounts = match &self.accounts {
            Some(path) => load_accounts(path)
                .with_context(|| format!("loading accounts from '{}'", path.display()))?,
            None => LedgerConfig::reference_accounts(),
        };
        Ok(LedgerConfig {
            accounts,
            max_in_flight: self.max_in_flight,
            deadline: Duration::from_millis(self.deadline_ms),
            retention: self.retention,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("overdraft_ledger=info")),
        )
        .init();

    let args = Args::parse();
    let bind = args.bind;
    let config = args.into_config()?;
    info!(
        accounts = config.accounts.len(),
        max_in_flight = config.max_in_flight,
        deadline_ms = config.deadline.as_millis() as u64,
        "provisioning ledger"
    );

    let ledger = Ledger::new(config).context("invalid ledger configuration")?;
    let app = create_router(AppState::new(ledger));

    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    info!("Ledger API server running on http://{bind}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}
