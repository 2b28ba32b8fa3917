// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all
)]
#![allow(clippy::multiple_crate_versions)]

mod live;
mod routes;

use chrono::Duration;
use clap::Parser;
use despacho::{EngineConfig, MidnightScheduler, SystemClock};
use despacho_api::DispatchApi;
use despacho_domain::{Tz, parse_timezone};
use despacho_store::{DocumentStore, SqliteStore, SubscriptionFilter};
use live::{LiveEventBroadcaster, forward_store_changes};
use routes::{AppState, build_router};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Despacho Server - HTTP server for the taxi dispatch day rollover
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the `SQLite` database file. If not provided, uses in-memory database.
    #[arg(short, long)]
    database: Option<String>,

    /// Port to bind the server to
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// IANA zone whose local midnight ends the dispatch day
    #[arg(short, long, default_value = "America/Bogota")]
    timezone: String,

    /// How long a status check may be served from cache
    #[arg(long, default_value_t = despacho::DEFAULT_STATUS_CACHE_TTL_MINUTES)]
    cache_ttl_minutes: i64,

    /// Width of the prompt window on each side of midnight
    #[arg(long, default_value_t = despacho::DEFAULT_PROMPT_WINDOW_MINUTES)]
    prompt_window_minutes: i64,

    /// Do not run the midnight timer in this process
    #[arg(long)]
    no_scheduler: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let timezone: Tz = parse_timezone(&args.timezone)?;
    let config: EngineConfig = EngineConfig {
        timezone,
        status_cache_ttl: Duration::minutes(args.cache_ttl_minutes),
        prompt_window: Duration::minutes(args.prompt_window_minutes),
        ..EngineConfig::default()
    };

    let store: Arc<dyn DocumentStore> = match &args.database {
        Some(path) => {
            info!(path = %path, "Opening SQLite database");
            Arc::new(SqliteStore::new_with_file(path)?)
        }
        None => {
            warn!("No database path given, using in-memory store");
            Arc::new(SqliteStore::new_in_memory()?)
        }
    };

    let api: Arc<DispatchApi> = Arc::new(DispatchApi::new(
        store.clone(),
        Arc::new(SystemClock),
        config,
    ));
    let live: Arc<LiveEventBroadcaster> = Arc::new(LiveEventBroadcaster::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(forward_store_changes(
        store.subscribe(SubscriptionFilter::all()),
        live.clone(),
        shutdown_rx.clone(),
    ));

    if args.no_scheduler {
        info!("Midnight scheduler disabled");
    } else {
        tokio::spawn(MidnightScheduler::new(api.engine()).run(shutdown_rx));
    }

    match api.get_status(true) {
        Ok(status) if status.needs_rollover => warn!(
            today = %status.today,
            last_rollover_date = ?status.last_rollover_date,
            "Dispatch day is stale at startup"
        ),
        Ok(status) => info!(today = %status.today, "Dispatch day is open"),
        Err(err) => error!(error = %err, "Startup status check failed"),
    }

    let app = build_router(AppState { api, live });

    let addr = format!("0.0.0.0:{}", args.port);
    info!(addr = %addr, timezone = %timezone, "Starting Despacho server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!(error = %err, "Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
        })
        .await?;

    let _ = shutdown_tx.send(true);
    Ok(())
}
