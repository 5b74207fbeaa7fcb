// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! FoodSave API Server
//!
//! Accounts, sessions and donation listings for businesses, food banks and
//! volunteers moving surplus food.

use foodsave::{config::Config, db::Db, error::set_verbose_errors, services::Mailer, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often idle rate-limit windows are dropped.
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment
    let config = Config::from_env()?;
    let production = config.environment.is_production();

    init_logging(production)?;
    set_verbose_errors(!production);
    tracing::info!(
        port = config.port,
        environment = ?config.environment,
        "Starting FoodSave API"
    );

    let db = Db::connect(&config.database).await?;
    let mailer = Mailer::new(&config.mail, &config.frontend_url)?;

    let port = config.port;
    let state = Arc::new(AppState::new(config, db, mailer));
    spawn_rate_limit_purge(state.clone());

    let app = foodsave::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn spawn_rate_limit_purge(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            let purged = state.rate_limiter.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, remaining = state.rate_limiter.len(), "Purged rate limit windows");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// JSON logs in production, compact human-readable output otherwise.
fn init_logging(production: bool) -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("foodsave=debug".parse()?)
        .add_directive("info".parse()?);

    let registry = tracing_subscriber::registry().with(filter);
    if production {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .with_current_span(true)
                    .flatten_event(true),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().compact())
            .init();
    }
    Ok(())
}
