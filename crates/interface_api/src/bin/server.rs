//! GreenPages API Server Binary
//!
//! Starts the HTTP API and, when enabled, the daily renewal scheduler.
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! cargo run --bin greenpages-api
//!
//! # Run with environment variables
//! API_PORT=8080 API_DATABASE_URL=postgres://... cargo run --bin greenpages-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_JWT_SECRET` - JWT signing secret (required in production)
//! * `API_JWT_EXPIRATION_SECS` - JWT token expiration in seconds (default: 3600)
//! * `API_DATABASE_URL` - PostgreSQL connection string
//! * `API_DATABASE_MAX_CONNECTIONS` - Pool size (default: 10)
//! * `API_LOG_LEVEL` - Log level: trace, debug, info, warn, error (default: info)
//! * `API_LOG_JSON` - Emit JSON log lines (default: false)
//! * `API_CURRENCY` - Ledger currency (default: IQD)
//! * `API_BUSINESS_TIMEZONE` - Timezone that defines the business day (default: Asia/Baghdad)
//! * `API_RENEWAL_HORIZON_DAYS` - How far ahead renewal records are opened (default: 30)
//! * `API_RENEWAL_JOB_HOUR` - Local hour the daily jobs run (default: 2)
//! * `API_RENEWAL_JOBS_ENABLED` - Run the scheduler in this process (default: true)

use std::net::SocketAddr;
use std::sync::Arc;

use interface_api::{
    config::ApiConfig, create_router, scheduler::RenewalScheduler, AppState,
};
use infra_db::{create_pool, run_migrations, DatabaseConfig};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env()?;
    init_tracing(&config.log_level, config.log_json);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        currency = %config.currency.code(),
        timezone = %config.business_timezone,
        "Starting GreenPages API Server"
    );

    let pool = create_pool(
        DatabaseConfig::new(config.database_url.clone())
            .max_connections(config.database_max_connections),
    )
    .await?;
    run_migrations(&pool).await?;

    let state = AppState::new(pool, config.clone())?;
    let shutdown = Arc::new(Notify::new());

    let scheduler = if config.renewal_jobs_enabled {
        let handle = RenewalScheduler::new(
            state.jobs.clone(),
            state.timezone,
            config.renewal_job_hour,
            Arc::clone(&shutdown),
        )
        .spawn();
        Some(handle)
    } else {
        tracing::info!("Renewal scheduler disabled");
        None
    };

    let app = create_router(state);
    let addr: SocketAddr = config.server_addr().parse()?;
    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    let signal = Arc::clone(&shutdown);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            signal.notify_one();
        })
        .await?;

    if let Some(handle) = scheduler {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Renewal scheduler task failed");
        }
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber, plain or JSON
fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

/// Waits for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
