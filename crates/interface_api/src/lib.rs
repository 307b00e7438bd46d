//! HTTP API Layer
//!
//! REST API for the GreenPages settlement and renewal back office, built on Axum.
//!
//! # Architecture
//!
//! - **Handlers**: collections, settlements, renewals, accounting, health
//! - **Middleware**: JWT authentication, audit logging, error envelope
//! - **DTOs**: Request/Response data transfer objects
//! - **Scheduler**: daily renewal jobs in the business timezone
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let state = AppState::new(pool, config)?;
//! axum::serve(listener, create_router(state)).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;
pub mod scheduler;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
    middleware as axum_middleware,
};
use sqlx::PgPool;
use tower_http::trace::TraceLayer;
use tower_http::cors::{CorsLayer, Any};

use core_kernel::Timezone;
use domain_renewal::RenewalJobs;
use infra_db::{AccountingRepository, RenewalRepository, SettlementRepository};

use crate::config::{ApiConfig, ConfigError};
use crate::middleware::{auth_middleware, audit_middleware, error_envelope_middleware};
use crate::handlers::{accounting, collections, health, renewals, settlements};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: ApiConfig,
    pub timezone: Timezone,
    pub settlements: SettlementRepository,
    pub renewals: RenewalRepository,
    pub accounting: AccountingRepository,
    pub jobs: RenewalJobs,
}

impl AppState {
    /// Wires repositories and renewal jobs over one pool
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the business timezone is unknown
    pub fn new(pool: PgPool, config: ApiConfig) -> Result<Self, ConfigError> {
        let timezone = config.timezone()?;
        let currency = config.currency;
        let renewals = RenewalRepository::new(pool.clone(), currency);
        let jobs = RenewalJobs::new(Arc::new(renewals.clone()), config.renewal_horizon_days);

        Ok(Self {
            settlements: SettlementRepository::new(pool.clone(), currency),
            accounting: AccountingRepository::new(pool.clone(), currency),
            renewals,
            jobs,
            timezone,
            pool,
            config,
        })
    }
}

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let finance_routes = Router::new()
        .route(
            "/collections",
            post(collections::record_collection).get(collections::list_collections),
        )
        .route("/commissions", get(collections::list_commissions))
        .route("/commissions/:id/approve", put(collections::approve_commission));

    let agent_settlement_routes = Router::new()
        .route("/preview", get(settlements::preview_agent_settlement))
        .route(
            "/",
            post(settlements::create_agent_settlement).get(settlements::list_agent_settlements),
        )
        .route("/:id", get(settlements::get_agent_settlement))
        .route("/:id/submit", put(settlements::submit_agent_settlement))
        .route("/:id/confirm", put(settlements::confirm_agent_settlement))
        .route("/:id/cancel", put(settlements::cancel_agent_settlement));

    let manager_settlement_routes = Router::new()
        .route("/preview", get(settlements::preview_manager_settlement))
        .route(
            "/",
            post(settlements::create_manager_settlement).get(settlements::list_manager_settlements),
        )
        .route("/:id", get(settlements::get_manager_settlement))
        .route("/:id/submit", put(settlements::submit_manager_settlement))
        .route("/:id/confirm", put(settlements::confirm_manager_settlement))
        .route("/:id/cancel", put(settlements::cancel_manager_settlement));

    let renewal_routes = Router::new()
        .route("/", get(renewals::list_renewals))
        .route("/stats", get(renewals::renewal_stats))
        .route("/jobs/run", post(renewals::run_jobs))
        .route("/:id", get(renewals::get_renewal))
        .route(
            "/:id/contacts",
            get(renewals::list_contacts).post(renewals::log_contact),
        )
        .route("/:id/decision", post(renewals::record_decision))
        .route("/:id/assign", put(renewals::assign_renewal));

    let accounting_routes =
        Router::new().route("/trial-balance", get(accounting::trial_balance));

    // Protected API routes
    let api_routes = Router::new()
        .merge(finance_routes)
        .nest("/financial-settlements/agent", agent_settlement_routes)
        .nest("/financial-settlements/manager", manager_settlement_routes)
        .nest("/renewals", renewal_routes)
        .nest("/accounting", accounting_routes)
        .layer(axum_middleware::from_fn(audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(axum_middleware::from_fn(error_envelope_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
