//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: storage wiring (in-memory or Postgres) and the services on top
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and query parsing
//! - `errors.rs`: consistent error responses

use std::sync::Arc;
use std::time::Duration;

use axum::{middleware::from_fn_with_state, Extension, Router};
use tower::ServiceBuilder;

use warehouse_infra::StoreError;

use crate::config::ApiConfig;
use crate::middleware::{self, AuthState, ScopeState};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &ApiConfig) -> Result<Router, StoreError> {
    let services = services::build_services(config).await?;
    Ok(build_router(services, config.request_timeout))
}

/// Wire already-built services into the router.
///
/// Layering, outermost first: request scope → auth gate (protected routes
/// only) → per-route permission gate → handler.
pub fn build_router(services: AppServices, request_timeout: Duration) -> Router {
    let auth_state = AuthState {
        tokens: services.tokens.clone(),
        clock: services.clock.clone(),
    };
    let services = Arc::new(services);

    let protected = routes::protected_router().layer(from_fn_with_state(auth_state, middleware::auth_gate));

    Router::new()
        .merge(routes::public_router())
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(from_fn_with_state(ScopeState { request_timeout }, middleware::request_scope))
                .layer(Extension(services)),
        )
}
