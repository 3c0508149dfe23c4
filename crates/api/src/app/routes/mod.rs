use axum::{middleware::from_fn_with_state, routing::get, routing::MethodRouter, Router};

use warehouse_auth::Action;

use crate::authz::permission_gate;

pub mod auth;
pub mod history;
pub mod items;
pub mod system;

/// Endpoints reachable without a token.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .merge(auth::router())
}

/// Endpoints behind the auth gate.
pub fn protected_router() -> Router {
    Router::new()
        .route("/api/me", get(system::me))
        .route("/api/roles", get(system::roles))
        .merge(items::router())
        .merge(history::router())
}

/// Require `action` for this method route.
pub(crate) fn guarded(action: Action, route: MethodRouter) -> MethodRouter {
    route.route_layer(from_fn_with_state(action, permission_gate))
}
