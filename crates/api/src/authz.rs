//! Per-route permission gate.
//!
//! Runs after the auth gate, so a missing identity here means the route was
//! wired without authentication; that is still answered with 401.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use warehouse_auth::{authorize, Action};

use crate::app::errors::ApiError;
use crate::context::IdentityContext;

/// Apply with `route_layer(from_fn_with_state(action, permission_gate))`.
pub async fn permission_gate(State(action): State<Action>, req: Request, next: Next) -> Result<Response, ApiError> {
    let Some(caller) = req.extensions().get::<IdentityContext>() else {
        tracing::debug!(%action, "permission gate: no identity on request");
        return Err(ApiError::Unauthorized);
    };

    if let Err(e) = authorize(caller.identity(), action) {
        tracing::debug!(username = caller.username(), role = %caller.role(), %action, "permission gate: forbidden");
        return Err(e.into());
    }

    Ok(next.run(req).await)
}
