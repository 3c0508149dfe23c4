use axum::{extract::Extension, http::StatusCode, Json};
use serde_json::{json, Value};

use warehouse_auth::{PermissionMatrix, RolePermissions};

use crate::context::IdentityContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn me(Extension(caller): Extension<IdentityContext>) -> Json<Value> {
    Json(json!({
        "username": caller.username(),
        "role": caller.role(),
        "permissions": caller.role().permissions(),
    }))
}

pub async fn roles() -> Json<Vec<RolePermissions>> {
    Json(PermissionMatrix::rows())
}
