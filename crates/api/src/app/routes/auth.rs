use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};

use warehouse_core::RequestScope;

use crate::app::dto::{LoginRequest, RegisterRequest, UserResponse};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::middleware::{cleared_session_cookie, session_cookie};

pub fn router() -> Router {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(scope): Extension<RequestScope>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = payload?;
    let role = body.role()?;

    let user = services
        .accounts
        .register(&scope, &body.username, &body.password, role)
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))).into_response())
}

/// Returns the token in the body and also sets it as the session cookie.
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(scope): Extension<RequestScope>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = payload?;

    let outcome = services.accounts.login(&scope, &body.username, &body.password).await?;
    let cookie = session_cookie(&outcome.token, services.tokens.ttl());

    Ok(([(header::SET_COOKIE, cookie)], Json(outcome)).into_response())
}

pub async fn logout() -> Response {
    (StatusCode::NO_CONTENT, [(header::SET_COOKIE, cleared_session_cookie())]).into_response()
}
