//! Consistent JSON error responses: `{"error": <code>, "message": <text>}`.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use warehouse_auth::AuthzError;
use warehouse_infra::ServiceError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Conflict(String),

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Storage(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound => "not_found",
            ApiError::Validation(_) => "validation_error",
            ApiError::InvalidCredentials => "invalid_credentials",
            ApiError::Conflict(_) => "conflict",
            ApiError::Storage(_) => "storage_error",
            ApiError::Cancelled => "cancelled",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(value: ServiceError) -> Self {
        match value {
            ServiceError::Forbidden(e) => e.into(),
            ServiceError::Validation(msg) => ApiError::Validation(msg),
            ServiceError::NotFound => ApiError::NotFound,
            ServiceError::InvalidCredentials => ApiError::InvalidCredentials,
            ServiceError::Conflict(msg) => ApiError::Conflict(msg),
            ServiceError::Storage(msg) => ApiError::Storage(msg),
            ServiceError::Cancelled => ApiError::Cancelled,
            ServiceError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(value: AuthzError) -> Self {
        ApiError::Forbidden(value.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        ApiError::Validation(value.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(value: QueryRejection) -> Self {
        ApiError::Validation(value.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Backend details go to the log, not to the client.
        let message = match &self {
            ApiError::Storage(detail) => {
                tracing::error!(%detail, "storage failure");
                "storage failure".to_string()
            }
            ApiError::Internal(detail) => {
                tracing::error!(%detail, "internal error");
                "internal server error".to_string()
            }
            ApiError::Cancelled => {
                tracing::warn!("request cancelled before completion");
                self.to_string()
            }
            other => other.to_string(),
        };
        json_error(self.status(), self.code(), message)
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use warehouse_auth::{Action, Role};

    use super::*;

    #[test]
    fn service_errors_map_to_statuses() {
        let cases = [
            (ServiceError::NotFound, StatusCode::NOT_FOUND, "not_found"),
            (ServiceError::Validation("x".into()), StatusCode::BAD_REQUEST, "validation_error"),
            (ServiceError::InvalidCredentials, StatusCode::UNAUTHORIZED, "invalid_credentials"),
            (ServiceError::Conflict("taken".into()), StatusCode::CONFLICT, "conflict"),
            (ServiceError::Storage("db down".into()), StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            (ServiceError::Cancelled, StatusCode::SERVICE_UNAVAILABLE, "cancelled"),
            (ServiceError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        ];

        for (err, status, code) in cases {
            let api = ApiError::from(err);
            assert_eq!(api.status(), status);
            assert_eq!(api.code(), code);
        }
    }

    #[test]
    fn forbidden_keeps_role_and_action_in_message() {
        let err = ApiError::from(ServiceError::Forbidden(AuthzError::Forbidden {
            role: Role::Viewer,
            action: Action::Delete,
        }));
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.code(), "forbidden");
        assert!(err.to_string().contains("viewer"));
    }

    #[tokio::test]
    async fn storage_detail_is_not_sent_to_clients() {
        let resp = ApiError::Storage("password authentication failed for user pg".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "storage_error");
        assert_eq!(body["message"], "storage failure");
    }
}
