//! Request-wide middleware: per-request scope and the auth gate.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

use warehouse_auth::TokenManager;
use warehouse_core::{CancelHandle, Clock, RequestScope};

use crate::app::errors::ApiError;
use crate::context::IdentityContext;

/// Name of the cookie carrying the session token.
pub const TOKEN_COOKIE: &str = "token";

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
pub struct ScopeState {
    pub request_timeout: Duration,
}

/// Attach a [`RequestScope`] (cancellation + deadline) and a request id span.
///
/// The scope is cancelled once this middleware finishes or is dropped, which
/// happens when the client goes away mid-request.
pub async fn request_scope(State(state): State<ScopeState>, mut req: Request, next: Next) -> Response {
    let (handle, scope) = RequestScope::new();
    let _cancel_on_exit = CancelOnDrop(handle);

    let request_id = Uuid::now_v7();
    let span = tracing::info_span!(
        "request",
        %request_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    req.extensions_mut().insert(scope.with_timeout(state.request_timeout));

    let mut response = next.run(req).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

struct CancelOnDrop(CancelHandle);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<TokenManager>,
    pub clock: Arc<dyn Clock>,
}

/// Resolve the caller's identity from a bearer header or the session cookie.
///
/// Rejections never reach the downstream handler.
pub async fn auth_gate(State(state): State<AuthState>, mut req: Request, next: Next) -> Result<Response, ApiError> {
    let identity = {
        let token = extract_token(req.headers())?;
        state.tokens.verify(token, state.clock.now()).map_err(|e| {
            tracing::debug!(error = %e, "auth gate rejected token");
            ApiError::Unauthorized
        })?
    };

    req.extensions_mut().insert(IdentityContext::new(identity));
    Ok(next.run(req).await)
}

/// The `Authorization` header wins over the cookie. A header that is present
/// but not a usable bearer credential is rejected outright.
fn extract_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    if let Some(header) = headers.get(header::AUTHORIZATION) {
        let header = header.to_str().map_err(|_| ApiError::Unauthorized)?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| {
                tracing::debug!("auth gate rejected non-bearer authorization header");
                ApiError::Unauthorized
            })?
            .trim();
        if token.is_empty() {
            return Err(ApiError::Unauthorized);
        }
        return Ok(token);
    }

    token_cookie(headers).ok_or_else(|| {
        tracing::debug!("auth gate found no credential");
        ApiError::Unauthorized
    })
}

fn token_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == TOKEN_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value carrying a fresh session token.
pub fn session_cookie(token: &str, max_age: Duration) -> String {
    format!(
        "{TOKEN_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        max_age.as_secs()
    )
}

/// `Set-Cookie` value that clears the session token.
pub fn cleared_session_cookie() -> String {
    format!("{TOKEN_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn bearer_header_is_used() {
        let h = headers(&[(header::AUTHORIZATION, "Bearer abc.def.ghi")]);
        assert_eq!(extract_token(&h).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn header_wins_over_cookie() {
        let h = headers(&[
            (header::AUTHORIZATION, "Bearer from-header"),
            (header::COOKIE, "token=from-cookie"),
        ]);
        assert_eq!(extract_token(&h).unwrap(), "from-header");
    }

    #[test]
    fn cookie_is_the_fallback() {
        let h = headers(&[(header::COOKIE, "theme=dark; token=from-cookie; lang=en")]);
        assert_eq!(extract_token(&h).unwrap(), "from-cookie");
    }

    #[test]
    fn malformed_header_does_not_fall_back_to_cookie() {
        let h = headers(&[
            (header::AUTHORIZATION, "Basic dXNlcjpwdw=="),
            (header::COOKIE, "token=from-cookie"),
        ]);
        assert_eq!(extract_token(&h), Err(ApiError::Unauthorized));

        let h = headers(&[(header::AUTHORIZATION, "Bearer   ")]);
        assert_eq!(extract_token(&h), Err(ApiError::Unauthorized));
    }

    #[test]
    fn missing_credential_is_unauthorized() {
        assert_eq!(extract_token(&HeaderMap::new()), Err(ApiError::Unauthorized));
        let h = headers(&[(header::COOKIE, "token=")]);
        assert_eq!(extract_token(&h), Err(ApiError::Unauthorized));
    }

    #[test]
    fn session_cookie_shape() {
        let cookie = session_cookie("abc", Duration::from_secs(60));
        assert_eq!(cookie, "token=abc; Path=/; HttpOnly; SameSite=Lax; Max-Age=60");
        assert!(cleared_session_cookie().ends_with("Max-Age=0"));
    }
}
