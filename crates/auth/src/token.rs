//! Token Manager: issue and verify signed identity tokens.
//!
//! Tokens are compact JWS strings (`header.payload.signature`) signed with a
//! shared HMAC secret. Verification is staged so that the failure kind is
//! stable: shape first, then signature, then claim decoding, then the time
//! window.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::{validate_claims, Identity, Role, TokenClaims};

const HMAC_FAMILY: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Issues and verifies tokens for one shared secret and lifetime.
#[derive(Clone)]
pub struct TokenManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl core::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenManager")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenManager {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Expiry a token issued at `now` will carry (second granularity).
    pub fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let iat = now.timestamp();
        DateTime::from_timestamp(iat.saturating_add(self.ttl_secs()), 0)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn ttl_secs(&self) -> i64 {
        i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX)
    }

    pub fn issue(&self, username: &str, role: Role, now: DateTime<Utc>) -> Result<String, TokenError> {
        let iat = now.timestamp();
        let claims = TokenClaims {
            username: username.to_string(),
            role,
            iat,
            exp: iat.saturating_add(self.ttl_secs()),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify `token` and return the identity it carries.
    ///
    /// The role is taken from the token as-is.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, TokenError> {
        let result = self.verify_claims(token, now).map(|c| c.identity());
        if let Err(err) = &result {
            tracing::debug!(error = %err, "token rejected");
        }
        result
    }

    fn verify_claims(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let (message, signature) = split_compact(token)?;

        // An unreadable header still gets a signature check so that any
        // tampering surfaces as a signature failure.
        let alg = match jsonwebtoken::decode_header(token) {
            Ok(header) if HMAC_FAMILY.contains(&header.alg) => header.alg,
            Ok(_) => return Err(TokenError::InvalidSignature),
            Err(_) => Algorithm::HS256,
        };

        let verified = jsonwebtoken::crypto::verify(signature, message.as_bytes(), &self.decoding, alg)
            .unwrap_or(false);
        if !verified {
            return Err(TokenError::InvalidSignature);
        }

        let mut validation = Validation::new(alg);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding, &validation)
            .map_err(|e| TokenError::Malformed(e.to_string()))?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

/// Split into (`header.payload`, `signature`), rejecting anything that is not
/// exactly three non-empty segments.
fn split_compact(token: &str) -> Result<(&str, &str), TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(TokenError::Malformed(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    }
    if segments.iter().any(|s| s.is_empty()) {
        return Err(TokenError::Malformed("empty segment".to_string()));
    }

    let (message, signature) = token
        .rsplit_once('.')
        .ok_or_else(|| TokenError::Malformed("missing signature".to_string()))?;
    Ok((message, signature))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use proptest::prelude::*;
    use proptest::sample::Index;
    use serde::Serialize;

    const SECRET: &[u8] = b"unit-test-secret";
    const B64URL: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

    fn manager() -> TokenManager {
        TokenManager::new(SECRET, Duration::from_secs(3600))
    }

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn round_trip_returns_identity() {
        let tm = manager();
        let token = tm.issue("alice", Role::Manager, t0()).unwrap();

        let identity = tm.verify(&token, t0() + TimeDelta::seconds(10)).unwrap();
        assert_eq!(identity, Identity::new("alice", Role::Manager));
    }

    #[test]
    fn expires_exactly_at_ttl() {
        let tm = manager();
        let token = tm.issue("alice", Role::Viewer, t0()).unwrap();

        assert!(tm.verify(&token, t0() + TimeDelta::seconds(3599)).is_ok());
        assert_eq!(tm.verify(&token, t0() + TimeDelta::seconds(3600)), Err(TokenError::Expired));
        assert_eq!(tm.verify(&token, t0() + TimeDelta::days(30)), Err(TokenError::Expired));
        assert_eq!(tm.expires_at(t0()), t0() + TimeDelta::seconds(3600));
    }

    #[test]
    fn not_yet_valid_before_issue() {
        let tm = manager();
        let token = tm.issue("alice", Role::Viewer, t0()).unwrap();
        assert_eq!(tm.verify(&token, t0() - TimeDelta::seconds(1)), Err(TokenError::NotYetValid));
    }

    #[test]
    fn zero_ttl_is_an_invalid_window() {
        let tm = TokenManager::new(SECRET, Duration::ZERO);
        let token = tm.issue("alice", Role::Viewer, t0()).unwrap();
        assert_eq!(tm.verify(&token, t0()), Err(TokenError::InvalidTimeWindow));
    }

    #[test]
    fn other_secret_is_rejected() {
        let token = manager().issue("alice", Role::Admin, t0()).unwrap();
        let other = TokenManager::new(b"someone-else", Duration::from_secs(3600));
        assert_eq!(other.verify(&token, t0()), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn wrong_shape_is_malformed() {
        let tm = manager();
        for token in ["", "abc", "a.b", "a.b.c.d", "a..c", ".b.c", "a.b."] {
            assert!(
                matches!(tm.verify(token, t0()), Err(TokenError::Malformed(_))),
                "{token:?}"
            );
        }
    }

    #[test]
    fn non_hmac_algorithms_are_rejected() {
        let tm = manager();
        let token = tm.issue("alice", Role::Admin, t0()).unwrap();
        let (_, rest) = token.split_once('.').unwrap();

        // {"alg":"none","typ":"JWT"} and {"alg":"RS256","typ":"JWT"}
        for header in ["eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0", "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9"] {
            let forged = format!("{header}.{rest}");
            assert_eq!(tm.verify(&forged, t0()), Err(TokenError::InvalidSignature));
        }
    }

    #[test]
    fn signed_but_undecodable_claims_are_malformed() {
        #[derive(Serialize)]
        struct Partial<'a> {
            username: &'a str,
            iat: i64,
        }

        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &Partial { username: "alice", iat: t0().timestamp() },
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert!(matches!(manager().verify(&token, t0()), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn debug_output_hides_the_secret() {
        let rendered = format!("{:?}", manager());
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("unit-test-secret"));
    }

    proptest! {
        #[test]
        fn any_single_byte_tamper_breaks_the_signature(pos in any::<Index>(), pick in any::<Index>()) {
            let tm = manager();
            let token = tm.issue("bob", Role::Manager, t0()).unwrap();

            let positions: Vec<usize> = token
                .char_indices()
                .filter(|(_, c)| *c != '.')
                .map(|(i, _)| i)
                .collect();
            let at = positions[pos.index(positions.len())];

            let original = token.as_bytes()[at];
            let mut replacement = B64URL[pick.index(B64URL.len())];
            if replacement == original {
                replacement = B64URL[(pick.index(B64URL.len()) + 1) % B64URL.len()];
            }

            let mut bytes = token.into_bytes();
            bytes[at] = replacement;
            let tampered = String::from_utf8(bytes).unwrap();

            prop_assert_eq!(tm.verify(&tampered, t0()), Err(TokenError::InvalidSignature));
        }
    }
}
