//! Authentication boundary
//!
//! Sessions are issued by the hosted auth backend; the gateway only verifies
//! the HS256 session JWT and reads the user id plus the premium flag.
//! Without a configured secret a plain user header is trusted (development).

use crate::config::AuthConfig;
use crate::errors::{AppError, Result};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// User identity available to handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: String,

    /// Premium users bypass the free-trial quota
    pub unlimited: bool,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: i64,

    /// Remaining claims, including provider metadata objects
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl JwtClaims {
    /// Boolean claim looked up at top level, then in `app_metadata` / `user_metadata`
    pub fn flag(&self, name: &str) -> bool {
        let nested = ["app_metadata", "user_metadata"]
            .iter()
            .filter_map(|key| self.extra.get(*key))
            .filter_map(|meta| meta.get(name));

        self.extra
            .get(name)
            .into_iter()
            .chain(nested)
            .any(|value| value.as_bool().unwrap_or(false))
    }
}

/// Verifies session tokens issued by the auth backend
pub struct JwtManager {
    decoding_key: DecodingKey,
}

impl JwtManager {
    /// Create a verifier for the shared HS256 secret
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims> {
        let mut validation = Validation::default();
        // Hosted auth sets `aud`; the signature is what we rely on
        validation.validate_aud = false;

        decode::<JwtClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => AppError::InvalidToken,
            })
    }
}

/// Turns request headers into an `AuthContext`
pub struct AuthVerifier {
    jwt: Option<JwtManager>,
    premium_claim: String,
    user_header: String,
}

impl AuthVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        let jwt = config
            .jwt_secret
            .as_deref()
            .filter(|secret| !secret.is_empty())
            .map(JwtManager::new);

        if jwt.is_none() {
            tracing::warn!(
                header = %config.user_header,
                "No JWT secret configured, trusting user header"
            );
        }

        Self {
            jwt,
            premium_claim: config.premium_claim.clone(),
            user_header: config.user_header.to_ascii_lowercase(),
        }
    }

    pub fn authenticate(&self, parts: &Parts) -> Result<AuthContext> {
        match &self.jwt {
            Some(jwt) => {
                let header = parts
                    .headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| AppError::Unauthorized {
                        message: "Missing Authorization header".to_string(),
                    })?;
                let token = extract_bearer(header).ok_or(AppError::InvalidToken)?;
                let claims = jwt.validate_token(token)?;

                Ok(AuthContext {
                    unlimited: claims.flag(&self.premium_claim),
                    user_id: claims.sub,
                })
            }
            None => {
                let user_id = parts
                    .headers
                    .get(self.user_header.as_str())
                    .and_then(|v| v.to_str().ok())
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .ok_or_else(|| AppError::Unauthorized {
                        message: format!("Missing {} header", self.user_header),
                    })?;

                Ok(AuthContext {
                    user_id: user_id.to_string(),
                    unlimited: false,
                })
            }
        }
    }
}

/// Extract the token from a `Bearer` Authorization header
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Axum extractor for AuthContext
impl<S> FromRequestParts<S> for AuthContext
where
    Arc<AuthVerifier>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let verifier = Arc::<AuthVerifier>::from_ref(state);
        verifier.authenticate(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    /// Session token as the auth backend would issue it
    fn issue(secret: &str, user_id: &str, ttl_secs: i64, extra: HashMap<String, Value>) -> String {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: user_id.to_string(),
            exp: (now + Duration::seconds(ttl_secs)).timestamp(),
            iat: now.timestamp(),
            extra,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/v1/quota");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn config(secret: Option<&str>) -> AuthConfig {
        AuthConfig {
            jwt_secret: secret.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer("Bearer   "), None);
        assert_eq!(extract_bearer("Basic abc"), None);
    }

    #[test]
    fn test_jwt_roundtrip_with_premium_flag() {
        let manager = JwtManager::new("test_secret");
        let mut extra = HashMap::new();
        extra.insert(
            "app_metadata".to_string(),
            serde_json::json!({ "is_premium": true }),
        );

        let token = issue("test_secret", "user-1", 3600, extra);
        let claims = manager.validate_token(&token).unwrap();

        assert_eq!(claims.sub, "user-1");
        assert!(claims.flag("is_premium"));
        assert!(!claims.flag("is_admin"));
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = issue("test_secret", "user-1", -3600, HashMap::new());
        let err = JwtManager::new("test_secret").validate_token(&token).unwrap_err();
        assert!(matches!(err, AppError::ExpiredToken));
    }

    #[test]
    fn test_verifier_with_secret() {
        let verifier = AuthVerifier::new(&config(Some("s3cret")));
        let token = issue("s3cret", "user-7", 60, HashMap::new());

        let ctx = verifier
            .authenticate(&parts(&[("authorization", &format!("Bearer {}", token))]))
            .unwrap();
        assert_eq!(ctx, AuthContext { user_id: "user-7".into(), unlimited: false });

        let err = verifier.authenticate(&parts(&[("x-user-id", "spoof")])).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized { .. }));

        let forged = issue("other", "user-7", 60, HashMap::new());
        let err = verifier
            .authenticate(&parts(&[("authorization", &format!("Bearer {}", forged))]))
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }

    #[test]
    fn test_verifier_header_fallback() {
        let verifier = AuthVerifier::new(&config(None));
        let ctx = verifier.authenticate(&parts(&[("X-User-Id", "dev")])).unwrap();
        assert_eq!(ctx.user_id, "dev");
        assert!(!ctx.unlimited);

        assert!(verifier.authenticate(&parts(&[])).is_err());
    }
}
