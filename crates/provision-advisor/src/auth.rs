//! Operator login and bearer-token verification.
//!
//! A single configured operator account exchanges credentials for an HS256 JWT; protected
//! routes accept that token through [`require_bearer`].

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::config::AuthConfig;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("bad credentials")]
    BadCredentials,
    #[error("missing authorization header")]
    MissingToken,
    #[error("authorization header must use the Bearer scheme")]
    InvalidScheme,
    #[error("invalid or expired token")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
    #[error("token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("token lifetime overflows the clock")]
    TokenLifetime,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::Signing(_) | AuthError::TokenLifetime => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// JWT claims carried by operator tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub access_token: String,
}

pub struct Authenticator {
    username: String,
    password: String,
    ttl: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl Authenticator {
    /// Lifetimes beyond what chrono can represent saturate; `login` then refuses to
    /// sign rather than overflow.
    pub fn from_config(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.as_bytes();
        let ttl = i64::try_from(config.token_ttl_minutes)
            .ok()
            .and_then(Duration::try_minutes)
            .unwrap_or(Duration::MAX);
        Self {
            username: config.username.clone(),
            password: config.password.clone(),
            ttl,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    pub fn login(&self, username: &str, password: &str) -> Result<IssuedToken, AuthError> {
        if username != self.username || password != self.password {
            warn!(username, "rejected login");
            return Err(AuthError::BadCredentials);
        }

        let now = Utc::now();
        let expires = now
            .checked_add_signed(self.ttl)
            .ok_or(AuthError::TokenLifetime)?;
        let claims = Claims {
            sub: username.to_string(),
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };
        let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(AuthError::Signing)?;

        debug!(username, "issued access token");
        Ok(IssuedToken { access_token })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(AuthError::InvalidToken)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn extract_bearer(header_value: &str) -> Result<&str, AuthError> {
    match header_value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AuthError::InvalidScheme),
    }
}

/// Middleware rejecting requests without a valid bearer token.
pub async fn require_bearer(
    State(authenticator): State<Arc<Authenticator>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidScheme)?;

    let claims = authenticator.verify(extract_bearer(header_value)?)?;
    debug!(subject = %claims.sub, "authenticated request");
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}
