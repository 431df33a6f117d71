//! Authentication middleware
//!
//! Bearer-token authentication for the HTTP API. Tokens are HS256 JWTs whose
//! `sub` claim is the user id; the RSVP and event management endpoints only
//! ever see the resulting [`AuthUser`].

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::config::AuthConfig;
use crate::utils::errors::{EventHubError, Result};

/// JWT claims carried by API tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// Token verifier; tokens are issued by the identity provider
#[derive(Clone)]
pub struct AuthMiddleware {
    decoding: Arc<DecodingKey>,
    validation: Validation,
}

impl AuthMiddleware {
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.leeway_seconds;

        Self {
            decoding: Arc::new(DecodingKey::from_secret(secret)),
            validation,
        }
    }

    /// Verify a token and return the user it was issued to
    pub fn verify_token(&self, token: &str) -> Result<Uuid> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            debug!(error = %e, "Token verification failed");
            EventHubError::Authentication("Token is not valid".to_string())
        })?;

        Ok(data.claims.sub)
    }

    /// Verify an `Authorization` header value of the form `Bearer <token>`
    pub fn authenticate_header(&self, header: Option<&str>) -> Result<Uuid> {
        let header = header.ok_or_else(|| {
            EventHubError::Authentication("No token, authorization denied".to_string())
        })?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                EventHubError::Authentication(
                    "Invalid authorization format, expected 'Bearer <token>'".to_string(),
                )
            })?;

        self.verify_token(token)
    }
}

/// The authenticated caller of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AuthMiddleware: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let auth = AuthMiddleware::from_ref(state);
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        match auth.authenticate_header(header) {
            Ok(user_id) => Ok(Self { user_id }),
            Err(error) => {
                warn!(path = %parts.uri.path(), error = %error, "Rejected unauthenticated request");
                Err(error.into())
            }
        }
    }
}
