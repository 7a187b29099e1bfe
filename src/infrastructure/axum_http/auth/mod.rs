use std::sync::Arc;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::{
    domain::value_objects::iam::Requester, infrastructure::axum_http::error_responses::AppError,
};

pub const STAFF_ROLE: &str = "staff";

/// Claims of the access token minted by the identity service.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub role: String,
    pub email: Option<String>,
    pub exp: usize,
}

/// HS256 secret shared with the identity service, carried as a request extension.
#[derive(Clone)]
pub struct JwtSecret(pub Arc<str>);

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: String,
}

impl AuthUser {
    pub fn is_staff(&self) -> bool {
        self.role == STAFF_ROLE
    }

    pub fn requester(&self) -> Requester {
        Requester {
            user_id: self.user_id,
            email: self.email.clone(),
            is_staff: self.is_staff(),
        }
    }

    pub fn require_staff(&self) -> Result<(), AppError> {
        if self.is_staff() {
            Ok(())
        } else {
            warn!(user_id = %self.user_id, role = %self.role, "auth: staff-only action refused");
            Err(AppError::Forbidden)
        }
    }
}

pub fn validate_access_token(token: &str, secret: &str) -> anyhow::Result<AccessClaims> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_aud = false;

    let token_data = decode::<AccessClaims>(token, &decoding_key, &validation)
        .map_err(|e| anyhow::anyhow!("JWT validation failed: {}", e))?;

    Ok(token_data.claims)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let secret = parts
            .extensions
            .get::<JwtSecret>()
            .cloned()
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("JWT secret extension missing")))?;

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|err| {
                    warn!(reason = %err, "auth: missing or malformed bearer token");
                    AppError::Unauthorized
                })?;

        let claims = validate_access_token(bearer.token(), &secret.0).map_err(|err| {
            warn!(reason = %err, "auth: token rejected");
            AppError::Unauthorized
        })?;

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| {
            warn!(sub = %claims.sub, "auth: subject is not a user id");
            AppError::Unauthorized
        })?;

        Ok(AuthUser {
            user_id,
            email: claims.email.unwrap_or_default(),
            role: claims.role,
        })
    }
}
