/**
 * Authentication Middleware
 *
 * Protects the API routes: extracts and verifies the bearer token from the
 * Authorization header and attaches the authenticated user id to the
 * request, where the `AuthUser` extractor picks it up. Profile data (org,
 * roles) is resolved per-handler through the directory, not here.
 */

use axum::{
    extract::Request,
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::backend::auth::sessions::verify_token;
use crate::backend::error::ApiError;

/// Authenticated caller, extracted from the verified JWT
#[derive(Clone, Copy, Debug)]
pub struct AuthUser {
    pub id: Uuid,
}

/// Authentication middleware
///
/// This middleware:
/// 1. Extracts the JWT from the Authorization header
/// 2. Verifies the token
/// 3. Attaches [`AuthUser`] to request extensions for use in handlers
///
/// Returns 401 Unauthorized if the token is missing or invalid
pub async fn auth_middleware(mut request: Request, next: Next) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("Missing Authorization header");
            ApiError::unauthorized("missing Authorization header")
        })?;

    // Format: "Bearer <token>"
    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        tracing::warn!("Invalid Authorization header format");
        ApiError::unauthorized("expected a bearer token")
    })?;

    let claims = verify_token(token).map_err(|e| {
        tracing::warn!("Invalid token: {:?}", e);
        ApiError::unauthorized("invalid token")
    })?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|e| {
        tracing::warn!("Invalid user ID in token: {:?}", e);
        ApiError::unauthorized("invalid token subject")
    })?;

    request.extensions_mut().insert(AuthUser { id: user_id });

    Ok(next.run(request).await)
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<AuthUser>().copied().ok_or_else(|| {
            tracing::warn!("AuthUser not found in request extensions");
            ApiError::unauthorized("authentication required")
        })
    }
}
