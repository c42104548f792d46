use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::{validate_jwt, Claims};
use crate::error::ApiError;

/// Authenticated user context extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub idx: i64,
    pub rank: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            idx: claims.idx,
            rank: claims.rank,
        }
    }
}

/// JWT authentication middleware that validates tokens and extracts user context
pub async fn jwt_auth_middleware(headers: HeaderMap, mut request: Request, next: Next) -> Response {
    // Extract JWT from Authorization header
    let token = match extract_jwt_from_headers(&headers) {
        Ok(token) => token,
        Err(msg) => {
            tracing::warn!("Rejected {} {}: {}", request.method(), request.uri().path(), msg);
            return ApiError::unauthorized(msg).into_response();
        }
    };

    // Validate and decode JWT
    let claims = match validate_jwt(&token) {
        Ok(claims) => claims,
        Err(err) => {
            tracing::warn!("Rejected {} {}: {}", request.method(), request.uri().path(), err);
            return ApiError::from(err).into_response();
        }
    };

    // Convert claims to AuthUser and inject into request
    request.extensions_mut().insert(AuthUser::from(claims));

    next.run(request).await
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}
