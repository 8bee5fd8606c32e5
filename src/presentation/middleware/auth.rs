//! Authentication Middleware
//!
//! JWT validation middleware for protected routes. Tokens are issued by
//! the platform identity service; this subsystem only verifies them. The
//! credential is taken from the Authorization header first, then from the
//! `accessToken` cookie browsers attach on same-site requests.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;
use crate::startup::AppState;

/// Cookie carrying the access token on browser connections.
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
}

/// Authenticated user extension
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
}

/// Decode and validate a token, returning the carried user ID.
///
/// Shared by the HTTP middleware and the WebSocket handshake.
pub fn authenticate_token(token: &str, secret: &str) -> Result<i64, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            AppError::Unauthorized("Token expired".into())
        }
        _ => AppError::Unauthorized("Invalid token".into()),
    })?;

    token_data
        .claims
        .sub
        .parse()
        .map_err(|_| AppError::Unauthorized("Invalid token claims".into()))
}

/// Extract the bearer credential from a request: Authorization header
/// first, then the `accessToken` cookie.
fn extract_token(request: &Request) -> Option<String> {
    if let Some(header) = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        if let Some(token) = header.strip_prefix("Bearer ") {
            return Some(token.to_string());
        }
    }

    CookieJar::from_headers(request.headers())
        .get(ACCESS_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(&request)
        .ok_or_else(|| AppError::Unauthorized("Missing credentials".into()))?;

    let user_id = authenticate_token(&token, &state.settings.jwt.secret)?;

    // Insert authenticated user into request extensions
    request.extensions_mut().insert(AuthUser { user_id });

    // Continue to the next handler
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    use super::*;

    const SECRET: &str = "unit-test-secret-of-sufficient-length!";

    fn token_with(sub: &str, iat: i64, exp: i64) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            exp,
            iat,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_token_resolves_user_id() {
        let now = Utc::now().timestamp();
        let token = token_with("42", now, now + 900);

        assert_eq!(authenticate_token(&token, SECRET).unwrap(), 42);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let now = Utc::now().timestamp();
        // Past the default validation leeway
        let token = token_with("42", now - 7200, now - 3600);

        let result = authenticate_token(&token, SECRET);
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        let result = authenticate_token("not-a-jwt", SECRET);
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_non_numeric_subject_is_rejected() {
        let now = Utc::now().timestamp();
        let token = token_with("alice", now, now + 900);

        let result = authenticate_token(&token, SECRET);
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }
}
