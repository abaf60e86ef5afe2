// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    error::{AppError, AuthErrorCode},
    models::user::Role,
};

/// JWT Claims structure.
///
/// This is the session context: the auth middleware decodes it once per
/// request and hands it to handlers through request extensions.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject - the user id.
    pub sub: String,
    pub role: Role,
    /// Display name at sign-in time.
    pub name: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> &str {
        &self.sub
    }

    pub fn is_teacher(&self) -> bool {
        self.role == Role::Teacher
    }
}

/// Signs a new JWT for the user.
pub fn sign_jwt(
    user_id: &str,
    role: Role,
    name: &str,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize
        + expiration_seconds as usize;

    let claims = Claims {
        sub: user_id.to_owned(),
        role,
        name: name.to_owned(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a JWT string.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!("Rejected token: {}", e);
        AppError::Auth(AuthErrorCode::InvalidToken)
    })?;

    Ok(token_data.claims)
}

/// Axum Middleware: Authentication.
///
/// Validates the 'Authorization: Bearer <token>' header and injects `Claims`
/// into the request extensions for handlers to use.
pub async fn auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) if !token.trim().is_empty() => token.trim(),
        _ => return Err(AppError::Auth(AuthErrorCode::MissingToken)),
    };

    let claims = verify_jwt(token, &config.jwt_secret)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Axum Middleware: Teacher Authorization.
///
/// Must be used AFTER `auth_middleware`. Rejects anyone whose role is not teacher.
pub async fn teacher_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or(AppError::Auth(AuthErrorCode::MissingToken))?;

    if !claims.is_teacher() {
        return Err(AppError::Auth(AuthErrorCode::InsufficientRole));
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify_round_trip() {
        let token = sign_jwt("user-1", Role::Teacher, "Ada", "secret", 60).unwrap();
        let claims = verify_jwt(&token, "secret").unwrap();
        assert_eq!(claims.user_id(), "user-1");
        assert_eq!(claims.role, Role::Teacher);
        assert_eq!(claims.name, "Ada");
        assert!(claims.is_teacher());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = sign_jwt("user-1", Role::Student, "Bob", "secret", 60).unwrap();
        let err = verify_jwt(&token, "other").unwrap_err();
        assert_eq!(err.code(), "auth/invalid-token");
    }
}
