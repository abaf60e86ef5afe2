// src/handlers/auth.rs

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use validator::{Validate, ValidateEmail};

use crate::{
    config::Config,
    db::users,
    error::{AppError, AuthErrorCode},
    models::{
        Stored,
        user::{Credential, LoginRequest, RegisterRequest, SessionResponse, UserProfile},
    },
    store::Store,
    utils::{
        hash::{hash_password, verify_password},
        html::clean_text,
        jwt::{Claims, sign_jwt},
    },
};

const MIN_PASSWORD_CHARS: usize = 6;

fn session_for(profile: &Stored<UserProfile>, config: &Config) -> Result<SessionResponse, AppError> {
    let token = sign_jwt(
        &profile.id,
        profile.data.role,
        &profile.data.display_name,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(SessionResponse {
        token,
        token_type: "Bearer",
        expires_in: config.jwt_expiration,
        user_id: profile.id.clone(),
        role: profile.data.role,
        display_name: profile.data.display_name.clone(),
    })
}

/// Registers a new teacher or student account.
///
/// Hashes the password using Argon2 and stores it apart from the profile.
/// Returns 201 Created and a session, so the client is signed in right away.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = CREATED, body = SessionResponse, description = "Account created"),
        (status = BAD_REQUEST, description = "auth/invalid-email, auth/weak-password or validation/failed"),
        (status = CONFLICT, description = "auth/email-already-in-use"),
    ),
    tag = "auth"
)]
pub async fn register(
    State(store): State<Store>,
    State(config): State<Config>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = payload.email.trim().to_lowercase();
    if !email.validate_email() {
        return Err(AppError::Auth(AuthErrorCode::InvalidEmail));
    }
    if payload.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AppError::Auth(AuthErrorCode::WeakPassword));
    }
    payload.validate()?;

    if users::find_credential(store.as_ref(), &email).await?.is_some() {
        return Err(AppError::Auth(AuthErrorCode::EmailAlreadyInUse));
    }

    let password_hash = hash_password(&payload.password)?;
    let user_id = uuid::Uuid::new_v4().to_string();

    // The credential insert is the uniqueness check; the profile follows it.
    users::create_credential(
        store.as_ref(),
        &Credential {
            user_id: user_id.clone(),
            email: email.clone(),
            password_hash,
        },
    )
    .await?;

    let profile = match users::create_profile(
        store.as_ref(),
        &user_id,
        &UserProfile {
            role: payload.role,
            display_name: clean_text(payload.display_name.trim()),
            email: email.clone(),
        },
    )
    .await
    {
        Ok(profile) => profile,
        Err(e) => {
            tracing::error!("Failed to create profile for {}: {:?}", email, e);
            if let Err(cleanup) = users::delete_credential(store.as_ref(), &email).await {
                tracing::error!("Failed to release credential {}: {:?}", email, cleanup);
            }
            return Err(e);
        }
    };

    tracing::info!("Registered {:?} account {}", profile.data.role, profile.id);
    Ok((StatusCode::CREATED, Json(session_for(&profile, &config)?)))
}

/// Authenticates a user and returns a JWT token.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = OK, body = SessionResponse, description = "Signed in"),
        (status = UNAUTHORIZED, description = "auth/user-not-found or auth/wrong-password"),
    ),
    tag = "auth"
)]
pub async fn login(
    State(store): State<Store>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let email = payload.email.trim().to_lowercase();
    let credential = users::find_credential(store.as_ref(), &email)
        .await?
        .ok_or(AppError::Auth(AuthErrorCode::UserNotFound))?;

    if !verify_password(&payload.password, &credential.password_hash)? {
        tracing::debug!("Wrong password for {}", credential.user_id);
        return Err(AppError::Auth(AuthErrorCode::WrongPassword));
    }

    let profile = users::require_profile(store.as_ref(), &credential.user_id).await?;
    Ok(Json(session_for(&profile, &config)?))
}

/// Tokens are stateless; the client discards its copy.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = NO_CONTENT, description = "Signed out")),
    tag = "auth",
    security(("token" = []))
)]
pub async fn logout(Extension(claims): Extension<Claims>) -> impl IntoResponse {
    tracing::info!("User {} signed out", claims.user_id());
    StatusCode::NO_CONTENT
}
