// src/handlers/profile.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use validator::Validate;

use crate::{
    db::users,
    error::AppError,
    models::user::UpdateProfileRequest,
    store::Store,
    utils::{html::clean_text, jwt::Claims},
};

/// Get current user's profile.
#[utoipa::path(
    get,
    path = "/api/profile",
    responses(
        (status = OK, description = "id, role, displayName, email and timestamps"),
        (status = NOT_FOUND, description = "Profile missing"),
    ),
    tag = "profile",
    security(("token" = []))
)]
pub async fn get_profile(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let profile = users::require_profile(store.as_ref(), claims.user_id()).await?;
    Ok(Json(profile))
}

/// Change the display name. Email and role are fixed at registration.
///
/// Tokens issued earlier keep the old name until the next sign-in.
#[utoipa::path(
    patch,
    path = "/api/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = OK, description = "Updated profile"),
        (status = BAD_REQUEST, description = "validation/failed"),
    ),
    tag = "profile",
    security(("token" = []))
)]
pub async fn update_profile(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let display_name = clean_text(payload.display_name.trim());
    if display_name.is_empty() {
        return Err(AppError::Validation("Display name cannot be blank.".to_string()));
    }

    let profile = users::update_display_name(store.as_ref(), claims.user_id(), &display_name)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update profile {}: {:?}", claims.user_id(), e);
            e
        })?;

    Ok(Json(profile))
}
