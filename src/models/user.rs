// src/models/user.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Authorization tier: teachers author quizzes, students take them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Teacher,
    Student,
}

/// Represents a document in the `users` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub role: Role,
    pub display_name: String,
    pub email: String,
}

/// Represents a document in the `credentials` collection.
/// Kept apart from the profile so the hash never rides along with profile reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub user_id: String,
    /// Lower-cased.
    pub email: String,
    /// Argon2 password hash.
    pub password_hash: String,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email, length(max = 254))]
    pub email: String,
    #[validate(length(max = 128))]
    pub password: String,
    #[validate(length(
        min = 1,
        max = 100,
        message = "Display name must be between 1 and 100 characters."
    ))]
    pub display_name: String,
    pub role: Role,
}

/// DTO for user login.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// DTO for profile changes. Only the display name is editable.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Display name must be between 1 and 100 characters."
    ))]
    pub display_name: String,
}

/// Returned by register and login.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub token: String,
    #[serde(rename = "type")]
    pub token_type: &'static str,
    pub expires_in: u64,
    pub user_id: String,
    pub role: Role,
    pub display_name: String,
}
