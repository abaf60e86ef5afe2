// src/db/users.rs

//! Profiles are keyed by user id, credentials by normalized email.

use serde_json::json;

use crate::{
    error::{AppError, AuthErrorCode},
    models::{
        Stored,
        collections::{CREDENTIALS, USERS},
        user::{Credential, UserProfile},
    },
    store::{DocumentStore, StoreErrorCode, to_object},
};

pub async fn create_profile(
    store: &dyn DocumentStore,
    id: &str,
    profile: &UserProfile,
) -> Result<Stored<UserProfile>, AppError> {
    store.create_with_id(USERS, id, to_object(profile)?).await?;
    require_profile(store, id).await
}

pub async fn require_profile(
    store: &dyn DocumentStore,
    id: &str,
) -> Result<Stored<UserProfile>, AppError> {
    let doc = store
        .get(USERS, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Stored::try_from(doc)?)
}

/// Display name is the only profile field users may change.
pub async fn update_display_name(
    store: &dyn DocumentStore,
    id: &str,
    display_name: &str,
) -> Result<Stored<UserProfile>, AppError> {
    store
        .update(USERS, id, json!({ "displayName": display_name }))
        .await?;
    require_profile(store, id).await
}

pub async fn find_credential(
    store: &dyn DocumentStore,
    email: &str,
) -> Result<Option<Credential>, AppError> {
    match store.get(CREDENTIALS, email).await? {
        Some(doc) => Ok(Some(doc.decode()?)),
        None => Ok(None),
    }
}

/// Claims the credential's email. Exactly one of several concurrent claims wins;
/// the others get `auth/email-already-in-use`.
pub async fn create_credential(
    store: &dyn DocumentStore,
    credential: &Credential,
) -> Result<(), AppError> {
    store
        .create_with_id(CREDENTIALS, &credential.email, to_object(credential)?)
        .await
        .map_err(|e| match e.code {
            StoreErrorCode::AlreadyExists => AppError::Auth(AuthErrorCode::EmailAlreadyInUse),
            _ => AppError::from(e),
        })
}

pub async fn delete_credential(store: &dyn DocumentStore, email: &str) -> Result<(), AppError> {
    store.delete(CREDENTIALS, email).await?;
    Ok(())
}
