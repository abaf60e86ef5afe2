// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::{
    ai::AiError,
    store::{StoreError, StoreErrorCode},
};

/// Message shown for anything not covered by the lookup tables in release builds.
pub const GENERIC_MESSAGE: &str = "Something went wrong. Please try again.";

/// Identity failures, keyed the same way the client translates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorCode {
    UserNotFound,
    WrongPassword,
    EmailAlreadyInUse,
    InvalidEmail,
    WeakPassword,
    MissingToken,
    InvalidToken,
    InsufficientRole,
}

impl AuthErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthErrorCode::UserNotFound => "auth/user-not-found",
            AuthErrorCode::WrongPassword => "auth/wrong-password",
            AuthErrorCode::EmailAlreadyInUse => "auth/email-already-in-use",
            AuthErrorCode::InvalidEmail => "auth/invalid-email",
            AuthErrorCode::WeakPassword => "auth/weak-password",
            AuthErrorCode::MissingToken => "auth/missing-token",
            AuthErrorCode::InvalidToken => "auth/invalid-token",
            AuthErrorCode::InsufficientRole => "auth/insufficient-role",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AuthErrorCode::EmailAlreadyInUse => StatusCode::CONFLICT,
            AuthErrorCode::InvalidEmail | AuthErrorCode::WeakPassword => StatusCode::BAD_REQUEST,
            AuthErrorCode::InsufficientRole => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

/// Fixed translation table for identity error codes.
pub fn auth_message(code: AuthErrorCode) -> &'static str {
    match code {
        AuthErrorCode::UserNotFound => "No account found with this email.",
        AuthErrorCode::WrongPassword => "Incorrect password. Please try again.",
        AuthErrorCode::EmailAlreadyInUse => "An account with this email already exists.",
        AuthErrorCode::InvalidEmail => "Please enter a valid email address.",
        AuthErrorCode::WeakPassword => "Password should be at least 6 characters.",
        AuthErrorCode::MissingToken => "Please sign in to continue.",
        AuthErrorCode::InvalidToken => "Your session has expired. Please sign in again.",
        AuthErrorCode::InsufficientRole => "You don't have permission to perform this action.",
    }
}

/// Fixed translation table for document store error codes.
pub fn store_message(code: StoreErrorCode) -> &'static str {
    match code {
        StoreErrorCode::NotFound => "The requested item could not be found.",
        StoreErrorCode::AlreadyExists => "This item already exists.",
        StoreErrorCode::InvalidArgument => "The data provided is invalid.",
        StoreErrorCode::Unavailable => "The service is temporarily unavailable. Please try again.",
        StoreErrorCode::Internal => GENERIC_MESSAGE,
    }
}

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 400 Bad Request, domain invariant or DTO validation failed
    Validation(String),

    // 401 / 403 / 409 depending on the code
    Auth(AuthErrorCode),

    // 403 Forbidden with a domain code such as `quiz/not-owner`
    Forbidden { code: &'static str, message: String },

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 413 Payload Too Large
    PayloadTooLarge(String),

    // Mapped through `store_message`
    Store(StoreError),

    // Generative-model failures
    Ai(AiError),
}

impl AppError {
    pub fn not_owner(what: &str) -> Self {
        AppError::Forbidden {
            code: "quiz/not-owner",
            message: format!("You can only modify {} you created.", what),
        }
    }

    /// Stable machine-readable code sent to the client.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InternalServerError(_) => "internal/unknown",
            AppError::BadRequest(_) => "request/invalid",
            AppError::Validation(_) => "validation/failed",
            AppError::Auth(code) => code.as_str(),
            AppError::Forbidden { code, .. } => code,
            AppError::NotFound(_) => "resource/not-found",
            AppError::Conflict(_) => "resource/conflict",
            AppError::PayloadTooLarge(_) => "request/too-large",
            AppError::Store(err) => match err.code {
                StoreErrorCode::NotFound => "store/not-found",
                StoreErrorCode::AlreadyExists => "store/already-exists",
                StoreErrorCode::InvalidArgument => "store/invalid-argument",
                StoreErrorCode::Unavailable => "store/unavailable",
                StoreErrorCode::Internal => "store/internal",
            },
            AppError::Ai(err) => err.code(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(code) => code.status(),
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Store(err) => match err.code {
                StoreErrorCode::NotFound => StatusCode::NOT_FOUND,
                StoreErrorCode::AlreadyExists => StatusCode::CONFLICT,
                StoreErrorCode::InvalidArgument => StatusCode::BAD_REQUEST,
                StoreErrorCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
                StoreErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Ai(err) => err.status(),
        }
    }

    /// User-facing message and optional developer detail.
    fn message_and_detail(&self) -> (String, Option<String>) {
        match self {
            AppError::InternalServerError(msg) => {
                if cfg!(debug_assertions) {
                    (msg.clone(), None)
                } else {
                    (GENERIC_MESSAGE.to_string(), None)
                }
            }
            AppError::BadRequest(msg)
            | AppError::Validation(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::PayloadTooLarge(msg) => (msg.clone(), None),
            AppError::Auth(code) => (auth_message(*code).to_string(), None),
            AppError::Forbidden { message, .. } => (message.clone(), None),
            AppError::Store(err) => (
                store_message(err.code).to_string(),
                Some(err.message.clone()),
            ),
            AppError::Ai(err) => (err.user_message().to_string(), Some(err.to_string())),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into `{"error": {code, message, detail?}}` with the matching status.
/// `detail` is only exposed in debug builds.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}: {}", self.code(), self);
        }

        let (message, detail) = self.message_and_detail();
        let mut error = json!({
            "code": self.code(),
            "message": message,
        });
        if cfg!(debug_assertions) {
            if let Some(detail) = detail {
                error["detail"] = json!(detail);
            }
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err)
    }
}

impl From<AiError> for AppError {
    fn from(err: AiError) -> Self {
        AppError::Ai(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_codes_map_to_status() {
        let err = AppError::from(StoreError::not_found("quizzes", "q1"));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "store/not-found");

        let err = AppError::from(StoreError::new(StoreErrorCode::Unavailable, "down"));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            err.message_and_detail().0,
            "The service is temporarily unavailable. Please try again."
        );
    }

    #[test]
    fn test_auth_codes_use_lookup_table() {
        let err = AppError::Auth(AuthErrorCode::WrongPassword);
        assert_eq!(err.code(), "auth/wrong-password");
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.message_and_detail().0, "Incorrect password. Please try again.");

        let err = AppError::Auth(AuthErrorCode::EmailAlreadyInUse);
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let err = AppError::Auth(AuthErrorCode::InsufficientRole);
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_not_owner_is_forbidden() {
        let err = AppError::not_owner("quizzes");
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.code(), "quiz/not-owner");
    }

    #[test]
    fn test_internal_error_message_in_debug() {
        let err = AppError::InternalServerError("boom".to_string());
        assert_eq!(err.code(), "internal/unknown");
        // Tests build with debug assertions, so the raw message is surfaced.
        assert_eq!(err.message_and_detail().0, "boom");
    }
}
