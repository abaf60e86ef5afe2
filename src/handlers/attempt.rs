// src/handlers/attempt.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    attempts::{AttemptRegistry, AttemptStatus},
    db::{quizzes, submissions::Attempter},
    error::AppError,
    models::submission::SaveAnswersRequest,
    store::Store,
    utils::jwt::Claims,
};

/// Starts a server-held attempt. Timed quizzes submit themselves when the clock runs out.
#[utoipa::path(
    post,
    path = "/api/quizzes/{id}/attempts",
    params(("id" = String, Path, description = "Quiz id")),
    responses(
        (status = CREATED, body = AttemptStatus),
        (status = FORBIDDEN, description = "quiz/not-published"),
    ),
    tag = "attempts",
    security(("token" = []))
)]
pub async fn start_attempt(
    State(store): State<Store>,
    State(attempts): State<AttemptRegistry>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = quizzes::require_quiz(store.as_ref(), &quiz_id).await?;
    let status = attempts.start(store, quiz, Attempter::from(&claims))?;
    Ok((StatusCode::CREATED, Json(status)))
}

#[utoipa::path(
    get,
    path = "/api/attempts/{id}",
    params(("id" = String, Path, description = "Attempt id")),
    responses(
        (status = OK, body = AttemptStatus),
        (status = NOT_FOUND, description = "Unknown, submitted or expired attempt"),
    ),
    tag = "attempts",
    security(("token" = []))
)]
pub async fn attempt_status(
    State(attempts): State<AttemptRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(attempts.status(&id, claims.user_id())?))
}

/// Merges answers into the attempt. Unsent questions keep their saved answer.
#[utoipa::path(
    put,
    path = "/api/attempts/{id}/answers",
    params(("id" = String, Path, description = "Attempt id")),
    request_body = SaveAnswersRequest,
    responses((status = OK, body = AttemptStatus)),
    tag = "attempts",
    security(("token" = []))
)]
pub async fn save_answers(
    State(attempts): State<AttemptRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(payload): Json<SaveAnswersRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    Ok(Json(attempts.save_answers(&id, claims.user_id(), payload.answers)?))
}

#[utoipa::path(
    post,
    path = "/api/attempts/{id}/submit",
    params(("id" = String, Path, description = "Attempt id")),
    responses(
        (status = CREATED, description = "The stored submission"),
        (status = NOT_FOUND, description = "Already submitted, possibly by the timer"),
    ),
    tag = "attempts",
    security(("token" = []))
)]
pub async fn submit_attempt(
    State(store): State<Store>,
    State(attempts): State<AttemptRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let submission = attempts.submit(&store, &id, claims.user_id()).await?;
    Ok((StatusCode::CREATED, Json(submission)))
}

/// Leaves the quiz without submitting.
#[utoipa::path(
    delete,
    path = "/api/attempts/{id}",
    params(("id" = String, Path, description = "Attempt id")),
    responses((status = NO_CONTENT, description = "Attempt dropped")),
    tag = "attempts",
    security(("token" = []))
)]
pub async fn abandon_attempt(
    State(attempts): State<AttemptRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    attempts.abandon(&id, claims.user_id())?;
    Ok(StatusCode::NO_CONTENT)
}
