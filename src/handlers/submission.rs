// src/handlers/submission.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    db::{quizzes, submissions},
    error::AppError,
    models::submission::SubmissionSummary,
    store::Store,
    utils::jwt::Claims,
};

/// The caller's submissions, newest first.
#[utoipa::path(
    get,
    path = "/api/submissions/mine",
    responses((status = OK, body = Vec<SubmissionSummary>)),
    tag = "submissions",
    security(("token" = []))
)]
pub async fn list_my_submissions(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let submissions = submissions::list_by_user(store.as_ref(), claims.user_id()).await?;
    let summaries: Vec<SubmissionSummary> = submissions.iter().map(SubmissionSummary::from).collect();
    Ok(Json(summaries))
}

/// Full result for the submitter or the quiz author.
#[utoipa::path(
    get,
    path = "/api/submissions/{id}",
    params(("id" = String, Path, description = "Submission id")),
    responses(
        (status = OK, description = "Answers, score and per-question results"),
        (status = FORBIDDEN, description = "submission/not-owner"),
        (status = NOT_FOUND, description = "No such submission"),
    ),
    tag = "submissions",
    security(("token" = []))
)]
pub async fn get_submission(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let submission = submissions::require_submission(store.as_ref(), &id).await?;

    if submission.data.user_id != claims.user_id() {
        let is_author = quizzes::get_quiz(store.as_ref(), &submission.data.quiz_id)
            .await?
            .is_some_and(|quiz| quiz.data.is_owned_by(claims.user_id()));
        if !is_author {
            return Err(AppError::Forbidden {
                code: "submission/not-owner",
                message: "You can only view your own results.".to_string(),
            });
        }
    }

    Ok(Json(submission))
}
