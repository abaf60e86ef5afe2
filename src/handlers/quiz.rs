// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    analytics::{self, QuizStats},
    config::DEFAULT_LIST_LIMIT,
    db::{
        quizzes,
        submissions::{self, Attempter},
    },
    error::AppError,
    models::{
        quiz::{AnswerKey, PublicListParams, PublicQuiz, QuizInput, QuizListParams, QuizSummary, SharingRequest},
        submission::{SubmissionSummary, SubmitAnswersRequest},
    },
    store::Store,
    utils::jwt::Claims,
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizResults {
    pub quiz: QuizSummary,
    pub stats: QuizStats,
    /// Newest first.
    pub submissions: Vec<SubmissionSummary>,
}

/// Creates a quiz owned by the calling teacher.
#[utoipa::path(
    post,
    path = "/api/quizzes",
    request_body = QuizInput,
    responses(
        (status = CREATED, description = "The stored quiz, with id and timestamps"),
        (status = BAD_REQUEST, description = "validation/failed"),
    ),
    tag = "quizzes",
    security(("token" = []))
)]
pub async fn create_quiz(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<QuizInput>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let quiz = payload.into_quiz(claims.user_id());
    let stored = quizzes::save_quiz(store.as_ref(), &quiz).await?;

    Ok((StatusCode::CREATED, Json(stored)))
}

/// Lists the caller's quizzes with status filter, search and sorting.
#[utoipa::path(
    get,
    path = "/api/quizzes/mine",
    params(
        ("status" = Option<String>, Query, description = "all | published | draft"),
        ("sort" = Option<String>, Query, description = "newest | oldest | title | submissions"),
        ("q" = Option<String>, Query, description = "Search in title and description"),
        ("category" = Option<String>, Query, description = "Exact category"),
    ),
    responses((status = OK, body = Vec<QuizSummary>)),
    tag = "quizzes",
    security(("token" = []))
)]
pub async fn list_my_quizzes(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<QuizListParams>,
) -> Result<impl IntoResponse, AppError> {
    let quizzes = quizzes::list_quizzes_by_author(store.as_ref(), claims.user_id())
        .await
        .map_err(|e| {
            tracing::error!("Failed to list quizzes of {}: {:?}", claims.user_id(), e);
            e
        })?;

    let summaries: Vec<QuizSummary> = params.apply(quizzes).iter().map(QuizSummary::from).collect();
    Ok(Json(summaries))
}

/// Public catalogue: published quizzes marked public.
#[utoipa::path(
    get,
    path = "/api/quizzes/public",
    params(
        ("category" = Option<String>, Query, description = "Exact category"),
        ("limit" = Option<usize>, Query, description = "At most 50"),
    ),
    responses((status = OK, body = Vec<QuizSummary>)),
    tag = "quizzes"
)]
pub async fn list_public_quizzes(
    State(store): State<Store>,
    Query(params): Query<PublicListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, DEFAULT_LIST_LIMIT);
    let category = params.category.as_deref().map(str::trim).filter(|c| !c.is_empty());

    let quizzes = quizzes::list_public_quizzes(store.as_ref(), category, limit).await?;
    let summaries: Vec<QuizSummary> = quizzes.iter().map(QuizSummary::from).collect();
    Ok(Json(summaries))
}

/// Full quiz including answers, for its author only.
#[utoipa::path(
    get,
    path = "/api/quizzes/{id}",
    params(("id" = String, Path, description = "Quiz id")),
    responses(
        (status = OK, description = "The stored quiz"),
        (status = FORBIDDEN, description = "quiz/not-owner"),
        (status = NOT_FOUND, description = "No such quiz"),
    ),
    tag = "quizzes",
    security(("token" = []))
)]
pub async fn get_quiz(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = quizzes::get_quiz_for_edit(store.as_ref(), &id, claims.user_id()).await?;
    Ok(Json(quiz))
}

/// Overwrites an owned quiz. The author and the submission counter are kept.
#[utoipa::path(
    put,
    path = "/api/quizzes/{id}",
    params(("id" = String, Path, description = "Quiz id")),
    request_body = QuizInput,
    responses(
        (status = OK, description = "The updated quiz"),
        (status = BAD_REQUEST, description = "validation/failed"),
        (status = FORBIDDEN, description = "quiz/not-owner"),
    ),
    tag = "quizzes",
    security(("token" = []))
)]
pub async fn update_quiz(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(payload): Json<QuizInput>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let quiz = payload.into_quiz(claims.user_id());
    let stored = quizzes::update_quiz(store.as_ref(), &id, claims.user_id(), &quiz).await?;
    Ok(Json(stored))
}

#[utoipa::path(
    delete,
    path = "/api/quizzes/{id}",
    params(("id" = String, Path, description = "Quiz id")),
    responses(
        (status = NO_CONTENT, description = "Deleted; submissions are kept"),
        (status = FORBIDDEN, description = "quiz/not-owner"),
    ),
    tag = "quizzes",
    security(("token" = []))
)]
pub async fn delete_quiz(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    quizzes::delete_quiz(store.as_ref(), &id, claims.user_id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Publishes, unpublishes or changes catalogue visibility.
#[utoipa::path(
    put,
    path = "/api/quizzes/{id}/sharing",
    params(("id" = String, Path, description = "Quiz id")),
    request_body = SharingRequest,
    responses(
        (status = OK, description = "The updated quiz"),
        (status = FORBIDDEN, description = "quiz/not-owner"),
    ),
    tag = "quizzes",
    security(("token" = []))
)]
pub async fn update_sharing(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(payload): Json<SharingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let stored = quizzes::set_sharing(store.as_ref(), &id, claims.user_id(), &payload).await?;
    tracing::info!(
        "Quiz {} sharing: published={}, public={}",
        id,
        stored.data.is_published,
        stored.data.is_public
    );
    Ok(Json(stored))
}

/// The quiz as a taker sees it: no correct answers, no explanations.
#[utoipa::path(
    get,
    path = "/api/quizzes/{id}/take",
    params(("id" = String, Path, description = "Quiz id")),
    responses(
        (status = OK, body = PublicQuiz),
        (status = FORBIDDEN, description = "quiz/not-published"),
    ),
    tag = "quizzes",
    security(("token" = []))
)]
pub async fn take_quiz(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = quizzes::require_quiz(store.as_ref(), &id).await?;
    if !submissions::can_take(&quiz, claims.user_id()) {
        return Err(AppError::Forbidden {
            code: "quiz/not-published",
            message: "This quiz is not accepting submissions.".to_string(),
        });
    }
    Ok(Json(PublicQuiz::from(&quiz)))
}

/// Scores and records answers timed by the client.
#[utoipa::path(
    post,
    path = "/api/quizzes/{id}/submissions",
    params(("id" = String, Path, description = "Quiz id")),
    request_body = SubmitAnswersRequest,
    responses(
        (status = CREATED, description = "The stored submission with score and per-question results"),
        (status = FORBIDDEN, description = "quiz/not-published"),
    ),
    tag = "submissions",
    security(("token" = []))
)]
pub async fn submit_quiz(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(payload): Json<SubmitAnswersRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let quiz = quizzes::require_quiz(store.as_ref(), &id).await?;
    let submission = submissions::submit_answers(
        store.as_ref(),
        &quiz,
        &Attempter::from(&claims),
        payload.answers,
        payload.time_spent,
        false,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(submission)))
}

/// Submissions and aggregate statistics, for the quiz author.
#[utoipa::path(
    get,
    path = "/api/quizzes/{id}/results",
    params(("id" = String, Path, description = "Quiz id")),
    responses(
        (status = OK, body = QuizResults),
        (status = FORBIDDEN, description = "quiz/not-owner"),
    ),
    tag = "quizzes",
    security(("token" = []))
)]
pub async fn quiz_results(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = quizzes::get_quiz_for_edit(store.as_ref(), &id, claims.user_id()).await?;
    let submissions = submissions::list_by_quiz(store.as_ref(), &id).await.map_err(|e| {
        tracing::error!("Failed to list submissions of quiz {}: {:?}", id, e);
        e
    })?;

    Ok(Json(QuizResults {
        quiz: QuizSummary::from(&quiz),
        stats: analytics::summarize(&quiz.data, &submissions),
        submissions: submissions.iter().map(SubmissionSummary::from).collect(),
    }))
}

/// Correct answers, for the author or anyone who has already submitted.
#[utoipa::path(
    get,
    path = "/api/quizzes/{id}/answer-key",
    params(("id" = String, Path, description = "Quiz id")),
    responses(
        (status = OK, body = AnswerKey),
        (status = FORBIDDEN, description = "quiz/answer-key-locked"),
    ),
    tag = "quizzes",
    security(("token" = []))
)]
pub async fn answer_key(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = quizzes::require_quiz(store.as_ref(), &id).await?;

    let allowed = quiz.data.is_owned_by(claims.user_id())
        || submissions::has_submitted(store.as_ref(), &id, claims.user_id()).await?;
    if !allowed {
        return Err(AppError::Forbidden {
            code: "quiz/answer-key-locked",
            message: "Submit the quiz to see the correct answers.".to_string(),
        });
    }

    Ok(Json(AnswerKey::from(&quiz)))
}
