// src/db/submissions.rs

use crate::{
    db::quizzes,
    error::AppError,
    models::{
        Stored,
        collections::SUBMISSIONS,
        quiz::Quiz,
        submission::Submission,
    },
    scoring::{Answers, compute_score},
    store::{CREATED_AT, Direction, DocumentStore, Query, to_object},
    utils::jwt::Claims,
};

/// Who is submitting and how the attempt ended.
#[derive(Debug, Clone)]
pub struct Attempter {
    pub user_id: String,
    pub display_name: String,
}

impl From<&Claims> for Attempter {
    fn from(claims: &Claims) -> Self {
        Attempter {
            user_id: claims.sub.clone(),
            display_name: claims.name.clone(),
        }
    }
}

/// Whether `user_id` may take (and submit) the quiz.
pub fn can_take(quiz: &Stored<Quiz>, user_id: &str) -> bool {
    quiz.data.is_published || quiz.data.is_owned_by(user_id)
}

/// Scores the answers against the stored quiz and records the submission.
///
/// Shared by direct submissions, manual attempt submits and timer expiry.
pub async fn submit_answers(
    store: &dyn DocumentStore,
    quiz: &Stored<Quiz>,
    attempter: &Attempter,
    answers: Answers,
    time_spent: u64,
    auto_submitted: bool,
) -> Result<Stored<Submission>, AppError> {
    if !can_take(quiz, &attempter.user_id) {
        return Err(AppError::Forbidden {
            code: "quiz/not-published",
            message: "This quiz is not accepting submissions.".to_string(),
        });
    }

    let report = compute_score(&quiz.data.questions, &answers);

    let submission = Submission {
        quiz_id: quiz.id.clone(),
        quiz_title: quiz.data.title.clone(),
        user_id: attempter.user_id.clone(),
        user_name: attempter.display_name.clone(),
        answers,
        score: report.percentage,
        earned_points: report.earned_points,
        total_points: report.total_points,
        pending_manual_grading: report.pending_manual_grading,
        results: report.questions,
        time_spent,
        auto_submitted,
    };

    let id = store.create(SUBMISSIONS, to_object(&submission)?).await?;
    tracing::info!(
        "Submission {} for quiz {} by {}: {:.1}%{}",
        id,
        quiz.id,
        attempter.user_id,
        submission.score,
        if auto_submitted { " (time expired)" } else { "" }
    );

    // The submission is already stored; a failed counter bump must not
    // make the client retry and create a second one.
    if let Err(e) = quizzes::increment_submission_count(store, &quiz.id).await {
        tracing::warn!("Failed to bump submission count for quiz {}: {}", quiz.id, e);
    }

    require_submission(store, &id).await
}

pub async fn get_submission(
    store: &dyn DocumentStore,
    id: &str,
) -> Result<Option<Stored<Submission>>, AppError> {
    match store.get(SUBMISSIONS, id).await? {
        Some(doc) => Ok(Some(Stored::try_from(doc)?)),
        None => Ok(None),
    }
}

pub async fn require_submission(
    store: &dyn DocumentStore,
    id: &str,
) -> Result<Stored<Submission>, AppError> {
    get_submission(store, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Submission not found".to_string()))
}

async fn list_where(
    store: &dyn DocumentStore,
    field: &str,
    value: &str,
) -> Result<Vec<Stored<Submission>>, AppError> {
    let docs = store
        .query(
            SUBMISSIONS,
            &Query::new()
                .where_eq(field, value)
                .order_by(CREATED_AT, Direction::Desc),
        )
        .await?;

    docs.into_iter()
        .map(|doc| Stored::try_from(doc).map_err(AppError::from))
        .collect()
}

/// Newest first.
pub async fn list_by_quiz(
    store: &dyn DocumentStore,
    quiz_id: &str,
) -> Result<Vec<Stored<Submission>>, AppError> {
    list_where(store, "quizId", quiz_id).await
}

/// Newest first.
pub async fn list_by_user(
    store: &dyn DocumentStore,
    user_id: &str,
) -> Result<Vec<Stored<Submission>>, AppError> {
    list_where(store, "userId", user_id).await
}

pub async fn has_submitted(
    store: &dyn DocumentStore,
    quiz_id: &str,
    user_id: &str,
) -> Result<bool, AppError> {
    let docs = store
        .query(
            SUBMISSIONS,
            &Query::new()
                .where_eq("quizId", quiz_id)
                .where_eq("userId", user_id)
                .limit(1),
        )
        .await?;
    Ok(!docs.is_empty())
}
