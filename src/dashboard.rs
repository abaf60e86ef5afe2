// src/dashboard.rs

//! Home-screen data for a signed-in user.
//!
//! The three listings are fetched concurrently. A failure in one of them is
//! logged and reported as a warning; the others are still returned.

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    config::DEFAULT_LIST_LIMIT,
    db::{quizzes, submissions},
    error::AppError,
    models::{quiz::QuizSummary, submission::SubmissionSummary},
    store::DocumentStore,
    utils::jwt::Claims,
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    /// Always empty for students.
    pub my_quizzes: Vec<QuizSummary>,
    pub my_submissions: Vec<SubmissionSummary>,
    pub public_quizzes: Vec<QuizSummary>,
    /// One line per listing that could not be loaded.
    pub warnings: Vec<String>,
}

fn degrade<T>(listing: &str, result: Result<Vec<T>, AppError>, warnings: &mut Vec<String>) -> Vec<T> {
    match result {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!("Dashboard listing '{}' failed: {}", listing, e);
            warnings.push(format!("Could not load {}. Please refresh to try again.", listing));
            Vec::new()
        }
    }
}

pub async fn load_dashboard(store: &dyn DocumentStore, claims: &Claims) -> Dashboard {
    let user_id = claims.user_id();

    let mine = async {
        if claims.is_teacher() {
            quizzes::list_quizzes_by_author(store, user_id).await
        } else {
            Ok(Vec::new())
        }
    };
    let taken = submissions::list_by_user(store, user_id);
    let public = quizzes::list_public_quizzes(store, None, DEFAULT_LIST_LIMIT);

    let (mine, taken, public) = tokio::join!(mine, taken, public);

    let mut warnings = Vec::new();
    let my_quizzes = degrade("your quizzes", mine, &mut warnings);
    let my_submissions = degrade("your results", taken, &mut warnings);
    let public_quizzes = degrade("public quizzes", public, &mut warnings);

    Dashboard {
        my_quizzes: my_quizzes.iter().map(QuizSummary::from).collect(),
        my_submissions: my_submissions.iter().map(SubmissionSummary::from).collect(),
        public_quizzes: public_quizzes.iter().map(QuizSummary::from).collect(),
        warnings,
    }
}
