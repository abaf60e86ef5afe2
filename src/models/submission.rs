// src/models/submission.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    models::Stored,
    scoring::{Answers, QuestionResult},
};

/// Represents a document in the `submissions` collection.
/// Written once per attempt and never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub quiz_id: String,

    /// Title at submission time, for listings.
    #[serde(default)]
    pub quiz_title: String,

    pub user_id: String,

    #[serde(default)]
    pub user_name: String,

    pub answers: Answers,

    /// Percentage, 0–100.
    pub score: f64,

    #[serde(default)]
    pub earned_points: u32,

    pub total_points: u32,

    /// Free-text answers awaiting a human grader.
    #[serde(default)]
    pub pending_manual_grading: u32,

    #[serde(default)]
    pub results: Vec<QuestionResult>,

    /// Seconds.
    #[serde(default)]
    pub time_spent: u64,

    /// True when the countdown ran out and the attempt was submitted for the user.
    #[serde(default)]
    pub auto_submitted: bool,
}

/// Listing row for "my submissions" and the results table.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionSummary {
    pub id: String,
    pub quiz_id: String,
    pub quiz_title: String,
    pub user_id: String,
    pub user_name: String,
    pub score: f64,
    pub earned_points: u32,
    pub total_points: u32,
    pub pending_manual_grading: u32,
    pub time_spent: u64,
    pub auto_submitted: bool,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Stored<Submission>> for SubmissionSummary {
    fn from(submission: &Stored<Submission>) -> Self {
        let data = &submission.data;
        SubmissionSummary {
            id: submission.id.clone(),
            quiz_id: data.quiz_id.clone(),
            quiz_title: data.quiz_title.clone(),
            user_id: data.user_id.clone(),
            user_name: data.user_name.clone(),
            score: data.score,
            earned_points: data.earned_points,
            total_points: data.total_points,
            pending_manual_grading: data.pending_manual_grading,
            time_spent: data.time_spent,
            auto_submitted: data.auto_submitted,
            submitted_at: submission.created_at,
        }
    }
}

/// DTO for submitting answers directly (client-held timer).
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswersRequest {
    #[validate(custom(function = validate_answers))]
    #[schema(value_type = HashMap<String, Vec<String>>)]
    pub answers: Answers,

    /// Seconds spent, as measured by the client.
    #[serde(default)]
    #[validate(range(max = 86_400))]
    pub time_spent: u64,
}

/// DTO for saving in-progress answers on a server-held attempt.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SaveAnswersRequest {
    #[validate(custom(function = validate_answers))]
    #[schema(value_type = HashMap<String, Vec<String>>)]
    pub answers: Answers,
}

/// Caps the answer map so one request cannot carry an unbounded payload.
fn validate_answers(answers: &Answers) -> Result<(), validator::ValidationError> {
    if answers.len() > 500 {
        return Err(validator::ValidationError::new("too_many_answers"));
    }
    for values in answers.values() {
        if values.len() > 20 || values.iter().any(|v| v.len() > 2000) {
            return Err(validator::ValidationError::new("answer_too_long"));
        }
    }
    Ok(())
}
