// src/scoring.rs

//! Score computation for a submitted attempt.
//!
//! Choice questions (multiple-choice, true/false) are all-or-nothing: the
//! submitted set must equal the correct set. Free-text questions are not
//! compared at all; their points stay in the denominator and they are
//! reported as awaiting manual grading.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::question::Question;

/// Map from question id to the chosen option ids (or typed text).
pub type Answers = HashMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    Correct,
    Incorrect,
    Unanswered,
    /// Free-text answer, never auto-graded.
    PendingReview,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub question_id: String,
    pub outcome: Outcome,
    pub points_awarded: u32,
    pub points_possible: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    pub earned_points: u32,
    pub total_points: u32,
    /// 0–100. Zero when the quiz carries no points.
    pub percentage: f64,
    pub pending_manual_grading: u32,
    pub questions: Vec<QuestionResult>,
}

/// True when both answer lists contain the same members, ignoring order.
/// Sizes are compared first so duplicates cannot mask a missing answer.
pub fn same_answer_set(submitted: &[String], correct: &[String]) -> bool {
    if submitted.len() != correct.len() {
        return false;
    }
    let submitted: HashSet<&str> = submitted.iter().map(String::as_str).collect();
    let correct: HashSet<&str> = correct.iter().map(String::as_str).collect();
    submitted == correct
}

pub fn compute_score(questions: &[Question], answers: &Answers) -> ScoreReport {
    let mut earned_points = 0;
    let mut total_points = 0;
    let mut pending_manual_grading = 0;
    let mut results = Vec::with_capacity(questions.len());

    for question in questions {
        total_points += question.points;

        let submitted = answers
            .get(&question.id)
            .filter(|a| a.iter().any(|v| !v.trim().is_empty()));

        let outcome = match submitted {
            None => Outcome::Unanswered,
            Some(_) if !question.question_type.is_choice() => {
                pending_manual_grading += 1;
                Outcome::PendingReview
            }
            Some(submitted) if same_answer_set(submitted, &question.correct_answer) => {
                Outcome::Correct
            }
            Some(_) => Outcome::Incorrect,
        };

        let points_awarded = if outcome == Outcome::Correct {
            question.points
        } else {
            0
        };
        earned_points += points_awarded;

        results.push(QuestionResult {
            question_id: question.id.clone(),
            outcome,
            points_awarded,
            points_possible: question.points,
        });
    }

    ScoreReport {
        earned_points,
        total_points,
        percentage: percentage(earned_points, total_points),
        pending_manual_grading,
        questions: results,
    }
}

pub fn percentage(earned: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (earned as f64 / total as f64) * 100.0
}
