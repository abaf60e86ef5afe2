// src/analytics.rs

//! Aggregate statistics over a quiz's submissions.

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    models::{Stored, question::QuestionType, quiz::Quiz, submission::Submission},
    scoring::Outcome,
};

const BUCKET_LABELS: [&str; 5] = ["0-19", "20-39", "40-59", "60-79", "80-100"];

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBucket {
    pub label: &'static str,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionStats {
    pub question_id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    /// Submissions that answered this question.
    pub answered: u32,
    /// Share of submissions that got it right, 0–100. `None` for free-text
    /// questions and for quizzes nobody has taken yet.
    pub correct_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizStats {
    pub submission_count: u32,
    pub average_score: f64,
    pub highest_score: f64,
    pub lowest_score: f64,
    /// Seconds.
    pub average_time_spent: f64,
    pub distribution: Vec<ScoreBucket>,
    pub questions: Vec<QuestionStats>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn bucket_index(score: f64) -> usize {
    ((score.clamp(0.0, 100.0) / 20.0) as usize).min(BUCKET_LABELS.len() - 1)
}

pub fn summarize(quiz: &Quiz, submissions: &[Stored<Submission>]) -> QuizStats {
    let count = submissions.len() as u32;

    let mut distribution = [0u32; 5];
    let mut score_sum = 0.0;
    let mut time_sum = 0.0;
    let mut highest = f64::MIN;
    let mut lowest = f64::MAX;

    for submission in submissions {
        let score = submission.data.score;
        score_sum += score;
        time_sum += submission.data.time_spent as f64;
        highest = highest.max(score);
        lowest = lowest.min(score);
        distribution[bucket_index(score)] += 1;
    }

    let questions = quiz
        .questions
        .iter()
        .map(|question| {
            let mut answered = 0;
            let mut correct = 0;
            for submission in submissions {
                let result = submission
                    .data
                    .results
                    .iter()
                    .find(|r| r.question_id == question.id);
                match result.map(|r| r.outcome) {
                    Some(Outcome::Correct) => {
                        answered += 1;
                        correct += 1;
                    }
                    Some(Outcome::Incorrect) | Some(Outcome::PendingReview) => answered += 1,
                    Some(Outcome::Unanswered) | None => {}
                }
            }

            let correct_rate = (question.question_type.is_choice() && count > 0)
                .then(|| round2(f64::from(correct) * 100.0 / f64::from(count)));

            QuestionStats {
                question_id: question.id.clone(),
                text: question.text.clone(),
                question_type: question.question_type,
                answered,
                correct_rate,
            }
        })
        .collect();

    let (average_score, average_time_spent, highest_score, lowest_score) = if count == 0 {
        (0.0, 0.0, 0.0, 0.0)
    } else {
        let n = f64::from(count);
        (round2(score_sum / n), round2(time_sum / n), highest, lowest)
    };

    QuizStats {
        submission_count: count,
        average_score,
        highest_score,
        lowest_score,
        average_time_spent,
        distribution: BUCKET_LABELS
            .iter()
            .zip(distribution)
            .map(|(label, count)| ScoreBucket { label, count })
            .collect(),
        questions,
    }
}
