// src/ai/parse.rs

//! Turns model JSON into domain questions.

use serde::Deserialize;
use serde_json::Value;

use crate::{
    ai::{AiError, DocumentQuiz},
    models::question::{Question, QuestionOption, QuestionType},
    utils::html::clean_text,
};

const DEFAULT_POINTS: u32 = 1;
const MAX_POINTS: u32 = 10;

/// One question as the model emits it, keyed by `type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum GeneratedQuestion {
    MultipleChoice {
        question: String,
        options: Vec<String>,
        correct_answers: Vec<usize>,
        points: Option<u32>,
        explanation: Option<String>,
    },
    TrueFalse {
        question: String,
        correct_answer: bool,
        points: Option<u32>,
        explanation: Option<String>,
    },
    ShortAnswer {
        question: String,
        accepted_answers: Vec<String>,
        points: Option<u32>,
        explanation: Option<String>,
    },
    FillInTheBlank {
        question: String,
        accepted_answers: Vec<String>,
        points: Option<u32>,
        explanation: Option<String>,
    },
}

fn option_id(index: usize) -> String {
    format!("o{}", index + 1)
}

fn clean_explanation(explanation: Option<String>) -> Option<String> {
    explanation
        .map(|e| clean_text(e.trim()))
        .filter(|e| !e.is_empty())
}

fn clamp_points(points: Option<u32>) -> u32 {
    points.unwrap_or(DEFAULT_POINTS).clamp(1, MAX_POINTS)
}

impl GeneratedQuestion {
    /// Validates the variant and builds a question with fresh ids.
    pub fn into_question(self) -> Result<Question, String> {
        let id = uuid::Uuid::new_v4().to_string();

        let question = match self {
            GeneratedQuestion::MultipleChoice {
                question,
                options,
                correct_answers,
                points,
                explanation,
            } => {
                if let Some(bad) = correct_answers.iter().find(|&&i| i >= options.len()) {
                    return Err(format!(
                        "correct answer index {} is outside {} options",
                        bad,
                        options.len()
                    ));
                }
                let mut correct: Vec<String> = correct_answers.into_iter().map(option_id).collect();
                correct.sort();
                correct.dedup();

                Question {
                    id,
                    question_type: QuestionType::MultipleChoice,
                    text: clean_text(question.trim()),
                    options: options
                        .iter()
                        .enumerate()
                        .map(|(i, text)| QuestionOption {
                            id: option_id(i),
                            text: clean_text(text.trim()),
                        })
                        .collect(),
                    correct_answer: correct,
                    points: clamp_points(points),
                    explanation: clean_explanation(explanation),
                }
            }
            GeneratedQuestion::TrueFalse {
                question,
                correct_answer,
                points,
                explanation,
            } => Question {
                id,
                question_type: QuestionType::TrueFalse,
                text: clean_text(question.trim()),
                options: vec![
                    QuestionOption { id: option_id(0), text: "True".to_string() },
                    QuestionOption { id: option_id(1), text: "False".to_string() },
                ],
                correct_answer: vec![option_id(if correct_answer { 0 } else { 1 })],
                points: clamp_points(points),
                explanation: clean_explanation(explanation),
            },
            GeneratedQuestion::ShortAnswer {
                question,
                accepted_answers,
                points,
                explanation,
            } => free_text(id, QuestionType::ShortAnswer, question, accepted_answers, points, explanation),
            GeneratedQuestion::FillInTheBlank {
                question,
                accepted_answers,
                points,
                explanation,
            } => free_text(
                id,
                QuestionType::FillInTheBlank,
                question,
                accepted_answers,
                points,
                explanation,
            ),
        };

        question.check()?;
        Ok(question)
    }
}

fn free_text(
    id: String,
    question_type: QuestionType,
    question: String,
    accepted_answers: Vec<String>,
    points: Option<u32>,
    explanation: Option<String>,
) -> Question {
    Question {
        id,
        question_type,
        text: clean_text(question.trim()),
        options: Vec::new(),
        correct_answer: accepted_answers
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect(),
        points: clamp_points(points),
        explanation: clean_explanation(explanation),
    }
}

pub fn parse_question(value: &Value) -> Result<Question, AiError> {
    let generated = GeneratedQuestion::deserialize(value)
        .map_err(|e| AiError::InvalidResponse(format!("question shape: {}", e)))?;
    generated.into_question().map_err(AiError::InvalidResponse)
}

/// Parses `{"questions": [...]}`, keeping at most `limit` valid questions of the
/// `allowed` types.
///
/// Malformed questions and questions of other types are dropped before they
/// count toward the limit; the call fails only when none survive.
pub fn parse_questions(
    value: &Value,
    limit: usize,
    allowed: &[QuestionType],
) -> Result<Vec<Question>, AiError> {
    let items = value
        .get("questions")
        .and_then(Value::as_array)
        .ok_or_else(|| AiError::InvalidResponse("missing \"questions\" array".to_string()))?;

    let mut questions = Vec::with_capacity(items.len().min(limit));
    for (index, item) in items.iter().enumerate() {
        if questions.len() == limit {
            break;
        }
        match parse_question(item) {
            Ok(question) if allowed.contains(&question.question_type) => questions.push(question),
            Ok(question) => tracing::debug!(
                "Skipping generated question #{} of type {}",
                index,
                question.question_type.as_str()
            ),
            Err(e) => tracing::warn!("Dropping generated question #{}: {}", index, e),
        }
    }

    if questions.is_empty() {
        return Err(AiError::InvalidResponse(
            "the model produced no usable questions of the requested types".to_string(),
        ));
    }
    Ok(questions)
}

pub fn parse_document_quiz(value: &Value, limit: usize) -> Result<DocumentQuiz, AiError> {
    let text_field = |name: &str| {
        value
            .get(name)
            .and_then(Value::as_str)
            .map(|s| clean_text(s.trim()))
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AiError::InvalidResponse(format!("missing \"{}\"", name)))
    };

    Ok(DocumentQuiz {
        title: text_field("title")?,
        summary: text_field("summary")?,
        questions: parse_questions(value, limit, &QuestionType::ALL)?,
    })
}
