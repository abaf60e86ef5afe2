// src/models/question.rs

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::utils::html::clean_text;

/// The four supported question kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
    FillInTheBlank,
}

impl QuestionType {
    pub const ALL: [QuestionType; 4] = [
        QuestionType::MultipleChoice,
        QuestionType::TrueFalse,
        QuestionType::ShortAnswer,
        QuestionType::FillInTheBlank,
    ];

    /// Choice questions reference option ids; free-text ones store literal answers.
    pub fn is_choice(&self) -> bool {
        matches!(self, QuestionType::MultipleChoice | QuestionType::TrueFalse)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple-choice",
            QuestionType::TrueFalse => "true-false",
            QuestionType::ShortAnswer => "short-answer",
            QuestionType::FillInTheBlank => "fill-in-the-blank",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Validate)]
pub struct QuestionOption {
    #[validate(length(min = 1, max = 64))]
    pub id: String,
    #[validate(length(min = 1, max = 500))]
    pub text: String,
}

/// A single scored prompt as stored inside a quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,

    /// Serialized as `type`, which is a reserved keyword in Rust.
    #[serde(rename = "type")]
    pub question_type: QuestionType,

    pub text: String,

    /// Empty for free-text questions.
    #[serde(default)]
    pub options: Vec<QuestionOption>,

    /// Option ids for choice questions, literal text otherwise.
    pub correct_answer: Vec<String>,

    pub points: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Question {
    /// Checks the structural rules a question must satisfy before it is stored.
    pub fn check(&self) -> Result<(), String> {
        if self.text.trim().is_empty() {
            return Err(format!("Question {} has no text", self.id));
        }

        if self.correct_answer.is_empty() {
            return Err(format!("Question {} has no correct answer", self.id));
        }

        match self.question_type {
            QuestionType::MultipleChoice | QuestionType::TrueFalse => {
                if self.question_type == QuestionType::TrueFalse && self.options.len() != 2 {
                    return Err(format!(
                        "True/false question {} must have exactly two options",
                        self.id
                    ));
                }
                if self.question_type == QuestionType::MultipleChoice && self.options.len() < 2 {
                    return Err(format!(
                        "Multiple-choice question {} needs at least two options",
                        self.id
                    ));
                }

                let mut option_ids = HashSet::new();
                for option in &self.options {
                    if option.text.trim().is_empty() {
                        return Err(format!("Question {} has an empty option", self.id));
                    }
                    if !option_ids.insert(option.id.as_str()) {
                        return Err(format!(
                            "Question {} repeats option id {}",
                            self.id, option.id
                        ));
                    }
                }

                if let Some(unknown) = self
                    .correct_answer
                    .iter()
                    .find(|answer| !option_ids.contains(answer.as_str()))
                {
                    return Err(format!(
                        "Question {} marks unknown option {} as correct",
                        self.id, unknown
                    ));
                }
            }
            QuestionType::ShortAnswer | QuestionType::FillInTheBlank => {
                if !self.options.is_empty() {
                    return Err(format!(
                        "Free-text question {} must not have options",
                        self.id
                    ));
                }
                if self.correct_answer.iter().any(|a| a.trim().is_empty()) {
                    return Err(format!("Question {} has a blank correct answer", self.id));
                }
            }
        }

        Ok(())
    }

    /// Texts of the correct options, or the literal answers for free-text questions.
    pub fn correct_answer_texts(&self) -> Vec<String> {
        if !self.question_type.is_choice() {
            return self.correct_answer.clone();
        }
        self.correct_answer
            .iter()
            .filter_map(|id| self.options.iter().find(|o| &o.id == id))
            .map(|o| o.text.clone())
            .collect()
    }
}

/// DTO for a question inside a quiz create/update request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuestionInput {
    /// Client-side id; generated when absent.
    #[validate(length(min = 1, max = 64))]
    pub id: Option<String>,

    #[serde(rename = "type")]
    pub question_type: QuestionType,

    #[validate(length(min = 1, max = 2000))]
    pub text: String,

    #[serde(default)]
    #[validate(length(max = 10), nested)]
    pub options: Vec<QuestionOption>,

    #[serde(default)]
    #[validate(length(max = 10))]
    pub correct_answer: Vec<String>,

    #[serde(default = "default_points")]
    #[validate(range(max = 1000))]
    pub points: u32,

    #[validate(length(max = 2000))]
    pub explanation: Option<String>,
}

fn default_points() -> u32 {
    1
}

impl QuestionInput {
    /// Sanitizes user-provided text and fills in a missing id.
    pub fn into_question(self) -> Question {
        let is_choice = self.question_type.is_choice();
        Question {
            id: self
                .id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            question_type: self.question_type,
            text: clean_text(&self.text),
            options: self
                .options
                .into_iter()
                .map(|o| QuestionOption {
                    id: o.id,
                    text: clean_text(&o.text),
                })
                .collect(),
            // Option ids are compared verbatim; only literal answers get trimmed.
            correct_answer: self
                .correct_answer
                .into_iter()
                .map(|a| if is_choice { a } else { a.trim().to_string() })
                .collect(),
            points: self.points,
            explanation: self.explanation.map(|e| clean_text(&e)),
        }
    }
}

/// Question as shown to a quiz taker (no answers, no explanation).
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub text: String,
    pub options: Vec<QuestionOption>,
    pub points: u32,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        PublicQuestion {
            id: q.id.clone(),
            question_type: q.question_type,
            text: q.text.clone(),
            options: q.options.clone(),
            points: q.points,
        }
    }
}
