// src/ai/mod.rs

//! AI-assisted question authoring.
//!
//! The hosted model is reached through the `GenerativeModel` seam. Its JSON
//! output is parsed into tagged variants and converted into domain questions;
//! anything that does not fit is reported as an `AiError`, never stored.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    config::{MAX_DOCUMENT_BYTES, MAX_GENERATED_QUESTIONS, MIN_GENERATED_QUESTIONS},
    models::question::{Question, QuestionInput, QuestionType},
};

pub mod gemini;
pub mod parse;
pub mod prompts;

pub use gemini::GeminiModel;

/// A document sent alongside the prompt (PDF extraction).
#[derive(Debug, Clone)]
pub struct InlineDocument {
    pub mime_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub prompt: String,
    /// Declared response shape the model is asked to follow.
    pub schema: Value,
    pub document: Option<InlineDocument>,
}

/// Text-in, JSON-out contract of the hosted generative model.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate_json(&self, request: ModelRequest) -> Result<Value, AiError>;
}

/// Router-state handle; empty when no API key is configured.
#[derive(Clone, Default)]
pub struct ModelHandle(Option<Arc<dyn GenerativeModel>>);

impl ModelHandle {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self(Some(model))
    }

    pub fn disabled() -> Self {
        Self(None)
    }

    pub fn get(&self) -> Result<&dyn GenerativeModel, AiError> {
        self.0.as_deref().ok_or(AiError::NotConfigured)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AiError {
    NotConfigured,
    InvalidRequest(String),
    DocumentTooLarge(usize),
    Transport(String),
    Upstream { status: u16, body: String },
    EmptyResponse,
    InvalidResponse(String),
}

impl AiError {
    pub fn code(&self) -> &'static str {
        match self {
            AiError::NotConfigured => "ai/not-configured",
            AiError::InvalidRequest(_) => "ai/invalid-request",
            AiError::DocumentTooLarge(_) => "ai/document-too-large",
            AiError::Transport(_) => "ai/unreachable",
            AiError::Upstream { status: 429, .. } => "ai/rate-limited",
            AiError::Upstream { .. } => "ai/upstream-error",
            AiError::EmptyResponse => "ai/empty-response",
            AiError::InvalidResponse(_) => "ai/invalid-response",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AiError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            AiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AiError::DocumentTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AiError::Upstream { status: 429, .. } => StatusCode::TOO_MANY_REQUESTS,
            AiError::Transport(_)
            | AiError::Upstream { .. }
            | AiError::EmptyResponse
            | AiError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            AiError::NotConfigured => "AI question generation is not available on this server.",
            AiError::InvalidRequest(_) => "The generation request is invalid.",
            AiError::DocumentTooLarge(_) => "The document is too large. The limit is 10MB.",
            AiError::Upstream { status: 429, .. } => {
                "The AI service is busy. Please wait a moment and try again."
            }
            AiError::Transport(_) | AiError::Upstream { .. } => {
                "The AI service could not be reached. Please try again."
            }
            AiError::EmptyResponse | AiError::InvalidResponse(_) => {
                "The AI returned an unusable answer. Please try again."
            }
        }
    }
}

impl fmt::Display for AiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AiError::NotConfigured => write!(f, "no generative model configured"),
            AiError::InvalidRequest(msg) => write!(f, "invalid request: {}", msg),
            AiError::DocumentTooLarge(size) => {
                write!(f, "document is {} bytes, limit is {}", size, MAX_DOCUMENT_BYTES)
            }
            AiError::Transport(msg) => write!(f, "transport error: {}", msg),
            AiError::Upstream { status, body } => write!(f, "model returned {}: {}", status, body),
            AiError::EmptyResponse => write!(f, "model returned no content"),
            AiError::InvalidResponse(msg) => write!(f, "model output rejected: {}", msg),
        }
    }
}

impl std::error::Error for AiError {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

fn default_count() -> u32 {
    5
}

fn default_types() -> Vec<QuestionType> {
    vec![QuestionType::MultipleChoice, QuestionType::TrueFalse]
}

/// DTO for generating questions on a topic.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[validate(length(min = 1, max = 500))]
    pub topic: String,

    #[serde(default = "default_count")]
    #[validate(range(min = MIN_GENERATED_QUESTIONS, max = MAX_GENERATED_QUESTIONS))]
    pub count: u32,

    #[serde(default)]
    pub difficulty: Difficulty,

    #[serde(default = "default_types")]
    #[validate(length(min = 1, max = 4))]
    pub question_types: Vec<QuestionType>,

    /// Source text to draw questions from; truncated before it is sent.
    pub context: Option<String>,

    #[validate(range(min = 1, max = 100))]
    pub points_per_question: Option<u32>,
}

/// DTO for improving one question.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceRequest {
    #[validate(nested)]
    pub question: QuestionInput,

    #[validate(length(max = 500))]
    pub instructions: Option<String>,
}

/// Query parameters for document extraction.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DocumentParams {
    #[serde(default = "default_count")]
    #[validate(range(min = MIN_GENERATED_QUESTIONS, max = MAX_GENERATED_QUESTIONS))]
    pub count: u32,

    #[serde(default)]
    pub difficulty: Difficulty,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestions {
    pub questions: Vec<Question>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentQuiz {
    pub title: String,
    pub summary: String,
    pub questions: Vec<Question>,
}

pub async fn generate_questions(
    model: &dyn GenerativeModel,
    request: &GenerateRequest,
) -> Result<GeneratedQuestions, AiError> {
    check_count(request.count)?;

    let prompt = prompts::generate_prompt(request);
    let output = model
        .generate_json(ModelRequest {
            prompt,
            schema: prompts::questions_schema(),
            document: None,
        })
        .await?;

    let mut questions =
        parse::parse_questions(&output, request.count as usize, &request.question_types)?;
    if let Some(points) = request.points_per_question {
        for q in &mut questions {
            q.points = points;
        }
    }

    tracing::info!(
        "Generated {} question(s) on {:?} ({})",
        questions.len(),
        request.topic,
        request.difficulty.as_str()
    );
    Ok(GeneratedQuestions { questions })
}

/// Rewrites a question for clarity, keeping its type, id and points.
pub async fn enhance_question(
    model: &dyn GenerativeModel,
    request: &EnhanceRequest,
) -> Result<Question, AiError> {
    let original = request.question.clone().into_question();
    let prompt = prompts::enhance_prompt(&original, request.instructions.as_deref());

    let output = model
        .generate_json(ModelRequest {
            prompt,
            schema: prompts::question_schema(),
            document: None,
        })
        .await?;

    let mut enhanced = parse::parse_question(&output)?;
    if enhanced.question_type != original.question_type {
        return Err(AiError::InvalidResponse(format!(
            "expected a {} question, got {}",
            original.question_type.as_str(),
            enhanced.question_type.as_str()
        )));
    }
    enhanced.id = original.id;
    enhanced.points = original.points;
    Ok(enhanced)
}

/// Derives a title, a summary and questions from an uploaded PDF.
pub async fn quiz_from_document(
    model: &dyn GenerativeModel,
    document: InlineDocument,
    params: &DocumentParams,
) -> Result<DocumentQuiz, AiError> {
    check_count(params.count)?;
    check_document(&document)?;

    let output = model
        .generate_json(ModelRequest {
            prompt: prompts::document_prompt(params),
            schema: prompts::document_schema(),
            document: Some(document),
        })
        .await?;

    parse::parse_document_quiz(&output, params.count as usize)
}

fn check_count(count: u32) -> Result<(), AiError> {
    if !(MIN_GENERATED_QUESTIONS..=MAX_GENERATED_QUESTIONS).contains(&count) {
        return Err(AiError::InvalidRequest(format!(
            "count must be between {} and {}",
            MIN_GENERATED_QUESTIONS, MAX_GENERATED_QUESTIONS
        )));
    }
    Ok(())
}

pub fn check_document(document: &InlineDocument) -> Result<(), AiError> {
    if document.data.is_empty() {
        return Err(AiError::InvalidRequest("document is empty".to_string()));
    }
    if document.data.len() > MAX_DOCUMENT_BYTES {
        return Err(AiError::DocumentTooLarge(document.data.len()));
    }
    if document.mime_type != "application/pdf" || !document.data.starts_with(b"%PDF-") {
        return Err(AiError::InvalidRequest(
            "only PDF documents are supported".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf(len: usize) -> InlineDocument {
        let mut data = b"%PDF-1.7\n".to_vec();
        data.resize(len.max(data.len()), b' ');
        InlineDocument {
            mime_type: "application/pdf".to_string(),
            data,
        }
    }

    #[test]
    fn test_document_limits() {
        assert!(check_document(&pdf(1024)).is_ok());
        assert_eq!(
            check_document(&pdf(MAX_DOCUMENT_BYTES + 1)),
            Err(AiError::DocumentTooLarge(MAX_DOCUMENT_BYTES + 1))
        );

        let mut not_pdf = pdf(10);
        not_pdf.data = b"hello".to_vec();
        assert!(matches!(check_document(&not_pdf), Err(AiError::InvalidRequest(_))));
    }

    #[test]
    fn test_count_bounds() {
        assert!(check_count(1).is_ok());
        assert!(check_count(20).is_ok());
        assert!(check_count(0).is_err());
        assert!(check_count(21).is_err());
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(AiError::NotConfigured.status(), StatusCode::SERVICE_UNAVAILABLE);
        let limited = AiError::Upstream { status: 429, body: String::new() };
        assert_eq!(limited.code(), "ai/rate-limited");
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            AiError::InvalidResponse("x".to_string()).status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
