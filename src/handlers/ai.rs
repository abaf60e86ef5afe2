// src/handlers/ai.rs

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Query, State, rejection::BytesRejection},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    ai::{
        self, DocumentParams, DocumentQuiz, EnhanceRequest, GenerateRequest, GeneratedQuestions,
        InlineDocument, ModelHandle,
    },
    error::AppError,
    models::question::Question,
    utils::jwt::Claims,
};

/// Drafts questions on a topic. Nothing is stored; the teacher reviews them first.
#[utoipa::path(
    post,
    path = "/api/ai/generate",
    request_body = GenerateRequest,
    responses(
        (status = OK, body = GeneratedQuestions),
        (status = BAD_GATEWAY, description = "ai/invalid-response, ai/unreachable or ai/upstream-error"),
        (status = SERVICE_UNAVAILABLE, description = "ai/not-configured"),
    ),
    tag = "ai",
    security(("token" = []))
)]
pub async fn generate_questions(
    State(model): State<ModelHandle>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<GenerateRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let generated = ai::generate_questions(model.get()?, &payload)
        .await
        .map_err(|e| {
            tracing::error!("Question generation for {} failed: {}", claims.user_id(), e);
            e
        })?;

    Ok(Json(generated))
}

/// Rewrites one question, keeping its id, type and points.
#[utoipa::path(
    post,
    path = "/api/ai/enhance",
    request_body = EnhanceRequest,
    responses(
        (status = OK, body = Question),
        (status = BAD_GATEWAY, description = "ai/invalid-response"),
    ),
    tag = "ai",
    security(("token" = []))
)]
pub async fn enhance_question(
    State(model): State<ModelHandle>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<EnhanceRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let enhanced = ai::enhance_question(model.get()?, &payload)
        .await
        .map_err(|e| {
            tracing::error!("Question enhancement for {} failed: {}", claims.user_id(), e);
            e
        })?;

    Ok(Json(enhanced))
}

/// Reads a PDF and drafts a title, a summary and questions from it.
#[utoipa::path(
    post,
    path = "/api/ai/document",
    params(
        ("count" = Option<u32>, Query, description = "1 to 20, default 5"),
        ("difficulty" = Option<String>, Query, description = "easy | medium | hard"),
    ),
    request_body(content = String, description = "Raw PDF bytes, at most 10MB", content_type = "application/pdf"),
    responses(
        (status = OK, body = DocumentQuiz),
        (status = BAD_REQUEST, description = "ai/invalid-request"),
        (status = PAYLOAD_TOO_LARGE, description = "ai/document-too-large"),
    ),
    tag = "ai",
    security(("token" = []))
)]
pub async fn quiz_from_document(
    State(model): State<ModelHandle>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<DocumentParams>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<impl IntoResponse, AppError> {
    params.validate()?;

    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge("The document is too large. The limit is 10MB.".to_string())
        } else {
            AppError::BadRequest(rejection.body_text())
        }
    })?;

    let mime_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .unwrap_or_default();

    let document = InlineDocument {
        mime_type,
        data: body.to_vec(),
    };
    tracing::info!(
        "Extracting quiz from a {} byte document for {}",
        document.data.len(),
        claims.user_id()
    );

    let quiz = ai::quiz_from_document(model.get()?, document, &params)
        .await
        .map_err(|e| {
            tracing::error!("Document extraction for {} failed: {}", claims.user_id(), e);
            e
        })?;

    Ok(Json(quiz))
}
