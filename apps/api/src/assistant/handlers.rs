//! Axum route handlers for the assistant API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::assistant::forwarder::{CropPlanRequest, QuestionTopic};
use crate::errors::{ApiJson, AppError};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub query: String,
    /// Text already retrieved upstream. May be empty.
    #[serde(default)]
    pub sources: String,
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub answer: String,
}

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    pub topic: QuestionTopic,
}

#[derive(Debug, Serialize)]
pub struct CropPlanResponse {
    pub report: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/questions
///
/// Answers a question from the supplied sources.
pub async fn handle_question(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<QuestionRequest>,
) -> Result<Json<AnswerResponse>, AppError> {
    let answer = state
        .forwarder
        .answer_general_query(&request.query, &request.sources)
        .await?;

    Ok(Json(AnswerResponse { answer }))
}

/// POST /api/v1/questions/classify
pub async fn handle_classify(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ClassifyRequest>,
) -> Result<Json<ClassifyResponse>, AppError> {
    let topic = state.forwarder.classify_question(&request.question).await?;

    Ok(Json(ClassifyResponse { topic }))
}

/// POST /api/v1/crop-plans
///
/// Generates a crop-planning report. `planting_date` (YYYY-MM-DD) is optional.
pub async fn handle_crop_plan(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CropPlanRequest>,
) -> Result<Json<CropPlanResponse>, AppError> {
    let report = state.forwarder.answer_crop_plan(&request).await?;

    Ok(Json(CropPlanResponse { report }))
}
