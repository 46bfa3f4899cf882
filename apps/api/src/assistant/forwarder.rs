//! Chat-completion forwarder — builds the assistant prompts and sends them to
//! the configured chat backend.
//!
//! Every operation makes exactly one remote call and returns the text of the
//! first content part of the first reply message, unchanged. Failures are
//! wrapped once in a `ForwardError` labelled with the operation.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::assistant::knowledge::KnowledgeBase;
use crate::assistant::prompts::{
    CLASSIFIER_SYSTEM, CROP_PLANNING_PROMPT_TEMPLATE, DEFAULT_PLANTING_DATE,
    GENERAL_QUERY_PROMPT_TEMPLATE,
};
use crate::llm_client::prompts::{
    render, AGRONOMY_PERSONA, CITATION_INSTRUCTION, LANGUAGE_INSTRUCTION,
};
use crate::llm_client::{AzureChatClient, ChatBackend, ChatMessage, ConnectionDescriptor, LlmError};

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    GeneralQuery,
    CropPlanning,
    QuestionClassification,
}

impl Operation {
    pub fn label(self) -> &'static str {
        match self {
            Operation::GeneralQuery => "General query",
            Operation::CropPlanning => "Crop planning query",
            Operation::QuestionClassification => "Question classification",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why a forwarded call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Transport,
    Authentication,
    UpstreamApi,
    MalformedResponse,
    EmptyResponse,
}

/// The single error type returned by the forwarder. The message is
/// `"<operation> failed: <cause>"`; `kind()` classifies the cause.
#[derive(Debug, Error)]
#[error("{operation} failed: {source}")]
pub struct ForwardError {
    pub operation: Operation,
    #[source]
    pub source: LlmError,
}

impl ForwardError {
    pub fn kind(&self) -> FailureKind {
        match self.source {
            LlmError::Transport(_) => FailureKind::Transport,
            LlmError::Authentication { .. } => FailureKind::Authentication,
            LlmError::Api { .. } => FailureKind::UpstreamApi,
            LlmError::MalformedResponse(_) => FailureKind::MalformedResponse,
            LlmError::EmptyResponse => FailureKind::EmptyResponse,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Request / result types
// ────────────────────────────────────────────────────────────────────────────

/// Input of a crop-planning report.
#[derive(Debug, Clone, Deserialize)]
pub struct CropPlanRequest {
    pub query: String,
    pub location: String,
    #[serde(default)]
    pub sources: String,
    /// Written into the report as DD/MM/YYYY. `None` uses `DEFAULT_PLANTING_DATE`.
    #[serde(default)]
    pub planting_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionTopic {
    Pesticides,
    Other,
}

impl QuestionTopic {
    fn from_reply(reply: &str) -> Self {
        if reply.trim().eq_ignore_ascii_case("pesticides") {
            QuestionTopic::Pesticides
        } else {
            QuestionTopic::Other
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Forwarder
// ────────────────────────────────────────────────────────────────────────────

/// Holds the shared chat backend and the reference blocks. Cheap to clone;
/// no state is written during a call.
#[derive(Clone)]
pub struct ChatCompletionForwarder {
    backend: Arc<dyn ChatBackend>,
    knowledge: Arc<KnowledgeBase>,
}

impl ChatCompletionForwarder {
    pub fn new(backend: Arc<dyn ChatBackend>, knowledge: Arc<KnowledgeBase>) -> Self {
        Self { backend, knowledge }
    }

    /// Builds a forwarder over the Azure OpenAI deployment in `connection`.
    /// No network I/O happens here.
    pub fn connect(
        connection: ConnectionDescriptor,
        timeout: Option<Duration>,
        knowledge: KnowledgeBase,
    ) -> Result<Self, LlmError> {
        let client = AzureChatClient::new(connection, timeout)?;
        Ok(Self::new(Arc::new(client), Arc::new(knowledge)))
    }

    /// Answers `query` from the already-retrieved `sources`.
    /// Sends one user message and no history.
    pub async fn answer_general_query(
        &self,
        query: &str,
        sources: &str,
    ) -> Result<String, ForwardError> {
        let messages = vec![ChatMessage::user(build_general_query_prompt(query, sources))];
        self.forward(Operation::GeneralQuery, messages).await
    }

    /// Crop-planning report for `location` with the default planting date.
    pub async fn answer_crop_planning_query(
        &self,
        query: &str,
        location: &str,
        sources: &str,
    ) -> Result<String, ForwardError> {
        let request = CropPlanRequest {
            query: query.to_string(),
            location: location.to_string(),
            sources: sources.to_string(),
            planting_date: None,
        };
        self.answer_crop_plan(&request).await
    }

    /// Sends the six reference blocks as system messages, then the report
    /// prompt as the single user message.
    pub async fn answer_crop_plan(&self, request: &CropPlanRequest) -> Result<String, ForwardError> {
        let mut messages = self.knowledge.system_messages();
        messages.push(ChatMessage::user(build_crop_planning_prompt(request)));
        self.forward(Operation::CropPlanning, messages).await
    }

    /// Labels `question` as pesticide-related or not.
    pub async fn classify_question(&self, question: &str) -> Result<QuestionTopic, ForwardError> {
        let messages = vec![ChatMessage::system(CLASSIFIER_SYSTEM), ChatMessage::user(question)];
        let reply = self.forward(Operation::QuestionClassification, messages).await?;
        Ok(QuestionTopic::from_reply(&reply))
    }

    async fn forward(
        &self,
        operation: Operation,
        messages: Vec<ChatMessage>,
    ) -> Result<String, ForwardError> {
        let request_id = Uuid::new_v4();
        debug!(
            "{} request {}: sending {} messages",
            operation,
            request_id,
            messages.len()
        );

        let result = self
            .backend
            .complete(&messages)
            .await
            .and_then(|reply| reply.into_first_text().ok_or(LlmError::EmptyResponse));

        match result {
            Ok(text) => {
                debug!("{} request {} answered ({} chars)", operation, request_id, text.len());
                Ok(text)
            }
            Err(source) => {
                warn!("{} request {} failed: {}", operation, request_id, source);
                Err(ForwardError { operation, source })
            }
        }
    }
}

fn build_general_query_prompt(query: &str, sources: &str) -> String {
    render(
        GENERAL_QUERY_PROMPT_TEMPLATE,
        &[
            ("persona", AGRONOMY_PERSONA),
            ("language_instruction", LANGUAGE_INSTRUCTION),
            ("citation_instruction", CITATION_INSTRUCTION),
            ("query", query),
            ("sources", sources),
        ],
    )
}

fn build_crop_planning_prompt(request: &CropPlanRequest) -> String {
    let planting_date = request
        .planting_date
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| DEFAULT_PLANTING_DATE.to_string());

    render(
        CROP_PLANNING_PROMPT_TEMPLATE,
        &[
            ("persona", AGRONOMY_PERSONA),
            ("language_instruction", LANGUAGE_INSTRUCTION),
            ("citation_instruction", CITATION_INSTRUCTION),
            ("location", &request.location),
            ("planting_date", &planting_date),
            ("query", &request.query),
            ("sources", &request.sources),
        ],
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
