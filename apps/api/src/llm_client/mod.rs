/// LLM Client — the single point of entry for all chat-completion calls in Agroassist.
///
/// ARCHITECTURAL RULE: No other module may call the chat-completion API directly.
/// All LLM interactions MUST go through a `ChatBackend`.
///
/// The production backend targets an Azure OpenAI deployment. No retries are
/// performed: every `complete` call is exactly one HTTP round trip.
use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

/// Azure OpenAI `api-version` used when none is configured.
pub const DEFAULT_API_VERSION: &str = "2024-06-01";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("transport failure: {0}")]
    Transport(#[source] Box<dyn StdError + Send + Sync>),

    #[error("authentication rejected (status {status}): {message}")]
    Authentication { status: u16, message: String },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("response contained no message content")]
    EmptyResponse,
}

impl LlmError {
    pub fn transport(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        LlmError::Transport(err.into())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Message model
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// A single role-tagged conversation turn sent to the remote endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Reply from the remote endpoint: an ordered list of messages, each holding
/// an ordered list of content parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatReply {
    pub messages: Vec<ReplyMessage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyMessage {
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPart {
    pub text: String,
}

impl ChatReply {
    /// A reply holding one message with one text part.
    #[cfg(test)]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            messages: vec![ReplyMessage {
                content: vec![ContentPart { text: text.into() }],
            }],
        }
    }

    /// Text of the first content part of the first message.
    #[cfg(test)]
    pub fn first_text(&self) -> Option<&str> {
        self.messages
            .first()
            .and_then(|m| m.content.first())
            .map(|p| p.text.as_str())
    }

    pub fn into_first_text(self) -> Option<String> {
        self.messages
            .into_iter()
            .next()
            .and_then(|m| m.content.into_iter().next())
            .map(|p| p.text)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Backend seam
// ────────────────────────────────────────────────────────────────────────────

/// A remote chat-completion service. Implementations must be safe to share
/// across concurrent callers.
///
/// Carried by the forwarder as `Arc<dyn ChatBackend>`.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Submits `messages` in order as one conversation and returns the reply.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<ChatReply, LlmError>;
}

/// Where and how to reach the hosted model. Immutable once built.
#[derive(Clone)]
pub struct ConnectionDescriptor {
    pub endpoint: String,
    pub credential: String,
    pub deployment: String,
    pub api_version: String,
}

impl ConnectionDescriptor {
    pub fn new(
        endpoint: impl Into<String>,
        credential: impl Into<String>,
        deployment: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            credential: credential.into(),
            deployment: deployment.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Full chat-completions URL for the configured deployment.
    pub fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version
        )
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("endpoint", &self.endpoint)
            .field("credential", &"<redacted>")
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .finish()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Azure OpenAI wire format
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CompletionRequestBody<'a> {
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<WireContent>,
}

/// `content` is either a plain string or an array of typed parts.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireContent {
    Text(String),
    Parts(Vec<WirePart>),
}

#[derive(Debug, Deserialize)]
struct WirePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct WireError {
    error: WireErrorBody,
}

#[derive(Debug, Deserialize)]
struct WireErrorBody {
    message: String,
}

impl From<WireResponse> for ChatReply {
    fn from(wire: WireResponse) -> Self {
        let messages = wire
            .choices
            .into_iter()
            .map(|choice| {
                let content = match choice.message.content {
                    Some(WireContent::Text(text)) => vec![ContentPart { text }],
                    Some(WireContent::Parts(parts)) => parts
                        .into_iter()
                        .filter_map(|p| p.text.map(|text| ContentPart { text }))
                        .collect(),
                    None => Vec::new(),
                };
                ReplyMessage { content }
            })
            .collect();
        ChatReply { messages }
    }
}

/// Pulls `error.message` out of an error body, falling back to the raw body.
fn error_message(body: String) -> String {
    serde_json::from_str::<WireError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

// ────────────────────────────────────────────────────────────────────────────
// HTTP client
// ────────────────────────────────────────────────────────────────────────────

/// Chat backend for an Azure OpenAI chat-completions deployment.
#[derive(Clone)]
pub struct AzureChatClient {
    client: Client,
    connection: ConnectionDescriptor,
}

impl AzureChatClient {
    /// Prepares the HTTP client. Performs no network I/O.
    /// `timeout` is applied by the transport; `None` waits indefinitely.
    pub fn new(connection: ConnectionDescriptor, timeout: Option<Duration>) -> Result<Self, LlmError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(LlmError::transport)?;

        Ok(Self { client, connection })
    }
}

#[async_trait]
impl ChatBackend for AzureChatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<ChatReply, LlmError> {
        let response = self
            .client
            .post(self.connection.completions_url())
            .header("api-key", &self.connection.credential)
            .json(&CompletionRequestBody { messages })
            .send()
            .await
            .map_err(LlmError::transport)?;

        let status = response.status();
        let body = response.text().await.map_err(LlmError::transport)?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(LlmError::Authentication {
                status: status.as_u16(),
                message: error_message(body),
            });
        }

        if !status.is_success() {
            warn!("Chat API returned {}: {}", status, body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: error_message(body),
            });
        }

        let wire: WireResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        if let Some(usage) = &wire.usage {
            debug!(
                "Chat call succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        Ok(wire.into())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Test support
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;

    use super::*;

    type Responder = Box<dyn Fn(&[ChatMessage]) -> Result<ChatReply, LlmError> + Send + Sync>;

    /// Backend that records every submitted conversation and answers with a
    /// scripted responder.
    pub struct RecordingBackend {
        responder: Responder,
        calls: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl RecordingBackend {
        pub fn new(
            responder: impl Fn(&[ChatMessage]) -> Result<ChatReply, LlmError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                responder: Box::new(responder),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn replying(text: &str) -> Self {
            let text = text.to_string();
            Self::new(move |_| Ok(ChatReply::from_text(text.clone())))
        }

        /// Replies with the content of the last submitted message.
        pub fn echoing() -> Self {
            Self::new(|messages| {
                Ok(ChatReply::from_text(
                    messages.last().map(|m| m.content.clone()).unwrap_or_default(),
                ))
            })
        }

        pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatBackend for RecordingBackend {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<ChatReply, LlmError> {
            self.calls.lock().unwrap().push(messages.to_vec());
            (self.responder)(messages)
        }
    }
}
