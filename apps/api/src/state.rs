use crate::assistant::forwarder::ChatCompletionForwarder;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Chat-completion forwarder. Holds the shared backend and reference blocks;
    /// read-only after startup.
    pub forwarder: ChatCompletionForwarder,
}
