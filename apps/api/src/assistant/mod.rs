// Agronomy assistant: prompt construction and chat-completion forwarding.
// All LLM calls go through llm_client — no direct HTTP calls here.

pub mod forwarder;
pub mod handlers;
pub mod knowledge;
pub mod prompts;
