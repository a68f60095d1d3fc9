use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{DomainError, Endpoint, ModelInfo, ModelParameters, WireMessage};

/// Body of a streamed `/v1/chat/completions` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub stream: bool,
    #[serde(flatten)]
    pub parameters: ModelParameters,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<WireMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: true,
            parameters: ModelParameters::default(),
        }
    }

    pub fn with_parameters(mut self, parameters: ModelParameters) -> Self {
        self.parameters = parameters;
        self
    }
}

/// Client for an OpenAI-compatible inference server.
///
/// Implementors own the transport and wire format; use cases only see
/// models, messages and text fragments.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Returns `true` when the server answers `GET /v1/models` with 200.
    /// Transport failures report `false` rather than an error.
    async fn test_connection(&self) -> bool;

    async fn list_models(&self) -> Result<Vec<ModelInfo>, DomainError>;

    /// Streams a completion, calling `on_chunk` with each content fragment
    /// in arrival order. Returns the concatenated reply.
    async fn chat(
        &self,
        request: &ChatRequest,
        on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<String, DomainError>;

    /// Base URL the client talks to (for logging and display).
    fn endpoint(&self) -> &str;
}

/// Builds a client for an endpoint entered at runtime.
pub trait InferenceClientFactory: Send + Sync {
    fn create(&self, endpoint: &Endpoint) -> Arc<dyn InferenceClient>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;

    #[test]
    fn test_chat_request_flattens_parameters() {
        let request = ChatRequest::new("qwen", vec![WireMessage::new(Role::User, "hi")])
            .with_parameters(ModelParameters::default().with_max_tokens(64));

        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "model": "qwen",
                "messages": [{"role": "user", "content": "hi"}],
                "stream": true,
                "max_tokens": 64
            })
        );
    }
}
