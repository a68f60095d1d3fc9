use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::application::{ChatRequest, InferenceClient, InferenceClientFactory};
use crate::domain::{DomainError, Endpoint, ModelInfo, Role};

const MOCK_ENDPOINT: &str = "mock://local";

/// Offline stand-in for an inference server.
///
/// Lists a fixed set of models and, unless a fixed reply is configured,
/// echoes the last user message back one word at a time.
#[derive(Debug, Clone)]
pub struct MockInferenceClient {
    endpoint: String,
    models: Vec<String>,
    reply: Option<String>,
    reachable: bool,
    fail_chat: bool,
    chunk_delay: Option<Duration>,
}

impl MockInferenceClient {
    pub fn new() -> Self {
        Self {
            endpoint: MOCK_ENDPOINT.to_string(),
            models: vec![
                "lmstudio-community/mock-llama-8b".to_string(),
                "mock/echo-small".to_string(),
            ],
            reply: None,
            reachable: true,
            fail_chat: false,
            chunk_delay: None,
        }
    }

    pub fn with_models(mut self, models: Vec<&str>) -> Self {
        self.models = models.into_iter().map(String::from).collect();
        self
    }

    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = Some(reply.into());
        self
    }

    /// Pauses between chunks so the TUI shows text arriving.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    pub fn failing_chat(mut self) -> Self {
        self.fail_chat = true;
        self
    }

    fn reply_for(&self, request: &ChatRequest) -> String {
        if let Some(reply) = &self.reply {
            return reply.clone();
        }
        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        format!("You said: {last_user}")
    }
}

impl Default for MockInferenceClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InferenceClient for MockInferenceClient {
    async fn test_connection(&self) -> bool {
        self.reachable
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, DomainError> {
        if !self.reachable {
            return Err(DomainError::connection("Failed to load models"));
        }
        Ok(self.models.iter().map(ModelInfo::new).collect())
    }

    async fn chat(
        &self,
        request: &ChatRequest,
        on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<String, DomainError> {
        if !self.reachable {
            return Err(DomainError::connection("Chat request failed"));
        }
        if self.fail_chat {
            return Err(DomainError::api(500, "Failed to get response from API"));
        }

        let reply = self.reply_for(request);
        debug!("Mock reply for {}: {} chars", request.model, reply.len());
        for word in reply.split_inclusive(' ') {
            if let Some(delay) = self.chunk_delay {
                tokio::time::sleep(delay).await;
            }
            on_chunk(word);
        }
        Ok(reply)
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl InferenceClientFactory for MockInferenceClient {
    fn create(&self, endpoint: &Endpoint) -> Arc<dyn InferenceClient> {
        let mut client = self.clone();
        client.endpoint = endpoint.as_str().to_string();
        Arc::new(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WireMessage;

    #[tokio::test]
    async fn test_mock_echoes_last_user_message() {
        let client = MockInferenceClient::new();
        let request = ChatRequest::new(
            "mock",
            vec![
                WireMessage::new(Role::User, "first"),
                WireMessage::new(Role::Assistant, "ok"),
                WireMessage::new(Role::User, "second one"),
            ],
        );
        let mut chunks = Vec::new();

        let reply = client
            .chat(&request, &mut |c: &str| chunks.push(c.to_string()))
            .await
            .unwrap();

        assert_eq!(reply, "You said: second one");
        assert_eq!(chunks.concat(), reply);
        assert_eq!(chunks.len(), 4);
    }

    #[tokio::test]
    async fn test_chat_through_trait_object_borrows_chunks() {
        let client: Arc<dyn InferenceClient> =
            Arc::new(MockInferenceClient::new().with_reply("one two three"));
        let request = ChatRequest::new("mock", vec![WireMessage::new(Role::User, "count")]);
        let mut streamed = String::new();
        let mut calls = 0;

        let reply = client
            .chat(&request, &mut |chunk: &str| {
                streamed.push_str(chunk);
                calls += 1;
            })
            .await
            .unwrap();

        assert_eq!(reply, "one two three");
        assert_eq!(streamed, reply);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_unreachable_mock_fails_probe() {
        let client = MockInferenceClient::new().unreachable();

        assert!(!client.test_connection().await);
        assert!(client.list_models().await.is_err());
    }
}
