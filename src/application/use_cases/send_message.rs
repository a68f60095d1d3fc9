use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::{ChatRequest, InferenceClient};
use crate::domain::{ChatSession, DomainError};

/// Use case for one user turn: record the message, stream the reply, and
/// commit it to the conversation.
pub struct SendMessageUseCase {
    client: Arc<dyn InferenceClient>,
}

impl SendMessageUseCase {
    pub fn new(client: Arc<dyn InferenceClient>) -> Self {
        Self { client }
    }

    /// Starts a turn on the session and builds the request for it. The
    /// session stays in the generating state until the caller finishes or
    /// aborts the turn.
    pub fn prepare(&self, session: &mut ChatSession, input: &str) -> Result<ChatRequest, DomainError> {
        let messages = session.begin_turn(input)?;
        // begin_turn refuses to start without a selected model
        let model = session.selected_model().unwrap_or_default().to_string();
        Ok(ChatRequest::new(model, messages).with_parameters(session.parameters().clone()))
    }

    /// Streams the reply for a prepared request.
    pub async fn stream(
        &self,
        request: &ChatRequest,
        on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<String, DomainError> {
        debug!(
            "Sending {} messages to {} (model {})",
            request.messages.len(),
            self.client.endpoint(),
            request.model
        );

        let reply = self.client.chat(request, on_chunk).await?;

        info!("Received {} characters from {}", reply.chars().count(), request.model);
        Ok(reply)
    }

    /// Runs a whole turn against the session.
    pub async fn execute(
        &self,
        session: &mut ChatSession,
        input: &str,
        on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<String, DomainError> {
        let request = self.prepare(session, input)?;

        let result = {
            let mut forward = |chunk: &str| {
                session.append_chunk(chunk);
                on_chunk(chunk);
            };
            self.stream(&request, &mut forward).await
        };

        match result {
            Ok(reply) => {
                session.finish_turn();
                Ok(reply)
            }
            Err(e) => {
                warn!("Chat request failed: {}", e);
                session.abort_turn();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::MockInferenceClient;
    use crate::domain::{ModelParameters, Role};

    fn session() -> ChatSession {
        let mut session = ChatSession::new();
        session.select_model("mock");
        session
    }

    #[tokio::test]
    async fn test_execute_streams_and_commits_reply() {
        let use_case = SendMessageUseCase::new(Arc::new(
            MockInferenceClient::new().with_reply("one two three"),
        ));
        let mut session = session();
        let mut chunks = Vec::new();

        let reply = use_case
            .execute(&mut session, "count", &mut |c: &str| chunks.push(c.to_string()))
            .await
            .unwrap();

        assert_eq!(reply, "one two three");
        assert_eq!(chunks, vec!["one ", "two ", "three"]);
        assert!(!session.is_generating());
        let messages = session.conversation().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role(), Role::Assistant);
        assert_eq!(messages[1].content(), "one two three");
    }

    #[tokio::test]
    async fn test_failed_chat_aborts_turn() {
        let use_case = SendMessageUseCase::new(Arc::new(MockInferenceClient::new().failing_chat()));
        let mut session = session();

        let err = use_case
            .execute(&mut session, "hello", &mut |_: &str| {})
            .await
            .unwrap_err();

        assert!(err.is_api_error());
        assert!(!session.is_generating());
        assert_eq!(session.conversation().len(), 1);
    }

    #[tokio::test]
    async fn test_prepare_carries_model_and_parameters() {
        let use_case = SendMessageUseCase::new(Arc::new(MockInferenceClient::new()));
        let mut session =
            session().with_parameters(ModelParameters::default().with_temperature(0.2));

        let request = use_case.prepare(&mut session, "hi").unwrap();

        assert_eq!(request.model, "mock");
        assert!(request.stream);
        assert_eq!(request.parameters.temperature, Some(0.2));
        assert!(session.is_generating());
    }

    #[tokio::test]
    async fn test_prepare_without_model_fails() {
        let use_case = SendMessageUseCase::new(Arc::new(MockInferenceClient::new()));
        let mut session = ChatSession::new();

        assert!(use_case.prepare(&mut session, "hi").is_err());
        assert!(!session.is_generating());
    }
}
