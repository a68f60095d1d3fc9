use super::{Conversation, Endpoint, Message, ModelInfo, ModelParameters, WireMessage};
use crate::domain::DomainError;

/// UI state for one chat window: endpoint, model selection, the active
/// conversation and the reply currently being streamed.
///
/// At most one turn is in flight at a time; [`ChatSession::begin_turn`]
/// refuses to start another until [`ChatSession::finish_turn`] or
/// [`ChatSession::abort_turn`] is called.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    endpoint: Option<Endpoint>,
    connected: bool,
    models: Vec<ModelInfo>,
    selected_model: Option<String>,
    parameters: ModelParameters,
    system_prompt: Option<String>,
    conversation: Conversation,
    streamed: String,
    generating: bool,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parameters(mut self, parameters: ModelParameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Prepended to every request; never stored in the conversation.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        self.system_prompt = (!prompt.trim().is_empty()).then_some(prompt);
        self
    }

    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn set_connected(&mut self, endpoint: Endpoint) {
        self.endpoint = Some(endpoint);
        self.connected = true;
    }

    pub fn models(&self) -> &[ModelInfo] {
        &self.models
    }

    /// Replaces the model list. The selection is left alone even when the
    /// server does not list it; servers that load models on demand accept ids
    /// they never advertise.
    pub fn set_models(&mut self, models: Vec<ModelInfo>) {
        self.models = models;
    }

    pub fn selected_model(&self) -> Option<&str> {
        self.selected_model.as_deref()
    }

    pub fn select_model(&mut self, id: impl Into<String>) {
        self.selected_model = Some(id.into());
    }

    pub fn parameters(&self) -> &ModelParameters {
        &self.parameters
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn streamed(&self) -> &str {
        &self.streamed
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn can_submit(&self, input: &str) -> bool {
        !input.trim().is_empty() && self.selected_model.is_some() && !self.generating
    }

    /// Records the user's message and returns the full history to send.
    pub fn begin_turn(&mut self, input: &str) -> Result<Vec<WireMessage>, DomainError> {
        if self.generating {
            return Err(DomainError::busy("A response is already being generated"));
        }
        if input.trim().is_empty() {
            return Err(DomainError::invalid_input("Message is empty"));
        }
        if self.selected_model.is_none() {
            return Err(DomainError::invalid_input("Please select a model"));
        }

        self.conversation.push(Message::user(input));
        self.streamed.clear();
        self.generating = true;

        let mut wire = Vec::with_capacity(self.conversation.len() + 1);
        if let Some(prompt) = &self.system_prompt {
            wire.push(Message::system(prompt.clone()).to_wire());
        }
        wire.extend(self.conversation.wire_messages());
        Ok(wire)
    }

    pub fn append_chunk(&mut self, chunk: &str) {
        self.streamed.push_str(chunk);
    }

    /// Commits the streamed reply as an assistant message.
    pub fn finish_turn(&mut self) {
        let content = std::mem::take(&mut self.streamed);
        if !content.is_empty() {
            self.conversation.push(Message::assistant(content));
        }
        self.generating = false;
    }

    /// Drops the partial reply; the user's message stays.
    pub fn abort_turn(&mut self) {
        self.streamed.clear();
        self.generating = false;
    }

    /// Starts an empty conversation and returns the previous one when it
    /// had any messages.
    pub fn new_conversation(&mut self) -> Result<Option<Conversation>, DomainError> {
        if self.generating {
            return Err(DomainError::busy("Cannot start a new chat while generating"));
        }
        let previous = std::mem::take(&mut self.conversation);
        Ok((!previous.is_empty()).then_some(previous))
    }

    /// Swaps in a stored conversation, returning the active one when it had
    /// any messages.
    pub fn load_conversation(
        &mut self,
        conversation: Conversation,
    ) -> Result<Option<Conversation>, DomainError> {
        if self.generating {
            return Err(DomainError::busy("Cannot switch chats while generating"));
        }
        let previous = std::mem::replace(&mut self.conversation, conversation);
        Ok((!previous.is_empty()).then_some(previous))
    }
}
