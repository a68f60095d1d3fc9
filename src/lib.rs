pub mod application;
pub mod cli;
pub mod connector;
pub mod domain;

pub use application::{
    ChatRequest, Connection, ConnectUseCase, ConversationHistoryUseCase, ConversationRepository,
    InferenceClient, InferenceClientFactory, ListModelsUseCase, SendMessageUseCase,
};

pub use connector::{
    ClientConfig, InMemoryConversationRepository, MockInferenceClient, OpenAiCompatClient,
    OpenAiCompatClientFactory, DEFAULT_BASE_URL,
};

pub use domain::{
    ChatSession, Conversation, DomainError, Endpoint, Message, ModelInfo, ModelParameters, Role,
    StreamDecoder, StreamEvent, WireMessage,
};
