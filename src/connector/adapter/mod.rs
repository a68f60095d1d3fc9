mod in_memory_conversation_repository;
mod mock_inference;
mod openai_client;

pub use in_memory_conversation_repository::*;
pub use mock_inference::*;
pub use openai_client::*;
