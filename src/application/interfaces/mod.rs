mod conversation_repository;
mod inference_client;

pub use conversation_repository::*;
pub use inference_client::*;
