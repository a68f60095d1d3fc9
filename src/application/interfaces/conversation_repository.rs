use async_trait::async_trait;

use crate::domain::{Conversation, DomainError};

/// Storage for conversations that are no longer active.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Inserts or replaces a conversation by id.
    async fn save(&self, conversation: &Conversation) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Conversation>, DomainError>;

    /// All stored conversations, most recently changed first.
    async fn list(&self) -> Result<Vec<Conversation>, DomainError>;

    async fn delete(&self, id: &str) -> Result<(), DomainError>;
}
