use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::application::ConversationRepository;
use crate::domain::{ChatSession, Conversation, DomainError};

/// Use case for the sidebar's conversation history: archiving the active
/// chat, switching between chats, and JSON export/import.
pub struct ConversationHistoryUseCase {
    repository: Arc<dyn ConversationRepository>,
}

impl ConversationHistoryUseCase {
    pub fn new(repository: Arc<dyn ConversationRepository>) -> Self {
        Self { repository }
    }

    pub async fn list(&self) -> Result<Vec<Conversation>, DomainError> {
        self.repository.list().await
    }

    /// Archives the active conversation and starts an empty one.
    pub async fn start_new(&self, session: &mut ChatSession) -> Result<(), DomainError> {
        if let Some(previous) = session.new_conversation()? {
            self.repository.save(&previous).await?;
        }
        Ok(())
    }

    /// Makes a stored conversation active, archiving the current one.
    pub async fn open(&self, session: &mut ChatSession, id: &str) -> Result<(), DomainError> {
        if session.conversation().id() == id {
            return Ok(());
        }
        let conversation = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Conversation not found: {}", id)))?;

        if let Some(previous) = session.load_conversation(conversation)? {
            self.repository.save(&previous).await?;
        }
        self.repository.delete(id).await?;
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<(), DomainError> {
        if self.repository.find_by_id(id).await?.is_none() {
            return Err(DomainError::not_found(format!("Conversation not found: {}", id)));
        }
        self.repository.delete(id).await
    }

    pub async fn export(&self, conversation: &Conversation, path: &Path) -> Result<(), DomainError> {
        let json = serde_json::to_string_pretty(conversation)?;
        tokio::fs::write(path, json).await?;
        info!("Exported '{}' to {}", conversation.title(), path.display());
        Ok(())
    }

    /// Reads an exported conversation and stores it in the history.
    pub async fn import(&self, path: &Path) -> Result<Conversation, DomainError> {
        let json = tokio::fs::read_to_string(path).await?;
        let conversation: Conversation = serde_json::from_str(&json)?;
        self.repository.save(&conversation).await?;
        info!("Imported '{}' from {}", conversation.title(), path.display());
        Ok(conversation)
    }
}
