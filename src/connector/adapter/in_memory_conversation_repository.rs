use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::application::ConversationRepository;
use crate::domain::{Conversation, DomainError};

pub struct InMemoryConversationRepository {
    conversations: Arc<Mutex<HashMap<String, Conversation>>>,
}

impl InMemoryConversationRepository {
    pub fn new() -> Self {
        Self {
            conversations: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryConversationRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn save(&self, conversation: &Conversation) -> Result<(), DomainError> {
        let mut store = self.conversations.lock().await;
        store.insert(conversation.id().to_string(), conversation.clone());
        debug!("Stored conversation {} ({} total)", conversation.id(), store.len());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Conversation>, DomainError> {
        let store = self.conversations.lock().await;
        Ok(store.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<Conversation>, DomainError> {
        let store = self.conversations.lock().await;
        let mut conversations: Vec<Conversation> = store.values().cloned().collect();
        conversations.sort_by(|a, b| {
            b.timestamp()
                .cmp(&a.timestamp())
                .then_with(|| a.id().cmp(b.id()))
        });
        Ok(conversations)
    }

    async fn delete(&self, id: &str) -> Result<(), DomainError> {
        let mut store = self.conversations.lock().await;
        store.remove(id);
        Ok(())
    }
}
