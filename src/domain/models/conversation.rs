use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::message::current_timestamp_millis;
use super::{Message, WireMessage};

pub const DEFAULT_CONVERSATION_TITLE: &str = "New Chat";
const MAX_TITLE_CHARS: usize = 40;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    id: String,
    title: String,
    messages: Vec<Message>,
    /// Unix milliseconds of the last change.
    timestamp: i64,
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: DEFAULT_CONVERSATION_TITLE.to_string(),
            messages: Vec::new(),
            timestamp: current_timestamp_millis(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Appends a message. The first user message names the conversation.
    pub fn push(&mut self, message: Message) {
        let names_conversation =
            message.is_user() && !self.messages.iter().any(Message::is_user);
        if names_conversation {
            self.title = derive_title(message.content());
        }
        self.messages.push(message);
        self.timestamp = current_timestamp_millis();
    }

    pub fn wire_messages(&self) -> Vec<WireMessage> {
        self.messages.iter().map(Message::to_wire).collect()
    }

    pub fn summary(&self) -> String {
        format!("{} ({} messages)", self.title, self.messages.len())
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

fn derive_title(content: &str) -> String {
    let first_line = content.lines().next().unwrap_or_default().trim();
    if first_line.is_empty() {
        return DEFAULT_CONVERSATION_TITLE.to_string();
    }
    if first_line.chars().count() <= MAX_TITLE_CHARS {
        return first_line.to_string();
    }
    let mut title: String = first_line.chars().take(MAX_TITLE_CHARS).collect();
    title.push('…');
    title
}
