use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use contexta_llm::{Content, ContentPart};

/// Parent id of a conversation's first message. Never resolves to a stored message.
pub const NO_PARENT: &str = "00000000-0000-0000-0000-000000000000";

/// Database-agnostic message model
///
/// Messages form a tree through `parent_message_id`; a conversation's history
/// is the path from some leaf back to the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub message_id: String,
    pub parent_message_id: String,
    pub conversation_id: String,
    pub role: MessageRole,
    /// Display sender ("User", "GPT-4", ...)
    pub sender: String,
    pub text: String,
    /// Structured content; takes precedence over `text` when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<ContentPart>>,
    pub is_created_by_user: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_count: Option<usize>,
    /// Summary of everything up to and including this message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_token_count: Option<usize>,
    pub created_at: DateTime<Utc>,
}

impl Default for StoredMessage {
    fn default() -> Self {
        Self {
            message_id: uuid::Uuid::new_v4().to_string(),
            parent_message_id: NO_PARENT.to_string(),
            conversation_id: String::new(),
            role: MessageRole::Assistant,
            sender: String::new(),
            text: String::new(),
            content: None,
            is_created_by_user: false,
            token_count: None,
            summary: None,
            summary_token_count: None,
            created_at: Utc::now(),
        }
    }
}

impl StoredMessage {
    /// User turn
    pub fn user(
        conversation_id: impl Into<String>,
        parent_message_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            parent_message_id: parent_message_id.into(),
            role: MessageRole::User,
            sender: "User".to_string(),
            text: text.into(),
            is_created_by_user: true,
            ..Self::default()
        }
    }

    /// Generated turn
    pub fn assistant(
        conversation_id: impl Into<String>,
        parent_message_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            parent_message_id: parent_message_id.into(),
            role: MessageRole::Assistant,
            sender: "Assistant".to_string(),
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = message_id.into();
        self
    }

    pub fn with_content(mut self, parts: Vec<ContentPart>) -> Self {
        self.content = Some(parts);
        self
    }

    pub fn with_token_count(mut self, tokens: usize) -> Self {
        self.token_count = Some(tokens);
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>, tokens: usize) -> Self {
        self.summary = Some(summary.into());
        self.summary_token_count = Some(tokens);
        self
    }

    pub fn has_parent(&self) -> bool {
        self.parent_message_id != NO_PARENT
    }

    /// Effective content: structured parts if present, else plain text
    pub fn effective_content(&self) -> Content {
        match &self.content {
            Some(parts) => Content::Parts(parts.clone()),
            None => Content::Text(self.text.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// Partial update written back by context assembly
///
/// Only `Some` fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageUpdate {
    pub message_id: String,
    pub conversation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_token_count: Option<usize>,
}

impl MessageUpdate {
    pub fn new(conversation_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            conversation_id: conversation_id.into(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.token_count.is_none() && self.summary.is_none() && self.summary_token_count.is_none()
    }

    /// Apply the set fields onto a stored message
    pub fn apply_to(&self, message: &mut StoredMessage) {
        if let Some(tokens) = self.token_count {
            message.token_count = Some(tokens);
        }
        if let Some(summary) = &self.summary {
            message.summary = Some(summary.clone());
        }
        if let Some(tokens) = self.summary_token_count {
            message.summary_token_count = Some(tokens);
        }
    }
}
