use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// Database-agnostic conversation model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub conversation_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub metadata: ConversationMetadata,
}

/// Endpoint/configuration metadata. Opaque to context assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConversationMetadata {
    pub conversation_id: Option<String>,
    pub title: Option<String>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ConversationMetadata {
    pub fn for_conversation(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: Some(conversation_id.into()),
            ..Self::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self.model = Some(model.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}
