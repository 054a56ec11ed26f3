use contexta_llm::Message;
use serde::{Deserialize, Serialize};

/// Summary cached on a stored message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedSummary {
    pub content: String,
    pub token_count: usize,
}

/// A provider-formatted message paired with its token accounting
///
/// `message_id` is `None` for entries with no stored counterpart
/// (injected instructions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextMessage {
    pub message_id: Option<String>,
    pub token_count: usize,
    pub message: Message,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<CachedSummary>,
}

impl ContextMessage {
    pub fn new(message_id: Option<String>, message: Message, token_count: usize) -> Self {
        Self {
            message_id,
            token_count,
            message,
            summary: None,
        }
    }

    pub fn with_summary(mut self, summary: CachedSummary) -> Self {
        self.summary = Some(summary);
        self
    }
}
