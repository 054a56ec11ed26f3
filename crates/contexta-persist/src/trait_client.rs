use async_trait::async_trait;
use crate::models::{Conversation, ConversationMetadata, MessageUpdate, StoredMessage};
use crate::error::Result;

/// Trait for message store operations
///
/// Implementations provide backend-specific reads and writes. Context
/// assembly only reads snapshots and writes partial updates back.
#[async_trait]
pub trait PersistenceClient: Send + Sync {
    /// All messages of a conversation, in no particular order
    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<StoredMessage>>;

    /// Insert or replace a single message
    async fn save_message(&self, message: StoredMessage) -> Result<()>;

    /// Apply a partial update to an existing message
    async fn update_message(&self, update: MessageUpdate) -> Result<()>;

    /// Create or update a conversation record for a user
    async fn save_conversation(
        &self,
        user_id: &str,
        metadata: ConversationMetadata,
    ) -> Result<Conversation>;

    /// Get a conversation by ID
    async fn get_conversation(&self, conversation_id: &str) -> Result<Option<Conversation>>;
}
