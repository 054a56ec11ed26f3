use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::{PersistError, Result};
use crate::models::{Conversation, ConversationMetadata, MessageUpdate, StoredMessage};
use crate::trait_client::PersistenceClient;

/// Process-local message store
///
/// Keeps every conversation in memory behind a `RwLock`. Also records every
/// applied update so callers can audit writeback.
#[derive(Default)]
pub struct MemoryPersistenceClient {
    messages: RwLock<HashMap<String, HashMap<String, StoredMessage>>>,
    conversations: RwLock<HashMap<String, Conversation>>,
    update_log: RwLock<Vec<MessageUpdate>>,
    fail_writes: AtomicBool,
}

impl MemoryPersistenceClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `messages`
    pub fn with_messages(messages: impl IntoIterator<Item = StoredMessage>) -> Self {
        let mut by_conversation: HashMap<String, HashMap<String, StoredMessage>> = HashMap::new();
        for message in messages {
            by_conversation
                .entry(message.conversation_id.clone())
                .or_default()
                .insert(message.message_id.clone(), message);
        }

        Self {
            messages: RwLock::new(by_conversation),
            ..Self::default()
        }
    }

    /// Build a store from a JSON array of stored messages
    pub fn from_json(json: &str) -> Result<Self> {
        let messages: Vec<StoredMessage> = serde_json::from_str(json)?;
        Ok(Self::with_messages(messages))
    }

    /// Make every subsequent write fail with a connection error
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Updates applied so far, in order
    pub async fn update_log(&self) -> Vec<MessageUpdate> {
        self.update_log.read().await.clone()
    }

    pub async fn get_message(&self, conversation_id: &str, message_id: &str) -> Option<StoredMessage> {
        self.messages
            .read()
            .await
            .get(conversation_id)
            .and_then(|messages| messages.get(message_id))
            .cloned()
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistError::Connection("store rejected write".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceClient for MemoryPersistenceClient {
    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<StoredMessage>> {
        let messages = self.messages.read().await;
        Ok(messages
            .get(conversation_id)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn save_message(&self, message: StoredMessage) -> Result<()> {
        self.check_writable()?;
        self.messages
            .write()
            .await
            .entry(message.conversation_id.clone())
            .or_default()
            .insert(message.message_id.clone(), message);
        Ok(())
    }

    async fn update_message(&self, update: MessageUpdate) -> Result<()> {
        self.check_writable()?;
        {
            let mut messages = self.messages.write().await;
            let message = messages
                .get_mut(&update.conversation_id)
                .and_then(|m| m.get_mut(&update.message_id))
                .ok_or_else(|| PersistError::MessageNotFound(update.message_id.clone()))?;
            update.apply_to(message);
        }

        tracing::debug!(message_id = %update.message_id, "message updated");
        self.update_log.write().await.push(update);
        Ok(())
    }

    async fn save_conversation(
        &self,
        user_id: &str,
        metadata: ConversationMetadata,
    ) -> Result<Conversation> {
        self.check_writable()?;
        let now = Utc::now();
        let conversation_id = metadata
            .conversation_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let mut conversations = self.conversations.write().await;
        let conversation = conversations
            .entry(conversation_id.clone())
            .and_modify(|c| {
                c.metadata = metadata.clone();
                c.updated_at = now;
            })
            .or_insert_with(|| Conversation {
                conversation_id,
                user_id: user_id.to_string(),
                created_at: now,
                updated_at: now,
                metadata: metadata.clone(),
            });

        Ok(conversation.clone())
    }

    async fn get_conversation(&self, conversation_id: &str) -> Result<Option<Conversation>> {
        Ok(self.conversations.read().await.get(conversation_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NO_PARENT;

    #[tokio::test]
    async fn test_save_and_get_messages() {
        let store = MemoryPersistenceClient::new();
        store
            .save_message(StoredMessage::user("c1", NO_PARENT, "hi").with_id("m1"))
            .await
            .unwrap();
        store
            .save_message(StoredMessage::assistant("c1", "m1", "hello").with_id("m2"))
            .await
            .unwrap();

        let mut messages = store.get_messages("c1").await.unwrap();
        messages.sort_by(|a, b| a.message_id.cmp(&b.message_id));
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].parent_message_id, "m1");
        assert!(store.get_messages("other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_applies_only_set_fields() {
        let store = MemoryPersistenceClient::with_messages(vec![StoredMessage::user(
            "c1", NO_PARENT, "hi",
        )
        .with_id("m1")
        .with_token_count(7)]);

        let mut update = MessageUpdate::new("c1", "m1");
        update.summary = Some("earlier: greetings".to_string());
        update.summary_token_count = Some(5);
        store.update_message(update).await.unwrap();

        let message = store.get_message("c1", "m1").await.unwrap();
        assert_eq!(message.token_count, Some(7));
        assert_eq!(message.summary.as_deref(), Some("earlier: greetings"));
        assert_eq!(message.summary_token_count, Some(5));
        assert_eq!(store.update_log().await.len(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_message() {
        let store = MemoryPersistenceClient::new();
        let err = store
            .update_message(MessageUpdate::new("c1", "nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, PersistError::MessageNotFound(id) if id == "nope"));
    }

    #[tokio::test]
    async fn test_failing_writes() {
        let store = MemoryPersistenceClient::new();
        store.fail_writes(true);
        let err = store
            .save_message(StoredMessage::user("c1", NO_PARENT, "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, PersistError::Connection(_)));
    }

    #[tokio::test]
    async fn test_save_conversation_upserts() {
        let store = MemoryPersistenceClient::new();
        let created = store
            .save_conversation(
                "user-1",
                ConversationMetadata::for_conversation("c1").with_endpoint("openai", "gpt-4o"),
            )
            .await
            .unwrap();
        let updated = store
            .save_conversation(
                "user-1",
                ConversationMetadata::for_conversation("c1").with_title("Trip planning"),
            )
            .await
            .unwrap();

        assert_eq!(created.conversation_id, "c1");
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.metadata.title.as_deref(), Some("Trip planning"));
        assert_eq!(
            store.get_conversation("c1").await.unwrap().unwrap().user_id,
            "user-1"
        );
    }

    #[test]
    fn test_from_json() {
        let json = r#"[
            {"message_id":"m1","parent_message_id":"00000000-0000-0000-0000-000000000000",
             "conversation_id":"c1","role":"user","sender":"User","text":"hi",
             "is_created_by_user":true,"created_at":"2024-01-01T00:00:00Z"}
        ]"#;
        let store = MemoryPersistenceClient::from_json(json).unwrap();
        let messages = store.messages.try_read().unwrap();
        assert!(messages["c1"].contains_key("m1"));
        assert!(MemoryPersistenceClient::from_json("not json").is_err());
    }
}
