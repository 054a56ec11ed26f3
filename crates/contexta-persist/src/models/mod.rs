mod db_message;
mod db_thread;

// Export database-agnostic models
pub use db_message::{MessageRole, MessageUpdate, StoredMessage, NO_PARENT};
pub use db_thread::{Conversation, ConversationMetadata};
