pub mod models;
pub mod dbs;
pub mod error;
pub mod trait_client;

pub use models::{
    Conversation, ConversationMetadata, MessageRole, MessageUpdate, StoredMessage, NO_PARENT,
};
pub use dbs::memory::MemoryPersistenceClient;
pub use error::{PersistError, Result};
pub use trait_client::PersistenceClient;
