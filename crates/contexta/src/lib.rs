//! # Contexta
//!
//! Token-bounded context assembly for tree-structured LLM conversations.
//!
//! Messages live in a store as a tree linked by parent ids. For a given leaf,
//! contexta threads the path back to the root, injects instructions, keeps the
//! newest messages that fit the model's context window and covers the rest
//! with a cached or freshly generated summary.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use contexta::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(MemoryPersistenceClient::new());
//!     store
//!         .save_message(StoredMessage::user("conv-1", NO_PARENT, "Hello!").with_id("m1"))
//!         .await?;
//!
//!     let assembler = ContextAssembler::new(store);
//!     let config = ContextConfig::load()?;
//!
//!     let result = assembler
//!         .build_context(
//!             ContextRequest::new("conv-1", "m1")
//!                 .with_instructions(Message::system("Be brief.")),
//!             &config,
//!             &CancellationToken::new(),
//!         )
//!         .await?;
//!
//!     println!("{} messages, {} tokens", result.payload.len(), result.prompt_tokens);
//!
//!     // Persist computed token counts in the background
//!     assembler
//!         .spawn_writeback(result.pending_updates, CancellationToken::new())
//!         .await??;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **`contexta-llm`**: Chat message model and the `ChatClient` seam
//! - **`contexta-types`**: Configuration and per-model token rules
//! - **`contexta-persist`**: Stored message model and the message store trait
//! - **`contexta-context`**: Threading, packing, summaries and writeback
//!
//! ## License
//!
//! MIT

pub mod prelude;

pub use contexta_llm::{
    ChatClient, ChatOptions, ChatRequest, ChatResponse, Content, ContentPart, Message, ToolCall,
};

pub use contexta_types::{ContextConfig, TokenOverhead, TokenRules};

pub use contexta_persist::{
    Conversation, ConversationMetadata, MemoryPersistenceClient, MessageRole, MessageUpdate,
    PersistError, PersistenceClient, StoredMessage, NO_PARENT,
};

pub use contexta_context::{
    ContextAssembler, ContextError, ContextMessage, ContextRequest, ContextResult, LlmSummarizer,
    MessageFormatter, OpenAIFormatter, Summarizer, SummaryOutcome, TokenCountMap, TokenCounter,
    WritebackReport,
};

pub use tokio_util::sync::CancellationToken;
