//! Prelude module for convenient imports
//!
//! ```rust
//! use contexta::prelude::*;
//! ```

pub use crate::{
    CancellationToken, ChatClient, ChatRequest, Content, ContextAssembler, ContextConfig,
    ContextError, ContextRequest, ContextResult, LlmSummarizer, MemoryPersistenceClient, Message,
    PersistenceClient, StoredMessage, Summarizer, TokenCounter, NO_PARENT,
};
