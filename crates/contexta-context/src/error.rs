use contexta_persist::PersistError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContextError {
    /// Nothing fits and summarization is off
    #[error("Prompt exceeds the context window: {token_count} / {max_context_tokens} tokens")]
    BudgetExceeded {
        token_count: usize,
        max_context_tokens: usize,
    },

    #[error(transparent)]
    Summarizer(anyhow::Error),

    #[error(transparent)]
    Store(#[from] PersistError),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Context assembly cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, ContextError>;
