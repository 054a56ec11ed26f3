//! Token-bounded context assembly for tree-structured conversations.
//!
//! Given a leaf message id and a token budget, [`ContextAssembler::build_context`]
//! produces a payload that always fits:
//!
//! 1. [`thread_messages`] walks parent pointers from the leaf back to the root
//!    (optionally stopping at a cached summary).
//! 2. [`inject_instructions`] places instructions just before the newest turn.
//! 3. [`pack_context`] keeps the newest messages that fit, newest first.
//! 4. [`SummaryCoordinator`] reuses or regenerates a summary of what was cut.
//! 5. [`build_token_count_map`] records per-message counts for writeback.

mod assembler;
mod error;
mod formatter;
mod instructions;
mod llm_summarizer;
mod message;
mod packer;
mod summary;
mod templates;
mod thread;
mod token_map;
mod tokens;
mod writeback;

pub use assembler::{ContextAssembler, ContextRequest, ContextResult, SummaryRef};
pub use error::{ContextError, Result};
pub use formatter::{MessageFormatter, OpenAIFormatter};
pub use instructions::inject_instructions;
pub use llm_summarizer::LlmSummarizer;
pub use message::{CachedSummary, ContextMessage};
pub use packer::{pack_context, PackedContext, TokenWeighted, REPLY_PRIMING_TOKENS};
pub use summary::{SummaryCoordinator, SummaryInputs, SummaryOutcome, SummaryResolution, Summarizer};
pub use templates::DEFAULT_SUMMARIZATION_PROMPT;
pub use thread::{thread_messages, thread_messages_with};
pub use token_map::{build_token_count_map, SummaryEntry, TokenCountMap, TokenCountMapResult};
pub use tokens::TokenCounter;
pub use writeback::{apply_writeback, plan_writeback, WritebackReport};
