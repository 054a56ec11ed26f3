use std::collections::HashMap;
use std::sync::Arc;

use contexta_llm::Message;
use contexta_persist::{MessageUpdate, PersistError, PersistenceClient, StoredMessage};
use contexta_types::ContextConfig;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{ContextError, Result};
use crate::formatter::{MessageFormatter, OpenAIFormatter};
use crate::instructions::inject_instructions;
use crate::message::{CachedSummary, ContextMessage};
use crate::packer::pack_context;
use crate::summary::{SummaryCoordinator, SummaryInputs, Summarizer};
use crate::thread::thread_messages_with;
use crate::token_map::{build_token_count_map, TokenCountMap, TokenCountMapResult};
use crate::tokens::TokenCounter;
use crate::writeback::{apply_writeback, plan_writeback, WritebackReport};

/// Most recent summary seen in a conversation's thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRef {
    pub message_id: String,
    pub content: String,
    pub token_count: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ContextRequest {
    pub conversation_id: String,
    pub leaf_message_id: String,
    pub instructions: Option<Message>,
}

impl ContextRequest {
    pub fn new(conversation_id: impl Into<String>, leaf_message_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            leaf_message_id: leaf_message_id.into(),
            instructions: None,
        }
    }

    pub fn with_instructions(mut self, instructions: Message) -> Self {
        self.instructions = Some(instructions);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextResult {
    /// Messages to send, possibly led by a summary
    pub payload: Vec<Message>,
    pub token_count_map: TokenCountMap,
    pub prompt_tokens: usize,
    /// Full ordered thread with instructions, before packing
    pub ordered_messages: Vec<ContextMessage>,
    pub used_cached_summary: bool,
    /// Store updates to apply with [`ContextAssembler::spawn_writeback`]
    pub pending_updates: Vec<MessageUpdate>,
}

/// Builds token-bounded payloads from a conversation tree
///
/// Threads the leaf's path, injects instructions, packs the newest messages
/// into the budget, then folds in a cached or fresh summary of what was cut.
pub struct ContextAssembler {
    store: Arc<dyn PersistenceClient>,
    formatter: Arc<dyn MessageFormatter>,
    summarizer: Option<Arc<dyn Summarizer>>,
    previous_summaries: RwLock<HashMap<String, SummaryRef>>,
}

impl ContextAssembler {
    pub fn new(store: Arc<dyn PersistenceClient>) -> Self {
        Self {
            store,
            formatter: Arc::new(OpenAIFormatter::default()),
            summarizer: None,
            previous_summaries: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_formatter(mut self, formatter: Arc<dyn MessageFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn store(&self) -> &Arc<dyn PersistenceClient> {
        &self.store
    }

    /// Summary currently tracked for `conversation_id`
    pub async fn previous_summary(&self, conversation_id: &str) -> Option<SummaryRef> {
        self.previous_summaries.read().await.get(conversation_id).cloned()
    }

    pub async fn build_context(
        &self,
        request: ContextRequest,
        config: &ContextConfig,
        cancel: &CancellationToken,
    ) -> Result<ContextResult> {
        let ContextRequest {
            conversation_id,
            leaf_message_id,
            instructions,
        } = request;

        let summarizer = match (&self.summarizer, config.summarize) {
            (Some(summarizer), true) => Some(Arc::as_ref(summarizer)),
            (None, true) => {
                tracing::warn!(%conversation_id, "summarization requested but no summarizer configured");
                None
            }
            _ => None,
        };
        let stop_at_summary = summarizer.is_some();

        ensure_active(cancel)?;
        let snapshot = self.store.get_messages(&conversation_id).await?;

        let counter = TokenCounter::new(config.token_rules.clone())?;
        let model = Some(config.model.as_str());

        let thread: Vec<(StoredMessage, ContextMessage)> = thread_messages_with(
            &snapshot,
            &leaf_message_id,
            stop_at_summary,
            |stored| {
                let message = self.formatter.format_message(&stored);
                let token_count = stored
                    .token_count
                    .unwrap_or_else(|| counter.count(&message, model));
                let mut entry = ContextMessage::new(Some(stored.message_id.clone()), message, token_count);
                if let Some(content) = &stored.summary {
                    entry = entry.with_summary(CachedSummary {
                        content: content.clone(),
                        token_count: stored.summary_token_count.unwrap_or(0),
                    });
                }
                (stored, entry)
            },
        );

        if thread.is_empty() {
            tracing::debug!(%conversation_id, %leaf_message_id, "leaf not found, empty thread");
        }

        if stop_at_summary {
            self.track_previous_summary(&conversation_id, &thread).await;
        }
        let previous_summary_id = self
            .previous_summary(&conversation_id)
            .await
            .map(|s| s.message_id);

        let summary_root_id = if stop_at_summary {
            thread
                .first()
                .filter(|(stored, _)| stored.summary.is_some())
                .map(|(stored, _)| stored.message_id.clone())
        } else {
            None
        };

        let (stored_thread, formatted): (Vec<StoredMessage>, Vec<ContextMessage>) =
            thread.into_iter().unzip();

        let instructions = instructions
            .filter(|m| m.content().map_or(false, |c| !c.to_plain_text().trim().is_empty()))
            .map(|m| {
                let token_count = counter.count(&m, model);
                tracing::debug!(token_count, "instructions");
                ContextMessage::new(None, m, token_count)
            });
        let ordered = inject_instructions(formatted, instructions);

        ensure_active(cancel)?;
        let packed = pack_context(&ordered, config.max_context_tokens);

        let coordinator = SummaryCoordinator::new(summarizer);
        let resolution = coordinator
            .resolve(
                SummaryInputs {
                    payload_len: ordered.len(),
                    context: &packed.context,
                    messages_to_refine: &packed.messages_to_refine,
                    boundary: packed.boundary_index.map(|i| &ordered[i]),
                    latest: ordered.last(),
                    previous_summary_id: previous_summary_id.as_deref(),
                    remaining_tokens: packed.remaining_tokens,
                    max_context_tokens: config.max_context_tokens,
                },
                cancel,
            )
            .await?;

        ensure_active(cancel)?;
        let TokenCountMapResult { map, prompt_tokens } = build_token_count_map(
            &ordered,
            resolution.generated.as_ref(),
            packed.boundary_index,
            config.max_context_tokens,
            resolution.remaining_tokens,
        );

        let pending_updates = plan_writeback(
            &conversation_id,
            &stored_thread,
            &map,
            summary_root_id.as_deref(),
        );

        tracing::debug!(
            %conversation_id,
            payload = resolution.payload.len(),
            prompt_tokens,
            used_cached_summary = resolution.used_cached_summary,
            "context built"
        );

        Ok(ContextResult {
            payload: resolution.payload,
            token_count_map: map,
            prompt_tokens,
            ordered_messages: ordered,
            used_cached_summary: resolution.used_cached_summary,
            pending_updates,
        })
    }

    /// Write token counts and summaries back without blocking the caller.
    ///
    /// Nothing is written if `cancel` fires before the task starts.
    pub fn spawn_writeback(
        &self,
        updates: Vec<MessageUpdate>,
        cancel: CancellationToken,
    ) -> JoinHandle<std::result::Result<WritebackReport, PersistError>> {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if cancel.is_cancelled() {
                tracing::debug!("writeback skipped, request cancelled");
                return Ok(WritebackReport::default());
            }
            apply_writeback(store.as_ref(), updates).await
        })
    }

    async fn track_previous_summary(
        &self,
        conversation_id: &str,
        thread: &[(StoredMessage, ContextMessage)],
    ) {
        let latest = thread.iter().rev().find_map(|(stored, _)| {
            stored.summary.as_ref().map(|content| SummaryRef {
                message_id: stored.message_id.clone(),
                content: content.clone(),
                token_count: stored.summary_token_count,
            })
        });

        if let Some(summary) = latest {
            self.previous_summaries
                .write()
                .await
                .insert(conversation_id.to_string(), summary);
        }
    }
}

fn ensure_active(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(ContextError::Cancelled);
    }
    Ok(())
}
