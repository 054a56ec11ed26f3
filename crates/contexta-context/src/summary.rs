use async_trait::async_trait;
use contexta_llm::Message;
use tokio_util::sync::CancellationToken;

use crate::error::{ContextError, Result};
use crate::message::ContextMessage;

/// A freshly generated summary of the excluded prefix
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryOutcome {
    pub message: Message,
    pub token_count: usize,
}

/// External summarizer
///
/// Called at most once per context build with the excluded prefix and the
/// tokens still available.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        messages_to_refine: &[ContextMessage],
        remaining_tokens: usize,
    ) -> anyhow::Result<SummaryOutcome>;
}

/// Inputs to one summary decision
#[derive(Debug, Clone, Copy)]
pub struct SummaryInputs<'a> {
    /// Length of the full formatted list before packing (instructions included)
    pub payload_len: usize,
    /// Packed suffix
    pub context: &'a [ContextMessage],
    pub messages_to_refine: &'a [ContextMessage],
    /// Newest excluded message
    pub boundary: Option<&'a ContextMessage>,
    /// Most recent message in the thread, for overflow reporting
    pub latest: Option<&'a ContextMessage>,
    pub previous_summary_id: Option<&'a str>,
    pub remaining_tokens: usize,
    pub max_context_tokens: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryResolution {
    /// Packed messages, prefixed by a summary when one applies
    pub payload: Vec<Message>,
    /// Negative when a summary costs more than the packed budget left over
    pub remaining_tokens: i64,
    pub used_cached_summary: bool,
    /// Set only when the summarizer produced a new summary
    pub generated: Option<SummaryOutcome>,
}

/// Decides whether the excluded prefix is covered by a cached summary, needs
/// a fresh one, or is simply dropped.
pub struct SummaryCoordinator<'a> {
    summarizer: Option<&'a dyn Summarizer>,
}

impl<'a> SummaryCoordinator<'a> {
    /// `None` disables summarization
    pub fn new(summarizer: Option<&'a dyn Summarizer>) -> Self {
        Self { summarizer }
    }

    pub fn summarization_enabled(&self) -> bool {
        self.summarizer.is_some()
    }

    pub async fn resolve(
        &self,
        inputs: SummaryInputs<'_>,
        cancel: &CancellationToken,
    ) -> Result<SummaryResolution> {
        let diff = inputs.payload_len.saturating_sub(inputs.context.len());
        let mut payload: Vec<Message> = inputs.context.iter().map(|m| m.message.clone()).collect();
        let remaining_tokens = inputs.remaining_tokens;

        tracing::debug!(diff, remaining_tokens, "resolving summary");

        if payload.is_empty() && !self.summarization_enabled() {
            if let Some(latest) = inputs.latest {
                return Err(ContextError::BudgetExceeded {
                    token_count: latest.token_count,
                    max_context_tokens: inputs.max_context_tokens,
                });
            }
        }

        // Cached summaries only stand in for history while summarization is on
        let cached = self
            .summarization_enabled()
            .then(|| reusable_summary(&inputs, diff))
            .flatten();
        if let Some(cached) = cached {
            tracing::debug!(
                message_id = ?inputs.previous_summary_id,
                token_count = cached.token_count,
                "reusing cached summary"
            );
            payload.insert(0, Message::system(cached.content.clone()));
            return Ok(SummaryResolution {
                payload,
                remaining_tokens: deduct(remaining_tokens, cached.token_count),
                used_cached_summary: true,
                generated: None,
            });
        }

        let Some(summarizer) = self.summarizer else {
            return Ok(passthrough(payload, remaining_tokens));
        };
        if inputs.messages_to_refine.is_empty() {
            return Ok(passthrough(payload, remaining_tokens));
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ContextError::Cancelled),
            outcome = summarizer.summarize(inputs.messages_to_refine, remaining_tokens) => {
                outcome.map_err(ContextError::Summarizer)?
            }
        };

        tracing::info!(
            refined = inputs.messages_to_refine.len(),
            token_count = outcome.token_count,
            "generated summary"
        );
        payload.insert(0, outcome.message.clone());

        Ok(SummaryResolution {
            payload,
            remaining_tokens: deduct(remaining_tokens, outcome.token_count),
            used_cached_summary: false,
            generated: Some(outcome),
        })
    }
}

fn reusable_summary<'a>(
    inputs: &SummaryInputs<'a>,
    diff: usize,
) -> Option<&'a crate::message::CachedSummary> {
    if diff != 1 {
        return None;
    }
    let boundary = inputs.boundary?;
    let cached = boundary.summary.as_ref()?;
    let boundary_id = boundary.message_id.as_deref()?;
    (Some(boundary_id) == inputs.previous_summary_id).then_some(cached)
}

fn passthrough(payload: Vec<Message>, remaining_tokens: usize) -> SummaryResolution {
    SummaryResolution {
        payload,
        remaining_tokens: remaining_tokens as i64,
        used_cached_summary: false,
        generated: None,
    }
}

/// Remaining budget after prepending a summary. Goes negative on overrun so
/// the reported prompt size stays the real one.
fn deduct(remaining_tokens: usize, summary_tokens: usize) -> i64 {
    let remaining = remaining_tokens as i64 - summary_tokens as i64;
    if remaining < 0 {
        tracing::warn!(
            summary_tokens,
            remaining_tokens,
            "summary is larger than the remaining budget"
        );
    }
    remaining
}
