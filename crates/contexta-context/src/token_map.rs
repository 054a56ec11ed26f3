use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::message::ContextMessage;
use crate::summary::SummaryOutcome;

/// Summary to persist on an existing stored message
///
/// Not a new message: the caller writes `content`/`token_count` into the
/// summary fields of `message_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub message_id: String,
    pub content: String,
    pub token_count: usize,
}

/// Message id -> token count for every stored message of the thread
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenCountMap {
    pub counts: BTreeMap<String, usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_message: Option<SummaryEntry>,
}

impl TokenCountMap {
    pub fn get(&self, message_id: &str) -> Option<usize> {
        self.counts.get(message_id).copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenCountMapResult {
    pub map: TokenCountMap,
    pub prompt_tokens: usize,
}

/// Build the writeback map for `ordered` (instructions included).
///
/// Entries without an id are skipped. A freshly generated summary is
/// attached to the message at `boundary_index`. A negative
/// `remaining_tokens` yields `prompt_tokens` above `max_context_tokens`.
pub fn build_token_count_map(
    ordered: &[ContextMessage],
    generated: Option<&SummaryOutcome>,
    boundary_index: Option<usize>,
    max_context_tokens: usize,
    remaining_tokens: i64,
) -> TokenCountMapResult {
    let mut map = TokenCountMap::default();

    for (index, message) in ordered.iter().enumerate() {
        let Some(message_id) = &message.message_id else {
            continue;
        };

        if let Some(summary) = generated {
            if boundary_index == Some(index) {
                map.summary_message = Some(SummaryEntry {
                    message_id: message_id.clone(),
                    content: summary
                        .message
                        .content()
                        .map(|c| c.to_plain_text())
                        .unwrap_or_default(),
                    token_count: summary.token_count,
                });
            }
        }

        map.counts.insert(message_id.clone(), message.token_count);
    }

    TokenCountMapResult {
        map,
        prompt_tokens: (max_context_tokens as i64 - remaining_tokens).max(0) as usize,
    }
}
