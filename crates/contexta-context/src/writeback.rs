use std::collections::HashSet;

use contexta_persist::{MessageUpdate, PersistenceClient, Result, StoredMessage};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

use crate::token_map::TokenCountMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WritebackReport {
    /// Ids written, in plan order
    pub updated: Vec<String>,
    /// Id of the message that received a new summary
    pub summary_saved: Option<String>,
}

/// Plan the store updates for one context build.
///
/// One update per message id at most. Cached token counts are kept; only
/// messages without one get the computed count. `summary_root_id` is the
/// synthetic summary root of the thread, whose computed count belongs to its
/// summary rather than the message, so it never receives a token count.
pub fn plan_writeback(
    conversation_id: &str,
    thread: &[StoredMessage],
    map: &TokenCountMap,
    summary_root_id: Option<&str>,
) -> Vec<MessageUpdate> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut updates = Vec::new();

    for message in thread {
        let message_id = message.message_id.as_str();
        if !seen.insert(message_id) {
            continue;
        }

        let mut update = MessageUpdate::new(conversation_id, message_id);

        if let Some(summary) = map.summary_message.as_ref().filter(|s| s.message_id == message_id) {
            update.summary = Some(summary.content.clone());
            update.summary_token_count = Some(summary.token_count);
        }

        if message.token_count.is_none() && summary_root_id != Some(message_id) {
            update.token_count = map.get(message_id);
        }

        if !update.is_empty() {
            updates.push(update);
        }
    }

    updates
}

/// Apply planned updates concurrently. The first store failure is returned.
pub async fn apply_writeback(
    store: &dyn PersistenceClient,
    updates: Vec<MessageUpdate>,
) -> Result<WritebackReport> {
    let report = WritebackReport {
        updated: updates.iter().map(|u| u.message_id.clone()).collect(),
        summary_saved: updates
            .iter()
            .find(|u| u.summary.is_some())
            .map(|u| u.message_id.clone()),
    };

    try_join_all(updates.into_iter().map(|update| store.update_message(update))).await?;

    tracing::info!(
        updated = report.updated.len(),
        summary_saved = ?report.summary_saved,
        "writeback complete"
    );
    Ok(report)
}
