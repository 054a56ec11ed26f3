use std::collections::{HashMap, HashSet};

use contexta_persist::{MessageRole, StoredMessage};

/// Rebuild the root -> leaf path ending at `start_id`.
///
/// Walks parent pointers over an id-indexed snapshot. A missing parent ends
/// the walk, as does an id seen before, so corrupt or cyclic chains yield
/// the partial path instead of an error. With `stop_at_summary`, the first
/// message carrying a summary becomes a synthetic system root holding that
/// summary and the walk ends there.
pub fn thread_messages(
    messages: &[StoredMessage],
    start_id: &str,
    stop_at_summary: bool,
) -> Vec<StoredMessage> {
    thread_messages_with(messages, start_id, stop_at_summary, |message| message)
}

/// Same walk as [`thread_messages`], with `project` applied to each message
/// of the final chronological path.
pub fn thread_messages_with<T, F>(
    messages: &[StoredMessage],
    start_id: &str,
    stop_at_summary: bool,
    project: F,
) -> Vec<T>
where
    F: FnMut(StoredMessage) -> T,
{
    let mut by_id: HashMap<&str, &StoredMessage> = HashMap::with_capacity(messages.len());
    for message in messages {
        by_id.entry(message.message_id.as_str()).or_insert(message);
    }

    let mut visited: HashSet<&str> = HashSet::new();
    let mut ordered: Vec<StoredMessage> = Vec::new();
    let mut current = Some(start_id);

    while let Some(id) = current {
        let Some(&message) = by_id.get(id) else {
            if !ordered.is_empty() {
                tracing::debug!(missing = %id, "parent not in snapshot, thread ends here");
            }
            break;
        };

        if !visited.insert(message.message_id.as_str()) {
            tracing::warn!(
                message_id = %message.message_id,
                conversation_id = %message.conversation_id,
                "cyclic parent chain, thread ends here"
            );
            break;
        }

        if stop_at_summary {
            if let Some(summary) = &message.summary {
                ordered.push(summary_root(message, summary));
                break;
            }
        }

        ordered.push(message.clone());
        current = message
            .has_parent()
            .then_some(message.parent_message_id.as_str());
    }

    ordered.reverse();
    ordered.into_iter().map(project).collect()
}

fn summary_root(message: &StoredMessage, summary: &str) -> StoredMessage {
    StoredMessage {
        role: MessageRole::System,
        text: summary.to_string(),
        content: None,
        token_count: message.summary_token_count,
        ..message.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contexta_persist::NO_PARENT;

    fn chain(n: usize) -> Vec<StoredMessage> {
        (0..n)
            .map(|i| {
                let parent = if i == 0 {
                    NO_PARENT.to_string()
                } else {
                    format!("m{}", i - 1)
                };
                StoredMessage::user("c1", parent, format!("turn {}", i)).with_id(format!("m{}", i))
            })
            .collect()
    }

    fn ids(messages: &[StoredMessage]) -> Vec<&str> {
        messages.iter().map(|m| m.message_id.as_str()).collect()
    }

    #[test]
    fn test_acyclic_chain_in_order() {
        let mut messages = chain(5);
        messages.reverse();
        let thread = thread_messages(&messages, "m4", false);
        assert_eq!(ids(&thread), vec!["m0", "m1", "m2", "m3", "m4"]);
    }

    #[test]
    fn test_branch_follows_only_leaf_path() {
        let mut messages = chain(3);
        messages.push(StoredMessage::assistant("c1", "m1", "other branch").with_id("b2"));
        let thread = thread_messages(&messages, "b2", false);
        assert_eq!(ids(&thread), vec!["m0", "m1", "b2"]);
    }

    #[test]
    fn test_two_node_cycle_terminates() {
        let messages = vec![
            StoredMessage::user("c1", "b", "a").with_id("a"),
            StoredMessage::assistant("c1", "a", "b").with_id("b"),
        ];
        let thread = thread_messages(&messages, "a", false);
        assert_eq!(ids(&thread), vec!["b", "a"]);
    }

    #[test]
    fn test_self_parent_terminates() {
        let messages = vec![StoredMessage::user("c1", "a", "loop").with_id("a")];
        let thread = thread_messages(&messages, "a", false);
        assert_eq!(ids(&thread), vec!["a"]);
    }

    #[test]
    fn test_missing_parent_keeps_partial_thread() {
        let messages = vec![
            StoredMessage::user("c1", "gone", "orphan").with_id("m1"),
            StoredMessage::assistant("c1", "m1", "reply").with_id("m2"),
        ];
        let thread = thread_messages(&messages, "m2", false);
        assert_eq!(ids(&thread), vec!["m1", "m2"]);
    }

    #[test]
    fn test_root_sentinel_ends_walk() {
        let mut messages = chain(2);
        // A stray record stored under the sentinel id is never reached
        messages.push(StoredMessage::user("c1", "m1", "stray").with_id(NO_PARENT));
        let thread = thread_messages(&messages, "m1", false);
        assert_eq!(ids(&thread), vec!["m0", "m1"]);
        assert!(!thread[0].has_parent());
        assert!(thread[1].has_parent());
    }

    #[test]
    fn test_unknown_start_is_empty() {
        assert!(thread_messages(&chain(3), "nope", false).is_empty());
        assert!(thread_messages(&[], "m0", false).is_empty());
    }

    #[test]
    fn test_stop_at_summary_rewrites_root() {
        let mut messages = chain(4);
        messages[1] = messages[1].clone().with_token_count(40).with_summary("we said hi", 6);

        let thread = thread_messages(&messages, "m3", true);
        assert_eq!(ids(&thread), vec!["m1", "m2", "m3"]);
        assert_eq!(thread[0].role, MessageRole::System);
        assert_eq!(thread[0].text, "we said hi");
        assert_eq!(thread[0].token_count, Some(6));
        assert_eq!(thread[0].summary.as_deref(), Some("we said hi"));
    }

    #[test]
    fn test_summary_ignored_without_stop_flag() {
        let mut messages = chain(3);
        messages[1] = messages[1].clone().with_summary("we said hi", 6);

        let thread = thread_messages(&messages, "m2", false);
        assert_eq!(thread.len(), 3);
        assert_eq!(thread[1].role, MessageRole::User);
        assert_eq!(thread[1].text, "turn 1");
    }

    #[test]
    fn test_projection_does_not_change_traversal() {
        let messages = chain(4);
        let projected = thread_messages_with(&messages, "m2", false, |m| m.text);
        assert_eq!(projected, vec!["turn 0", "turn 1", "turn 2"]);
    }
}
