use contexta_llm::Message;
use contexta_persist::{MessageRole, StoredMessage};

/// Projects a stored message into a provider's wire shape
pub trait MessageFormatter: Send + Sync {
    fn format_message(&self, message: &StoredMessage) -> Message;
}

/// OpenAI-style chat formatting
///
/// With `sender_names`, generated turns carry their sender as the `name`
/// field (restricted to `[A-Za-z0-9_-]`).
#[derive(Debug, Clone, Default)]
pub struct OpenAIFormatter {
    sender_names: bool,
}

impl OpenAIFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sender_names(mut self, enabled: bool) -> Self {
        self.sender_names = enabled;
        self
    }
}

impl MessageFormatter for OpenAIFormatter {
    fn format_message(&self, message: &StoredMessage) -> Message {
        let content = message.effective_content();
        let formatted = match message.role {
            MessageRole::System => Message::system(content),
            MessageRole::User => Message::human(content),
            MessageRole::Assistant => Message::ai(content),
        };

        if self.sender_names && !message.is_created_by_user && message.role != MessageRole::System {
            let name = sanitize_name(&message.sender);
            if !name.is_empty() {
                return formatted.with_name(name);
            }
        }
        formatted
    }
}

fn sanitize_name(sender: &str) -> String {
    sender
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use contexta_llm::{Content, ContentPart};
    use contexta_persist::NO_PARENT;

    #[test]
    fn test_roles_map_to_wire_roles() {
        let formatter = OpenAIFormatter::new();
        let user = StoredMessage::user("c", NO_PARENT, "hi");
        let assistant = StoredMessage::assistant("c", "x", "hello");
        let mut system = StoredMessage::assistant("c", "x", "summary");
        system.role = MessageRole::System;

        assert_eq!(formatter.format_message(&user), Message::human("hi"));
        assert_eq!(formatter.format_message(&assistant), Message::ai("hello"));
        assert_eq!(formatter.format_message(&system), Message::system("summary"));
    }

    #[test]
    fn test_structured_content_wins() {
        let formatter = OpenAIFormatter::new();
        let message = StoredMessage::user("c", NO_PARENT, "fallback")
            .with_content(vec![ContentPart::text("look"), ContentPart::image_url("https://x/y.png")]);

        let formatted = formatter.format_message(&message);
        assert!(matches!(formatted.content(), Some(Content::Parts(parts)) if parts.len() == 2));
    }

    #[test]
    fn test_sender_names() {
        let formatter = OpenAIFormatter::new().with_sender_names(true);
        let mut assistant = StoredMessage::assistant("c", "x", "hello");
        assistant.sender = "GPT 4.1".to_string();
        let user = StoredMessage::user("c", NO_PARENT, "hi");

        assert_eq!(formatter.format_message(&assistant).name(), Some("GPT_4_1"));
        assert_eq!(formatter.format_message(&user).name(), None);
    }
}
