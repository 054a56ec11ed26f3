use serde::{Deserialize, Serialize};
use super::content::Content;
use super::tool::ToolCall;

/// Provider-facing message (OpenAI-style wire shape)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    /// System prompt (instructions, summaries)
    System {
        content: Content,

        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },

    /// User/Human message
    #[serde(rename = "user")]
    Human {
        content: Content,

        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },

    /// Assistant/AI message
    #[serde(rename = "assistant")]
    AI {
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<Content>,

        #[serde(skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<ToolCall>>,

        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },

    /// Tool result message
    Tool {
        tool_call_id: String,
        content: Content,
    },
}

impl Message {
    /// Create system message
    pub fn system(content: impl Into<Content>) -> Self {
        Self::System {
            content: content.into(),
            name: None,
        }
    }

    /// Create human message
    pub fn human(content: impl Into<Content>) -> Self {
        Self::Human {
            content: content.into(),
            name: None,
        }
    }

    /// Create AI message with text
    pub fn ai(content: impl Into<Content>) -> Self {
        Self::AI {
            content: Some(content.into()),
            tool_calls: None,
            name: None,
        }
    }

    /// Create AI message with tool calls
    pub fn ai_with_tools(tool_calls: Vec<ToolCall>) -> Self {
        Self::AI {
            content: None,
            tool_calls: Some(tool_calls),
            name: None,
        }
    }

    /// Create tool result message
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<Content>) -> Self {
        Self::Tool {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
        }
    }

    /// Attach a participant name. Tool results carry no name and are returned as-is.
    pub fn with_name(mut self, new_name: impl Into<String>) -> Self {
        match &mut self {
            Self::System { name, .. } | Self::Human { name, .. } | Self::AI { name, .. } => {
                *name = Some(new_name.into());
            }
            Self::Tool { .. } => {}
        }
        self
    }

    /// Get role as string
    pub fn role(&self) -> &str {
        match self {
            Self::System { .. } => "system",
            Self::Human { .. } => "user",
            Self::AI { .. } => "assistant",
            Self::Tool { .. } => "tool",
        }
    }

    pub fn content(&self) -> Option<&Content> {
        match self {
            Self::System { content, .. }
            | Self::Human { content, .. }
            | Self::Tool { content, .. } => Some(content),
            Self::AI { content, .. } => content.as_ref(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::System { name, .. } | Self::Human { name, .. } | Self::AI { name, .. } => {
                name.as_deref()
            }
            Self::Tool { .. } => None,
        }
    }
}
