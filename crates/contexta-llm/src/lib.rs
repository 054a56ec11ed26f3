pub mod types;
pub mod traits;

pub use traits::{ChatClient, ChatOptions, ChatRequest, ChatResponse};
pub use types::{Content, ContentPart, FunctionCall, ImageUrl, Message, ToolCall};
