use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use contexta_llm::{ChatClient, ChatOptions, ChatRequest, Message};
use contexta_types::ContextConfig;

use crate::message::ContextMessage;
use crate::summary::{SummaryOutcome, Summarizer};
use crate::templates::DEFAULT_SUMMARIZATION_PROMPT;
use crate::tokens::TokenCounter;

/// [`Summarizer`] backed by a chat model
pub struct LlmSummarizer {
    client: Arc<dyn ChatClient>,
    model: String,
    counter: TokenCounter,
    prompt_template: String,
}

impl LlmSummarizer {
    pub fn new(client: Arc<dyn ChatClient>, config: &ContextConfig) -> crate::Result<Self> {
        Ok(Self {
            client,
            model: config.summary_model().to_string(),
            counter: TokenCounter::new(config.token_rules.clone())?,
            prompt_template: DEFAULT_SUMMARIZATION_PROMPT.to_string(),
        })
    }

    pub fn with_prompt_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = template.into();
        self
    }

    fn build_prompt(&self, messages: &[ContextMessage]) -> String {
        // A refined prefix that starts at a summary root continues that summary
        let previous_summary = messages
            .first()
            .and_then(|m| m.summary.as_ref())
            .map(|s| s.content.as_str());

        let conversation = messages
            .iter()
            .filter(|m| m.summary.is_none())
            .map(|m| {
                let role = match m.message.role() {
                    "user" => "User",
                    "assistant" => "Assistant",
                    "system" => "System",
                    _ => "Tool",
                };
                let text = m.message.content().map(|c| c.to_plain_text()).unwrap_or_default();
                format!("{}: {}", role, text)
            })
            .collect::<Vec<_>>()
            .join("\n");

        self.prompt_template
            .replace("<previous_summary>", previous_summary.unwrap_or("None"))
            + &format!("\n\nConversation:\n{}", conversation)
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(
        &self,
        messages_to_refine: &[ContextMessage],
        remaining_tokens: usize,
    ) -> Result<SummaryOutcome> {
        let prompt = self.build_prompt(messages_to_refine);
        let max_tokens = u32::try_from(remaining_tokens).unwrap_or(u32::MAX);

        let request = ChatRequest::new(self.model.clone(), vec![Message::human(prompt)])
            .with_options(ChatOptions::new().max_tokens(max_tokens));

        let response = self.client.chat(request).await?;
        let summary = response
            .content
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| anyhow::anyhow!("Summarizer returned no content"))?;

        let message = Message::system(summary);
        let token_count = self.counter.count(&message, Some(&self.model));

        Ok(SummaryOutcome { message, token_count })
    }
}
