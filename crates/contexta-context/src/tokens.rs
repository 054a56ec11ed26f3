use std::sync::{Arc, OnceLock};

use contexta_llm::Message;
use contexta_types::{TokenOverhead, TokenRules};
use serde_json::Value;
use tiktoken_rs::{cl100k_base, CoreBPE};

use crate::error::{ContextError, Result};

static BPE: OnceLock<Arc<CoreBPE>> = OnceLock::new();

fn shared_bpe() -> Result<Arc<CoreBPE>> {
    if let Some(bpe) = BPE.get() {
        return Ok(Arc::clone(bpe));
    }
    let bpe = Arc::new(cl100k_base().map_err(|e| ContextError::Tokenizer(e.to_string()))?);
    // A concurrent initializer may have won; either instance is identical.
    Ok(Arc::clone(BPE.get_or_init(|| bpe)))
}

/// Per-message token accounting
///
/// A message costs its model's `tokens_per_message`, plus the BPE length of
/// every scalar field of its wire shape, plus `tokens_per_name` when a `name`
/// field is present. Image parts cost nothing. Stateless once built; share
/// freely across tasks.
#[derive(Clone)]
pub struct TokenCounter {
    bpe: Arc<CoreBPE>,
    rules: TokenRules,
}

impl TokenCounter {
    pub fn new(rules: TokenRules) -> Result<Self> {
        Ok(Self {
            bpe: shared_bpe()?,
            rules,
        })
    }

    pub fn rules(&self) -> &TokenRules {
        &self.rules
    }

    pub fn overhead_for(&self, model: Option<&str>) -> TokenOverhead {
        self.rules.overhead_for(model)
    }

    /// BPE length of raw text
    pub fn count_text(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        self.bpe.encode_with_special_tokens(text).len()
    }

    /// Token cost of one message for `model`
    pub fn count(&self, message: &Message, model: Option<&str>) -> usize {
        let overhead = self.overhead_for(model);

        let value = match serde_json::to_value(message) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "message not serializable, counting framing only");
                return overhead.tokens_per_message.max(0) as usize;
            }
        };

        let mut total = overhead.tokens_per_message;
        if let Value::Object(fields) = &value {
            for (key, field) in fields {
                total += self.count_value(field) as i64;
                if key == "name" {
                    total += overhead.tokens_per_name;
                }
            }
        }

        total.max(0) as usize
    }

    /// Cost of a completion, counted as an assistant message
    pub fn count_response(&self, text: &str, model: Option<&str>) -> usize {
        self.count(&Message::ai(text), model)
    }

    fn count_value(&self, value: &Value) -> usize {
        match value {
            Value::Null => 0,
            Value::String(s) => self.count_text(s),
            Value::Number(n) => self.count_text(&n.to_string()),
            Value::Bool(b) => self.count_text(if *b { "true" } else { "false" }),
            Value::Array(items) => items.iter().map(|item| self.count_value(item)).sum(),
            Value::Object(fields) => {
                if is_media(fields) {
                    return 0;
                }
                fields
                    .iter()
                    .filter(|(key, _)| key.as_str() != "type")
                    .map(|(_, field)| self.count_value(field))
                    .sum()
            }
        }
    }
}

fn is_media(fields: &serde_json::Map<String, Value>) -> bool {
    matches!(
        fields.get("type").and_then(Value::as_str),
        Some("image_url") | Some("image")
    )
}

impl std::fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCounter")
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}
