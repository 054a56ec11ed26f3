use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Model id whose framing constants differ from every other chat model
pub const LEGACY_GPT35_MODEL: &str = "gpt-3.5-turbo-0301";

/// Fixed per-message framing cost for one model family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenOverhead {
    pub tokens_per_message: i64,
    pub tokens_per_name: i64,
}

impl Default for TokenOverhead {
    fn default() -> Self {
        Self {
            tokens_per_message: 3,
            tokens_per_name: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOverhead {
    pub model: String,
    #[serde(flatten)]
    pub overhead: TokenOverhead,
}

/// Model id -> framing constants
///
/// Lookup order: exact id, then the longest configured prefix, then `default`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRules {
    #[serde(default)]
    pub default: TokenOverhead,
    #[serde(default)]
    pub models: Vec<ModelOverhead>,
}

impl Default for TokenRules {
    fn default() -> Self {
        Self {
            default: TokenOverhead::default(),
            models: vec![ModelOverhead {
                model: LEGACY_GPT35_MODEL.to_string(),
                overhead: TokenOverhead {
                    tokens_per_message: 4,
                    tokens_per_name: -1,
                },
            }],
        }
    }
}

impl TokenRules {
    /// Rule table with only the default constants
    pub fn uniform(default: TokenOverhead) -> Self {
        Self {
            default,
            models: Vec::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>, overhead: TokenOverhead) -> Self {
        let model = model.into();
        self.models.retain(|m| m.model != model);
        self.models.push(ModelOverhead { model, overhead });
        self
    }

    pub fn overhead_for(&self, model: Option<&str>) -> TokenOverhead {
        let Some(model) = model else {
            return self.default;
        };

        if let Some(exact) = self.models.iter().find(|m| m.model == model) {
            return exact.overhead;
        }

        self.models
            .iter()
            .filter(|m| model.starts_with(m.model.as_str()))
            .max_by_key(|m| m.model.len())
            .map(|m| m.overhead)
            .unwrap_or(self.default)
    }
}

/// Per-request context assembly settings
///
/// Passed explicitly into every call; nothing reads ambient state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    pub model: String,
    pub max_context_tokens: usize,
    /// Summarize the prefix that no longer fits instead of failing
    #[serde(default)]
    pub summarize: bool,
    /// Model used by the LLM summarizer (falls back to `model`)
    #[serde(default)]
    pub summary_model: Option<String>,
    #[serde(default)]
    pub token_rules: TokenRules,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_context_tokens: 8_000,
            summarize: false,
            summary_model: None,
            token_rules: TokenRules::default(),
        }
    }
}

impl ContextConfig {
    pub fn new(model: impl Into<String>, max_context_tokens: usize) -> Self {
        Self {
            model: model.into(),
            max_context_tokens,
            ..Self::default()
        }
    }

    pub fn with_summarize(mut self, enabled: bool) -> Self {
        self.summarize = enabled;
        self
    }

    pub fn with_summary_model(mut self, model: impl Into<String>) -> Self {
        self.summary_model = Some(model.into());
        self
    }

    pub fn with_token_rules(mut self, rules: TokenRules) -> Self {
        self.token_rules = rules;
        self
    }

    pub fn summary_model(&self) -> &str {
        self.summary_model.as_deref().unwrap_or(&self.model)
    }

    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. Environment variables prefixed with CONTEXT_ (e.g. CONTEXT_MAX_CONTEXT_TOKENS)
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("CONTEXT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_overhead() {
        let rules = TokenRules::default();
        assert_eq!(rules.overhead_for(Some("gpt-4o")), TokenOverhead::default());
        assert_eq!(rules.overhead_for(None), TokenOverhead::default());
    }

    #[test]
    fn test_legacy_model_overhead() {
        let rules = TokenRules::default();
        let legacy = rules.overhead_for(Some(LEGACY_GPT35_MODEL));
        assert_eq!(legacy.tokens_per_message, 4);
        assert_eq!(legacy.tokens_per_name, -1);
    }

    #[test]
    fn test_longest_prefix_wins() {
        let rules = TokenRules::uniform(TokenOverhead::default())
            .with_model("claude", TokenOverhead { tokens_per_message: 5, tokens_per_name: 0 })
            .with_model("claude-3", TokenOverhead { tokens_per_message: 7, tokens_per_name: 2 });

        assert_eq!(rules.overhead_for(Some("claude-3-haiku")).tokens_per_message, 7);
        assert_eq!(rules.overhead_for(Some("claude-2.1")).tokens_per_message, 5);
        assert_eq!(rules.overhead_for(Some("gpt-4")).tokens_per_message, 3);
    }

    #[test]
    fn test_with_model_replaces_existing_rule() {
        let rules = TokenRules::default().with_model(
            LEGACY_GPT35_MODEL,
            TokenOverhead { tokens_per_message: 9, tokens_per_name: 9 },
        );
        assert_eq!(rules.models.len(), 1);
        assert_eq!(rules.overhead_for(Some(LEGACY_GPT35_MODEL)).tokens_per_message, 9);
    }

    #[test]
    fn test_config_structure() {
        let toml = r#"
            model = "gpt-4"
            max_context_tokens = 4096
            summarize = true

            [token_rules.default]
            tokens_per_message = 3
            tokens_per_name = 1

            [[token_rules.models]]
            model = "gpt-3.5-turbo-0301"
            tokens_per_message = 4
            tokens_per_name = -1
        "#;

        let config: ContextConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.max_context_tokens, 4096);
        assert!(config.summarize);
        assert_eq!(config.summary_model(), "gpt-4");
        assert_eq!(config.token_rules, TokenRules::default());
    }

    #[test]
    fn test_config_defaults_when_optional_fields_missing() {
        let config: ContextConfig = toml::from_str(
            r#"
            model = "gpt-4o"
            max_context_tokens = 1000
        "#,
        )
        .unwrap();

        assert!(!config.summarize);
        assert_eq!(config.summary_model, None);
        assert_eq!(config.token_rules, TokenRules::default());
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!(
            "contexta-config-{}.toml",
            std::process::id()
        ));
        std::fs::write(
            &path,
            "model = \"gpt-4o\"\nmax_context_tokens = 2048\nsummary_model = \"gpt-4o-mini\"\n",
        )
        .unwrap();

        let config = ContextConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.max_context_tokens, 2048);
        assert_eq!(config.summary_model(), "gpt-4o-mini");
    }
}
