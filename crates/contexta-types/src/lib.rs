pub mod config;

pub use config::{ContextConfig, TokenOverhead, TokenRules, LEGACY_GPT35_MODEL};
