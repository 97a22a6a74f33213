//! All AI/LLM functionality

pub mod classifier;
pub mod client;
pub mod parser;
pub mod prompt_builder;

use async_trait::async_trait;

use crate::errors::BridgeError;

// Re-export main types for convenience
pub use classifier::ThreadClassifier;
pub use client::GeminiClient;
pub use parser::{ParseOutcome, parse_analysis};

/// A text-completion model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Raw model output for `prompt` under `system` instructions.
    ///
    /// Transport, quota and auth failures are [`BridgeError::ModelUnavailable`].
    /// An answer with no text is `Ok("")`.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, BridgeError>;
}
