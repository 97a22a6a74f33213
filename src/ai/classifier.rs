use std::sync::Arc;

use tracing::{info, warn};

use super::LanguageModel;
use super::parser::{ParseOutcome, parse_analysis};
use super::prompt_builder::{SYSTEM_INSTRUCTION, render_transcript};
use crate::core::models::{AnalysisResult, ThreadRecord};
use crate::errors::BridgeError;

/// Turns a fetched thread into an [`AnalysisResult`] with one model call.
pub struct ThreadClassifier {
    model: Arc<dyn LanguageModel>,
    max_prompt_chars: usize,
}

impl ThreadClassifier {
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel>, max_prompt_chars: usize) -> Self {
        Self {
            model,
            max_prompt_chars,
        }
    }

    /// # Errors
    ///
    /// [`BridgeError::ModelUnavailable`] when the model call fails, and
    /// [`BridgeError::ClassificationIncomplete`] or
    /// [`BridgeError::ClassificationInvalid`] when the answer does not parse.
    /// Nothing is retried.
    pub async fn classify(&self, record: &ThreadRecord) -> Result<AnalysisResult, BridgeError> {
        let transcript = render_transcript(record, self.max_prompt_chars);
        if transcript.omitted_replies > 0 {
            info!(
                thread_ts = %record.thread_ts,
                omitted = transcript.omitted_replies,
                "Thread exceeds prompt budget, dropping oldest replies"
            );
        }

        #[cfg(feature = "debug-logs")]
        tracing::debug!("Classification prompt:\n{}", transcript.body);

        let answer = self.model.complete(SYSTEM_INSTRUCTION, &transcript.body).await?;

        let outcome = parse_analysis(&answer);
        if !matches!(outcome, ParseOutcome::Parsed(_)) {
            warn!(
                thread_ts = %record.thread_ts,
                outcome = ?outcome,
                answer_chars = answer.chars().count(),
                "Model answer rejected"
            );
        }
        outcome.into_result()
    }
}
