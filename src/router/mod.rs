//! Command routing: one mention in, exactly one thread reply out.

pub mod command;
pub mod dedup;
pub mod dispatcher;
pub mod pipeline;
pub mod replies;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use chrono_tz::Tz;
use tracing::{error, info, warn};

use crate::ai::{GeminiClient, LanguageModel, ThreadClassifier};
use crate::core::config::AppConfig;
use crate::core::models::MentionEvent;
use crate::errors::{BridgeError, Stage};
use crate::sheets::{SheetWriter, SheetsClient, SpreadsheetBackend, token_source_from_config};
use crate::slack::{ChatPlatform, SlackClient, ThreadFetcher, UserNameCache};

pub use command::{Command, parse_command};
pub use dedup::EventDeduplicator;
pub use dispatcher::Dispatcher;
pub use pipeline::{PipelineFailure, StorePipeline, StoredThread};

/// What a handled event turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOutcome {
    /// Redelivered event id, nothing posted.
    Duplicate,
    Help,
    Usage,
    Stored(Box<StoredThread>),
    Failed { stage: Stage, error: BridgeError },
}

pub struct CommandRouter {
    chat: Arc<dyn ChatPlatform>,
    fetcher: ThreadFetcher,
    classifier: ThreadClassifier,
    writer: SheetWriter,
    dedup: EventDeduplicator,
    timezone: Tz,
    forward_channel: Option<String>,
}

impl CommandRouter {
    #[must_use]
    pub fn new(
        chat: Arc<dyn ChatPlatform>,
        model: Arc<dyn LanguageModel>,
        sheets: Arc<dyn SpreadsheetBackend>,
        config: &AppConfig,
    ) -> Self {
        let names = Arc::new(UserNameCache::new());
        Self {
            fetcher: ThreadFetcher::new(Arc::clone(&chat), names),
            classifier: ThreadClassifier::new(model, config.max_prompt_chars),
            writer: SheetWriter::new(sheets, config.sheet_tab.clone()),
            dedup: EventDeduplicator::default(),
            timezone: config.sheet_timezone,
            forward_channel: config.forward_channel_id.clone(),
            chat,
        }
    }

    /// Wires the production Slack, Gemini and Sheets clients.
    ///
    /// # Errors
    ///
    /// Returns an error if any HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, BridgeError> {
        let timeout = Duration::from_secs(config.http_timeout_secs);

        let chat = SlackClient::new(config.slack_bot_token.clone(), &config.slack_api_base, timeout)?;
        let model = GeminiClient::new(
            config.llm_api_key.clone(),
            config.llm_model.clone(),
            &config.llm_api_base,
            timeout,
        )?;
        let sheets = SheetsClient::new(
            config.spreadsheet_id.clone(),
            token_source_from_config(&config.sheets_auth, timeout)?,
            &config.sheets_api_base,
            timeout,
        )?;

        Ok(Self::new(Arc::new(chat), Arc::new(model), Arc::new(sheets), config))
    }

    /// Handles one mention. Never fails: every error becomes a reply and a log line.
    pub async fn handle(&self, event: &MentionEvent) -> HandleOutcome {
        if !self.dedup.first_sighting(&event.event_id) {
            info!(event_id = %event.event_id, "Duplicate event, skipping");
            return HandleOutcome::Duplicate;
        }

        match parse_command(&event.raw_text) {
            Command::Help => {
                self.reply(event, replies::HELP_TEXT).await;
                HandleOutcome::Help
            }
            Command::Unrecognized => {
                let err = BridgeError::UnrecognizedCommand(command::strip_mentions(&event.raw_text));
                info!(event_id = %event.event_id, channel = %event.channel_id, error = %err, "No command matched");
                self.reply(event, replies::USAGE_HINT).await;
                HandleOutcome::Usage
            }
            Command::Store => self.store(event).await,
        }
    }

    async fn store(&self, event: &MentionEvent) -> HandleOutcome {
        let pipeline = StorePipeline {
            fetcher: &self.fetcher,
            classifier: &self.classifier,
            writer: &self.writer,
            timezone: self.timezone,
        };

        match pipeline.run(event).await {
            Ok(stored) => {
                info!(
                    event_id = %event.event_id,
                    channel = %event.channel_id,
                    thread_ts = %event.thread_ts,
                    kind = %stored.analysis.kind,
                    "Thread stored"
                );
                let text = replies::success_reply(&stored.record, &stored.analysis, &stored.outcome);
                self.reply(event, &text).await;
                self.forward(event, &stored).await;
                HandleOutcome::Stored(Box::new(stored))
            }
            Err(PipelineFailure { stage, error: err }) => {
                error!(
                    event_id = %event.event_id,
                    channel = %event.channel_id,
                    thread_ts = %event.thread_ts,
                    stage = %stage,
                    error = %err,
                    "Store pipeline failed"
                );
                self.reply(event, &replies::failure_reply(stage, &err)).await;
                HandleOutcome::Failed { stage, error: err }
            }
        }
    }

    /// Best effort: a failed notice is logged and the store still counts.
    async fn forward(&self, event: &MentionEvent, stored: &StoredThread) {
        let Some(channel) = self.forward_channel.as_deref() else {
            return;
        };

        let thread_time = stored
            .record
            .started_at()
            .unwrap_or_else(Utc::now)
            .with_timezone(&self.timezone);
        let notice = replies::forward_notice(&stored.record.permalink, &thread_time);

        if let Err(e) = self.chat.post_channel_message(channel, &notice).await {
            warn!(
                event_id = %event.event_id,
                forward_channel = %channel,
                error = %e,
                "Failed to forward stored-thread notice"
            );
        }
    }

    async fn reply(&self, event: &MentionEvent, text: &str) {
        if let Err(e) = self
            .chat
            .post_thread_reply(&event.channel_id, &event.thread_ts, text)
            .await
        {
            warn!(
                event_id = %event.event_id,
                channel = %event.channel_id,
                thread_ts = %event.thread_ts,
                error = %e,
                "Failed to post thread reply"
            );
        }
    }
}
