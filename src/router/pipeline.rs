//! The store pipeline as an explicit state machine: fetch, classify, write.

use chrono::Utc;
use chrono_tz::Tz;
use tracing::debug;

use crate::ai::ThreadClassifier;
use crate::core::models::{AnalysisResult, MentionEvent, RowWriteOutcome, ThreadRecord};
use crate::errors::{BridgeError, Stage};
use crate::sheets::{SheetWriter, compose_row};
use crate::slack::ThreadFetcher;

/// Everything a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredThread {
    pub record: ThreadRecord,
    pub analysis: AnalysisResult,
    pub outcome: RowWriteOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineFailure {
    pub stage: Stage,
    pub error: BridgeError,
}

#[derive(Debug)]
pub enum PipelineState {
    Fetching,
    Classifying(ThreadRecord),
    Writing {
        record: ThreadRecord,
        analysis: AnalysisResult,
    },
    Done(StoredThread),
    Failed(PipelineFailure),
}

impl PipelineState {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            PipelineState::Fetching => "fetching",
            PipelineState::Classifying(_) => "classifying",
            PipelineState::Writing { .. } => "writing",
            PipelineState::Done(_) => "done",
            PipelineState::Failed(_) => "failed",
        }
    }

    fn failed(stage: Stage, error: BridgeError) -> Self {
        PipelineState::Failed(PipelineFailure { stage, error })
    }
}

pub struct StorePipeline<'a> {
    pub fetcher: &'a ThreadFetcher,
    pub classifier: &'a ThreadClassifier,
    pub writer: &'a SheetWriter,
    pub timezone: Tz,
}

impl StorePipeline<'_> {
    /// Runs to `Done` or `Failed`. Every failure is terminal, nothing is retried.
    ///
    /// # Errors
    ///
    /// The first failing stage and its error.
    pub async fn run(&self, event: &MentionEvent) -> Result<StoredThread, PipelineFailure> {
        let mut state = PipelineState::Fetching;
        loop {
            state = match state {
                PipelineState::Done(stored) => return Ok(stored),
                PipelineState::Failed(failure) => return Err(failure),
                active => self.step(event, active).await,
            };
            debug!(event_id = %event.event_id, state = state.name(), "Pipeline transition");
        }
    }

    async fn step(&self, event: &MentionEvent, state: PipelineState) -> PipelineState {
        match state {
            PipelineState::Fetching => {
                match self.fetcher.fetch(&event.channel_id, &event.thread_ts).await {
                    Ok(record) => PipelineState::Classifying(record),
                    Err(e) => PipelineState::failed(Stage::Fetch, e),
                }
            }
            PipelineState::Classifying(record) => match self.classifier.classify(&record).await {
                Ok(analysis) => PipelineState::Writing { record, analysis },
                Err(e) => PipelineState::failed(Stage::Classify, e),
            },
            PipelineState::Writing { record, analysis } => {
                let user = self.fetcher.display_name(&event.user_id).await;
                let row = compose_row(&record, &analysis, &user, Utc::now(), self.timezone);
                match self.writer.append(&row).await {
                    Ok(outcome) => PipelineState::Done(StoredThread {
                        record,
                        analysis,
                        outcome,
                    }),
                    Err(e) => PipelineState::failed(Stage::Write, e),
                }
            }
            terminal => terminal,
        }
    }
}
