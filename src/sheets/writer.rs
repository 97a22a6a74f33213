use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::sync::Mutex;
use tracing::info;

use super::SpreadsheetBackend;
use crate::core::models::{AnalysisResult, RowWriteOutcome, SHEET_COLUMNS, SheetRow, ThreadRecord};
use crate::errors::BridgeError;

const SHEET_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Appends analysed threads to one spreadsheet tab.
pub struct SheetWriter {
    backend: Arc<dyn SpreadsheetBackend>,
    tab: String,
    /// Set once the header row of `tab` has been confirmed in this process.
    header_ready: Mutex<bool>,
}

impl SheetWriter {
    #[must_use]
    pub fn new(backend: Arc<dyn SpreadsheetBackend>, tab: impl Into<String>) -> Self {
        Self {
            backend,
            tab: tab.into(),
            header_ready: Mutex::new(false),
        }
    }

    #[must_use]
    pub fn tab(&self) -> &str {
        &self.tab
    }

    /// Writes `row` as a single append, checking the header first on first use.
    ///
    /// # Errors
    ///
    /// [`BridgeError::SheetNotFound`] for a missing spreadsheet or tab,
    /// [`BridgeError::SheetUnavailable`] for any other backend failure.
    pub async fn append(&self, row: &SheetRow) -> Result<RowWriteOutcome, BridgeError> {
        let header_created = self.ensure_header_once().await?;
        let updated_range = self.backend.append_row(&self.tab, &row.to_values()).await?;

        info!(
            tab = %self.tab,
            range = updated_range.as_deref().unwrap_or("unknown"),
            "Appended row"
        );

        Ok(RowWriteOutcome {
            tab: self.tab.clone(),
            header_created,
            updated_range,
        })
    }

    /// Holding the lock across the check keeps concurrent first writers from
    /// both writing a header. A failed check is not remembered.
    async fn ensure_header_once(&self) -> Result<bool, BridgeError> {
        let mut ready = self.header_ready.lock().await;
        if *ready {
            return Ok(false);
        }
        let created = self.backend.ensure_header(&self.tab, &SHEET_COLUMNS).await?;
        *ready = true;
        Ok(created)
    }
}

fn format_in(dt: DateTime<Utc>, tz: Tz) -> String {
    dt.with_timezone(&tz).format(SHEET_TIME_FORMAT).to_string()
}

/// Flattens one pipeline run into a [`SheetRow`].
///
/// `Timestamp` is the root message time (falling back to `created_at` when the
/// root ts does not parse); `Created At` is `created_at`. Both are rendered in `tz`.
#[must_use]
pub fn compose_row(
    record: &ThreadRecord,
    analysis: &AnalysisResult,
    user: &str,
    created_at: DateTime<Utc>,
    tz: Tz,
) -> SheetRow {
    let root_time = record.started_at().unwrap_or(created_at);

    SheetRow {
        timestamp: format_in(root_time, tz),
        kind: analysis.kind.clone(),
        description: analysis.description.clone(),
        link: record.permalink.clone(),
        user: user.to_string(),
        channel: record.channel_id.clone(),
        sentiment: analysis.sentiment,
        urgency: analysis.urgency,
        participants: record.participant_count,
        summary: analysis.summary.clone(),
        created_at: format_in(created_at, tz),
    }
}
