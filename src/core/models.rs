use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A validated mention of the bot, as delivered by the event boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionEvent {
    pub event_id: String,
    pub channel_id: String,
    pub thread_ts: String,
    pub user_id: String,
    pub raw_text: String,
}

/// One message of a fetched thread with its author already resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadMessage {
    /// Slack user id of the author. `None` for bot and system messages.
    pub user_id: Option<String>,
    pub author: String,
    pub text: String,
    pub ts: String,
}

/// A thread's full history, root first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRecord {
    pub channel_id: String,
    pub thread_ts: String,
    pub messages: Vec<ThreadMessage>,
    pub permalink: String,
    pub participant_count: usize,
}

impl ThreadRecord {
    #[must_use]
    pub fn root(&self) -> Option<&ThreadMessage> {
        self.messages.first()
    }

    #[must_use]
    pub fn replies(&self) -> &[ThreadMessage] {
        self.messages.get(1..).unwrap_or_default()
    }

    /// Time of the root message, falling back to the thread ts.
    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.root()
            .and_then(|m| slack_ts_to_datetime(&m.ts))
            .or_else(|| slack_ts_to_datetime(&self.thread_ts))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
        }
    }

    /// Case-insensitive lookup accepting the canonical names and the
    /// Indonesian equivalents the model sometimes answers with.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match normalize_label(label).as_str() {
            "positive" | "positif" => Some(Sentiment::Positive),
            "negative" | "negatif" => Some(Sentiment::Negative),
            "neutral" | "netral" => Some(Sentiment::Neutral),
            _ => None,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Urgency {
    pub const ALL: [Urgency; 3] = [Urgency::Low, Urgency::Medium, Urgency::High];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Urgency::Low => "Low",
            Urgency::Medium => "Medium",
            Urgency::High => "High",
        }
    }

    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match normalize_label(label).as_str() {
            "low" | "rendah" => Some(Urgency::Low),
            "medium" | "sedang" | "normal" => Some(Urgency::Medium),
            "high" | "tinggi" | "urgent" | "critical" => Some(Urgency::High),
            _ => None,
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize_label(label: &str) -> String {
    label
        .trim()
        .trim_end_matches(['.', ',', ';'])
        .trim()
        .to_lowercase()
}

/// Structured judgment about a thread. Every text field is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub sentiment: Sentiment,
    pub urgency: Urgency,
    pub summary: String,
}

/// Column order of the spreadsheet tab. Existing sheets depend on it.
pub const SHEET_COLUMNS: [&str; 11] = [
    "Timestamp",
    "Type",
    "Description",
    "Link",
    "User",
    "Channel",
    "Sentiment",
    "Urgency",
    "Participants",
    "Summary",
    "Created At",
];

/// One spreadsheet row, flattened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetRow {
    pub timestamp: String,
    pub kind: String,
    pub description: String,
    pub link: String,
    pub user: String,
    pub channel: String,
    pub sentiment: Sentiment,
    pub urgency: Urgency,
    pub participants: usize,
    pub summary: String,
    pub created_at: String,
}

impl SheetRow {
    /// Cell values in [`SHEET_COLUMNS`] order.
    #[must_use]
    pub fn to_values(&self) -> Vec<String> {
        vec![
            self.timestamp.clone(),
            self.kind.clone(),
            self.description.clone(),
            self.link.clone(),
            self.user.clone(),
            self.channel.clone(),
            self.sentiment.to_string(),
            self.urgency.to_string(),
            self.participants.to_string(),
            self.summary.clone(),
            self.created_at.clone(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowWriteOutcome {
    pub tab: String,
    pub header_created: bool,
    /// A1 range reported by the backend, when it reports one.
    pub updated_range: Option<String>,
}

/// Converts a Slack message timestamp (`"1759804695.537539"`) to UTC.
#[must_use]
pub fn slack_ts_to_datetime(ts: &str) -> Option<DateTime<Utc>> {
    let (secs, frac) = ts.split_once('.').unwrap_or((ts, "0"));
    let secs: i64 = secs.parse().ok()?;
    let micros: u32 = format!("{frac:0<6}").get(..6)?.parse().ok()?;
    DateTime::from_timestamp(secs, micros * 1_000)
}

/// Sort key that orders Slack timestamps chronologically.
#[must_use]
pub fn slack_ts_sort_key(ts: &str) -> (u64, u64) {
    let (secs, frac) = ts.split_once('.').unwrap_or((ts, "0"));
    (
        secs.parse().unwrap_or(u64::MAX),
        format!("{frac:0<6}")
            .get(..6)
            .and_then(|micros| micros.parse().ok())
            .unwrap_or(0),
    )
}
