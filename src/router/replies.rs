//! Text of every message the bot posts.

use chrono::{DateTime, Datelike, TimeZone};

use crate::core::models::{AnalysisResult, RowWriteOutcome, ThreadRecord};
use crate::errors::{BridgeError, Stage};

pub const HELP_TEXT: &str = "👋 Hi! I'm the PQF bot. I file Slack threads into the PQF spreadsheet.\n\n\
*Commands* (mention me inside the thread):\n\
• `masukkan ke pqf` or `to spreadsheet` - analyse this thread and add it as a row\n\
• `help` or `bantuan` - show this message\n\n\
Each run reads the whole thread, classifies type, sentiment and urgency, and appends a new row. \
Running it again on the same thread adds another row.";

pub const USAGE_HINT: &str = "I didn't catch that. Mention me with `masukkan ke pqf` to store this thread, \
or `help` to see what I can do.";

/// Confirmation after a row was written.
#[must_use]
pub fn success_reply(
    record: &ThreadRecord,
    analysis: &AnalysisResult,
    outcome: &RowWriteOutcome,
) -> String {
    format!(
        "✅ Stored in *{tab}*\n\
         • *Type:* {kind}\n\
         • *Sentiment:* {sentiment}\n\
         • *Urgency:* {urgency}\n\
         • *Participants:* {participants}\n\
         • *Link:* {link}",
        tab = outcome.tab,
        kind = analysis.kind,
        sentiment = analysis.sentiment,
        urgency = analysis.urgency,
        participants = record.participant_count,
        link = record.permalink,
    )
}

/// User-facing failure notice. Names the stage and category only; the full
/// error goes to the logs.
#[must_use]
pub fn failure_reply(stage: Stage, error: &BridgeError) -> String {
    format!(
        "❌ Couldn't store this thread: the {stage} step failed ({category}). \
         Nothing was written. Try again in a moment.",
        category = error.category(),
    )
}

/// One-line notice for the forward channel:
/// `[Q4] [2023] [Week 3] [Date 15 - November] [Tercatat]` then the link.
///
/// Weeks count from the first of the month in blocks of seven days.
#[must_use]
pub fn forward_notice<Tz: TimeZone>(permalink: &str, thread_time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let quarter = thread_time.month0() / 3 + 1;
    let week = thread_time.day0() / 7 + 1;
    format!(
        "[Q{quarter}] [{year}] [Week {week}] [Date {day} - {month}] [Tercatat]\n{permalink}",
        year = thread_time.year(),
        day = thread_time.day(),
        month = thread_time.format("%B"),
    )
}
