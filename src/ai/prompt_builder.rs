//! Prompt construction for thread classification.

use crate::core::models::{ThreadMessage, ThreadRecord, slack_ts_to_datetime};

pub const SYSTEM_INSTRUCTION: &str = "You are a QA triage assistant. You read a Slack thread and \
classify it for a product-quality tracking sheet. \
Return ONLY one JSON object with exactly these keys: \
\"type\" (one short category such as Question, Bug, Feedback, Request or Other), \
\"description\" (what the thread is about, at most 600 characters, in the thread's language), \
\"sentiment\" (exactly one of Positive, Negative, Neutral), \
\"urgency\" (exactly one of Low, Medium, High), \
\"summary\" (one or two sentences stating the outcome or current status). \
Every value must be a non-empty string. No markdown, no commentary, no extra keys. \
If the thread has a single message, classify it from that message alone.";

/// Rendered thread text plus how much of it had to be left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadTranscript {
    pub body: String,
    pub omitted_replies: usize,
}

fn format_line(message: &ThreadMessage) -> String {
    let when = slack_ts_to_datetime(&message.ts).map_or_else(
        || message.ts.clone(),
        |dt| dt.format("%Y-%m-%d %H:%M").to_string(),
    );
    let text = message.text.split_whitespace().collect::<Vec<_>>().join(" ");
    format!("[{when}] {}: {text}\n", message.author)
}

fn omitted_marker(count: usize) -> String {
    format!("[... {count} earlier replies omitted ...]\n")
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(2)).collect();
    out.push_str("…\n");
    out
}

/// Renders `record` under a `max_chars` budget.
///
/// Replies are dropped oldest first. The root line is always present, cut
/// short if it alone does not fit. The body never exceeds `max_chars` once
/// the budget covers the header, footer and omission marker.
#[must_use]
pub fn render_transcript(record: &ThreadRecord, max_chars: usize) -> ThreadTranscript {
    let header = "THREAD:\n";
    let footer = format!("Participants: {}\n", record.participant_count);
    let fixed = header.chars().count() + footer.chars().count();

    let reply_lines: Vec<String> = record.replies().iter().map(format_line).collect();
    // An oversized root leaves no room for replies, so the marker must fit too.
    let marker_reserve = if reply_lines.is_empty() {
        0
    } else {
        omitted_marker(reply_lines.len()).chars().count()
    };

    let root_line = record.root().map(format_line).unwrap_or_default();
    let root_line = truncate_chars(&root_line, max_chars.saturating_sub(fixed + marker_reserve));
    let mut remaining = max_chars.saturating_sub(fixed + root_line.chars().count());

    let total: usize = reply_lines.iter().map(|l| l.chars().count()).sum();

    let kept_from = if total <= remaining {
        0
    } else {
        remaining = remaining.saturating_sub(omitted_marker(reply_lines.len()).chars().count());
        let mut used = 0;
        let mut start = reply_lines.len();
        for (idx, line) in reply_lines.iter().enumerate().rev() {
            let len = line.chars().count();
            if used + len > remaining {
                break;
            }
            used += len;
            start = idx;
        }
        start
    };

    let mut body = String::with_capacity(max_chars);
    body.push_str(header);
    body.push_str(&root_line);
    if kept_from > 0 {
        body.push_str(&omitted_marker(kept_from));
    }
    for line in &reply_lines[kept_from..] {
        body.push_str(line);
    }
    body.push_str(&footer);

    ThreadTranscript {
        body,
        omitted_replies: kept_from,
    }
}
