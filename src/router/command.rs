use once_cell::sync::Lazy;
use regex::Regex;

/// Phrases that trigger the store pipeline. Indonesian first, it is the usual wording.
pub const STORE_PHRASES: &[&str] = &["ke pqf", "ke spreadsheet", "to pqf", "to spreadsheet"];

pub const HELP_PHRASES: &[&str] = &["help", "bantuan"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Store,
    Help,
    Unrecognized,
}

static MENTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<@[^>]+>").expect("static regex compile"));

/// Removes `<@U…>` mention tokens and collapses whitespace.
#[must_use]
pub fn strip_mentions(raw_text: &str) -> String {
    MENTION_RE
        .replace_all(raw_text, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Case-insensitive containment match. Store wins over help, so
/// "help me masukkan ke pqf" stores.
#[must_use]
pub fn parse_command(raw_text: &str) -> Command {
    let text_lc = strip_mentions(raw_text).to_lowercase();

    if STORE_PHRASES.iter().any(|p| text_lc.contains(p)) {
        return Command::Store;
    }
    if HELP_PHRASES.iter().any(|p| text_lc.contains(p)) {
        return Command::Help;
    }
    Command::Unrecognized
}
