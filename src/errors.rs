use std::fmt;

use thiserror::Error;

/// Every failure the bridge can surface.
///
/// Pipeline stages return these unchanged to the router, which maps them to a
/// short user-facing reply and logs the full message for operators.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BridgeError {
    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("Failed to access Slack API: {0}")]
    PlatformUnavailable(String),

    #[error("Failed to access language model: {0}")]
    ModelUnavailable(String),

    #[error("Classification incomplete, missing fields: {}", .0.join(", "))]
    ClassificationIncomplete(Vec<String>),

    #[error("Classification invalid: {field} = {value:?}")]
    ClassificationInvalid { field: String, value: String },

    #[error("Failed to access spreadsheet: {0}")]
    SheetUnavailable(String),

    #[error("Spreadsheet or tab not found: {0}")]
    SheetNotFound(String),

    #[error("Unrecognized command: {0}")]
    UnrecognizedCommand(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to parse Slack event: {0}")]
    ParseError(String),
}

impl BridgeError {
    /// Short, stable category name. Safe to show to end users.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            BridgeError::ThreadNotFound(_) => "thread not found",
            BridgeError::PlatformUnavailable(_) => "Slack unavailable",
            BridgeError::ModelUnavailable(_) => "language model unavailable",
            BridgeError::ClassificationIncomplete(_) => "classification incomplete",
            BridgeError::ClassificationInvalid { .. } => "classification invalid",
            BridgeError::SheetUnavailable(_) => "spreadsheet unavailable",
            BridgeError::SheetNotFound(_) => "spreadsheet not found",
            BridgeError::UnrecognizedCommand(_) => "unrecognized command",
            BridgeError::Config(_) => "configuration error",
            BridgeError::ParseError(_) => "malformed event",
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(error: serde_json::Error) -> Self {
        BridgeError::ParseError(error.to_string())
    }
}

/// Pipeline stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Fetch,
    Classify,
    Write,
}

impl Stage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Classify => "classify",
            Stage::Write => "write",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
