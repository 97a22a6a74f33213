//! Strict parser for the model's classification answer.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::core::models::{AnalysisResult, Sentiment, Urgency};
use crate::errors::BridgeError;

/// Fields every answer must carry, in reporting order.
pub const REQUIRED_FIELDS: [&str; 5] = ["type", "description", "sentiment", "urgency", "summary"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Parsed(AnalysisResult),
    Incomplete { missing_fields: Vec<String> },
    Invalid { field: String, value: String },
}

impl ParseOutcome {
    /// # Errors
    ///
    /// `Incomplete` and `Invalid` become the matching [`BridgeError`].
    pub fn into_result(self) -> Result<AnalysisResult, BridgeError> {
        match self {
            ParseOutcome::Parsed(result) => Ok(result),
            ParseOutcome::Incomplete { missing_fields } => {
                Err(BridgeError::ClassificationIncomplete(missing_fields))
            }
            ParseOutcome::Invalid { field, value } => {
                Err(BridgeError::ClassificationInvalid { field, value })
            }
        }
    }
}

static LABEL_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?im)^[\s>*\-•"]*(type|description|sentiment|urgency|summary)[*"]*\s*[:=][*]*\s*(.*?)\s*$"#,
    )
    .expect("static regex compile")
});

fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the opening fence.
    let rest = rest.split_once('\n').map_or(rest, |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn json_fields(raw: &str) -> Option<HashMap<String, String>> {
    let body = strip_code_fences(raw);
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if end <= start {
        return None;
    }

    let value: Value = serde_json::from_str(&body[start..=end]).ok()?;
    let object = value.as_object()?;

    Some(
        object
            .iter()
            .filter_map(|(k, v)| {
                let text = match v {
                    Value::String(s) => s.clone(),
                    Value::Null => return None,
                    other => other.to_string(),
                };
                Some((k.to_lowercase(), text))
            })
            .collect(),
    )
}

fn labelled_fields(raw: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    for cap in LABEL_LINE_RE.captures_iter(raw) {
        let value = cap[2].trim().trim_end_matches(',').trim_matches('"').trim();
        fields
            .entry(cap[1].to_lowercase())
            .or_insert_with(|| value.to_string());
    }
    fields
}

/// Trimmed, non-blank value of `name`.
fn field<'a>(fields: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    fields
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// Parses the model's answer. JSON is tried first, then `label: value` lines.
///
/// Missing or blank fields win over invalid enum values, so the caller always
/// learns the full set of missing fields.
#[must_use]
pub fn parse_analysis(raw: &str) -> ParseOutcome {
    let fields = json_fields(raw).unwrap_or_else(|| labelled_fields(raw));

    let missing_fields: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|name| field(&fields, name).is_none())
        .map(|name| (*name).to_string())
        .collect();
    if !missing_fields.is_empty() {
        return ParseOutcome::Incomplete { missing_fields };
    }

    let sentiment_raw = field(&fields, "sentiment").unwrap_or_default();
    let urgency_raw = field(&fields, "urgency").unwrap_or_default();

    let Some(sentiment) = Sentiment::from_label(sentiment_raw) else {
        return ParseOutcome::Invalid {
            field: "sentiment".to_string(),
            value: sentiment_raw.to_string(),
        };
    };
    let Some(urgency) = Urgency::from_label(urgency_raw) else {
        return ParseOutcome::Invalid {
            field: "urgency".to_string(),
            value: urgency_raw.to_string(),
        };
    };

    ParseOutcome::Parsed(AnalysisResult {
        kind: field(&fields, "type").unwrap_or_default().to_string(),
        description: field(&fields, "description").unwrap_or_default().to_string(),
        sentiment,
        urgency,
        summary: field(&fields, "summary").unwrap_or_default().to_string(),
    })
}
