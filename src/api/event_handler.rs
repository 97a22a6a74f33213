//! Slack Events API payloads to domain events.

use serde_json::Value;
use uuid::Uuid;

use super::parsing::v_str;
use crate::core::models::MentionEvent;
use crate::errors::BridgeError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    UrlVerification(String),
    Mention(MentionEvent),
    /// Acknowledged without processing; the reason is for logs.
    Ignored(&'static str),
}

/// # Errors
///
/// [`BridgeError::ParseError`] when a payload we act on lacks required fields.
pub fn parse_event_payload(body: &Value) -> Result<InboundEvent, BridgeError> {
    match v_str(body, &["type"]).unwrap_or("") {
        "url_verification" => v_str(body, &["challenge"])
            .map(|c| InboundEvent::UrlVerification(c.to_string()))
            .ok_or_else(|| BridgeError::ParseError("url_verification without challenge".to_string())),
        "event_callback" => parse_event_callback(body),
        _ => Ok(InboundEvent::Ignored("unsupported payload type")),
    }
}

fn parse_event_callback(body: &Value) -> Result<InboundEvent, BridgeError> {
    let Some(event) = body.get("event") else {
        return Err(BridgeError::ParseError("event_callback without event".to_string()));
    };

    if v_str(event, &["type"]) != Some("app_mention") {
        return Ok(InboundEvent::Ignored("not an app_mention"));
    }
    if event.get("bot_id").is_some() {
        return Ok(InboundEvent::Ignored("mention from a bot"));
    }

    let required = |field: &str| {
        v_str(event, &[field])
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .ok_or_else(|| BridgeError::ParseError(format!("app_mention missing {field}")))
    };

    let channel_id = required("channel")?;
    let ts = required("ts")?;
    let thread_ts = v_str(event, &["thread_ts"])
        .filter(|s| !s.is_empty())
        .map_or(ts, ToString::to_string);

    Ok(InboundEvent::Mention(MentionEvent {
        event_id: v_str(body, &["event_id"])
            .filter(|s| !s.is_empty())
            .map_or_else(|| format!("local-{}", Uuid::new_v4()), ToString::to_string),
        channel_id,
        thread_ts,
        user_id: v_str(event, &["user"]).unwrap_or_default().to_string(),
        raw_text: v_str(event, &["text"]).unwrap_or_default().to_string(),
    }))
}
