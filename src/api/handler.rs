//! API Lambda handler: validate, parse, dispatch.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use lambda_runtime::{Error, LambdaEvent};
use serde_json::Value;
use tracing::{error, info};

use super::event_handler::{InboundEvent, parse_event_payload};
use super::{helpers, parsing, signature};
use crate::core::config::AppConfig;
use crate::errors::BridgeError;
use crate::router::{CommandRouter, Dispatcher};

/// Built once per cold start and shared by every invocation.
pub struct ApiState {
    pub config: AppConfig,
    pub dispatcher: Dispatcher,
}

impl ApiState {
    #[must_use]
    pub fn new(config: AppConfig, router: Arc<CommandRouter>) -> Self {
        let dispatcher = Dispatcher::new(router, config.max_concurrent_pipelines);
        Self { config, dispatcher }
    }

    /// # Errors
    ///
    /// Returns an error if the production clients cannot be built.
    pub fn from_config(config: AppConfig) -> Result<Self, BridgeError> {
        let router = Arc::new(CommandRouter::from_config(&config)?);
        Ok(Self::new(config, router))
    }
}

/// Lambda handler for the API entrypoint.
///
/// # Errors
///
/// Never returns `Err`; rejected requests get a 4xx payload instead.
#[tracing::instrument(level = "info", skip_all)]
pub async fn function_handler(state: &ApiState, event: LambdaEvent<Value>) -> Result<Value, Error> {
    let now_secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    info!(request_id = %event.context.request_id, "API Lambda received request");
    Ok(handle_request(state, &event.payload, now_secs).await)
}

/// Request pipeline with the clock injected. Returns the proxy response.
///
/// A mention is stored before the 200 goes back, so a slow model call
/// or sheet write runs past Slack's 3-second ack window. Slack then redelivers
/// with `X-Slack-Retry-Num`; those are acked and dropped here, and the router
/// drops any repeated event id. Acking first would need work to outlive the
/// invocation, and nothing is persisted between invocations to hand it to.
pub async fn handle_request(state: &ApiState, payload: &Value, now_secs: u64) -> Value {
    let Some(headers) = payload.get("headers") else {
        error!("Request missing headers");
        return helpers::err_response(400, "Missing headers");
    };

    let body = match parsing::extract_body(payload) {
        Ok(b) => b,
        Err(e) => {
            error!(error = %e, "Unreadable request body");
            return helpers::err_response(400, &e.to_string());
        }
    };

    if let Err(response) = verify_signature(&body, headers, &state.config, now_secs) {
        return response;
    }

    // The first delivery is still being handled; redeliveries would only duplicate it.
    if let Some(retry) = parsing::get_header_value(headers, "X-Slack-Retry-Num") {
        let reason = parsing::get_header_value(headers, "X-Slack-Retry-Reason").unwrap_or("");
        info!(retry_num = %retry, reason = %reason, "Ignoring Slack retry");
        return helpers::ok_empty();
    }

    let parsed = serde_json::from_str::<Value>(&body)
        .map_err(BridgeError::from)
        .and_then(|json_body| parse_event_payload(&json_body));

    match parsed {
        Ok(InboundEvent::UrlVerification(challenge)) => helpers::ok_challenge(&challenge),
        Ok(InboundEvent::Ignored(reason)) => {
            info!(reason = reason, "Event ignored");
            helpers::ok_empty()
        }
        Ok(InboundEvent::Mention(mention)) => {
            if !state.config.is_channel_allowed(&mention.channel_id) {
                info!(event_id = %mention.event_id, channel = %mention.channel_id, "Channel not allowed");
                return helpers::ok_empty();
            }
            let outcome = state.dispatcher.dispatch(mention).await;
            info!(outcome = ?outcome, "Mention handled");
            helpers::ok_empty()
        }
        Err(e) => {
            error!(error = %e, "Failed to parse Slack event");
            helpers::err_response(400, &format!("Parse Error: {e}"))
        }
    }
}

fn verify_signature(
    body: &str,
    headers: &Value,
    config: &AppConfig,
    now_secs: u64,
) -> Result<(), Value> {
    let Some(sig) = parsing::get_header_value(headers, "X-Slack-Signature") else {
        error!("Missing X-Slack-Signature header");
        return Err(helpers::err_response(401, "Missing X-Slack-Signature header"));
    };

    let Some(timestamp) = parsing::get_header_value(headers, "X-Slack-Request-Timestamp") else {
        error!("Missing X-Slack-Request-Timestamp header");
        return Err(helpers::err_response(
            401,
            "Missing X-Slack-Request-Timestamp header",
        ));
    };

    if !signature::verify_slack_signature(body, timestamp, sig, &config.slack_signing_secret, now_secs) {
        return Err(helpers::err_response(401, "Invalid Slack signature"));
    }

    Ok(())
}
