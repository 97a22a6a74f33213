//! Slack API client module
//!
//! Encapsulates the Slack Web API calls the bridge needs, made through
//! slack-morphism's hyper client sessions.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use slack_morphism::errors::SlackClientError;
use slack_morphism::hyper_tokio::{SlackClientHyperConnector, SlackHyperClient};
use slack_morphism::prelude::{
    SlackApiChatGetPermalinkRequest, SlackApiChatPostMessageRequest,
    SlackApiConversationsRepliesRequest, SlackApiUsersInfoRequest,
};
use slack_morphism::{
    SlackApiToken, SlackApiTokenValue, SlackChannelId, SlackHistoryMessage, SlackMessageContent,
    SlackTs, SlackUser, SlackUserId,
};
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, warn};

use super::{ChatPlatform, RawMessage};
use crate::errors::BridgeError;

/// Page size for `conversations.replies`.
const REPLIES_PAGE_LIMIT: u16 = 200;

/// Extra attempts for `chat.postMessage` after the first one fails.
const REPLY_RETRIES: usize = 3;

/// Slack error codes meaning "the thread you asked for does not exist".
const NOT_FOUND_ERRORS: &[&str] = &["thread_not_found", "channel_not_found", "message_not_found"];

/// Slack Web API client. Every call is bounded by the configured timeout.
pub struct SlackClient {
    client: SlackHyperClient,
    token: SlackApiToken,
    timeout: Duration,
}

impl SlackClient {
    /// `api_base` replaces `https://slack.com/api`; plain `http` is accepted
    /// so a local server can stand in for Slack.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS connector cannot load the native roots.
    pub fn new(token: String, api_base: &str, timeout: Duration) -> Result<Self, BridgeError> {
        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(|e| BridgeError::Config(format!("Failed to create Slack HTTP connector: {e}")))?
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build();
        let connector =
            SlackClientHyperConnector::from(https).with_slack_api_url(api_base.trim_end_matches('/'));

        Ok(Self {
            client: SlackHyperClient::new(connector),
            token: SlackApiToken::new(SlackApiTokenValue::new(token)),
            timeout,
        })
    }

    async fn timed<T, F>(&self, method: &str, call: F) -> Result<T, BridgeError>
    where
        F: Future<Output = Result<T, SlackClientError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(|e| map_client_error(method, &e)),
            Err(_) => Err(BridgeError::PlatformUnavailable(format!(
                "{method} timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }

    /// Posting is outside the pipeline, so transient failures get a few
    /// jittered retries.
    async fn post_with_retry(
        &self,
        request: &SlackApiChatPostMessageRequest,
    ) -> Result<(), BridgeError> {
        let strategy = ExponentialBackoff::from_millis(2)
            .factor(100)
            .max_delay(Duration::from_secs(1))
            .map(jitter)
            .take(REPLY_RETRIES);

        RetryIf::spawn(
            strategy,
            || async {
                let session = self.client.open_session(&self.token);
                self.timed("chat.postMessage", session.chat_post_message(request))
                    .await
            },
            |e: &BridgeError| {
                let transient = matches!(e, BridgeError::PlatformUnavailable(_));
                if transient {
                    warn!(error = %e, "Retrying chat.postMessage");
                }
                transient
            },
        )
        .await
        .map(|_| ())
    }
}

/// Slack API error codes keep their meaning; everything else is transport.
fn map_client_error(method: &str, error: &SlackClientError) -> BridgeError {
    match error {
        SlackClientError::ApiError(api) if NOT_FOUND_ERRORS.contains(&api.code.as_str()) => {
            BridgeError::ThreadNotFound(format!("{method}: {}", api.code))
        }
        SlackClientError::ApiError(api) => {
            BridgeError::PlatformUnavailable(format!("{method} error: {}", api.code))
        }
        other => BridgeError::PlatformUnavailable(format!("{method} failed: {other}")),
    }
}

fn raw_message_from_history(msg: &SlackHistoryMessage) -> RawMessage {
    RawMessage {
        ts: msg.origin.ts.0.clone(),
        user_id: msg.sender.user.as_ref().map(|u| u.0.clone()),
        bot_label: msg.sender.bot_id.as_ref().map(|b| b.0.clone()),
        text: msg.content.text.clone().unwrap_or_default(),
    }
}

/// Best available human name: real name, then display name, then handle.
fn pick_display_name(user: &SlackUser, user_id: &str) -> String {
    let profile = user.profile.as_ref();
    [
        profile.and_then(|p| p.real_name.as_deref()),
        user.real_name.as_deref(),
        profile.and_then(|p| p.display_name.as_deref()),
        user.name.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .find(|name| !name.is_empty())
    .unwrap_or(user_id)
    .to_string()
}

#[async_trait]
impl ChatPlatform for SlackClient {
    /// Slack repeats the parent message at the head of every page, so
    /// messages are kept once per `ts`.
    async fn fetch_replies(
        &self,
        channel_id: &str,
        thread_ts: &str,
    ) -> Result<Vec<RawMessage>, BridgeError> {
        let session = self.client.open_session(&self.token);
        let mut request = SlackApiConversationsRepliesRequest::new(
            SlackChannelId(channel_id.to_string()),
            SlackTs(thread_ts.to_string()),
        )
        .with_limit(REPLIES_PAGE_LIMIT);

        let mut seen = HashSet::new();
        let mut messages = Vec::new();

        loop {
            let page = self
                .timed(
                    "conversations.replies",
                    session.conversations_replies(&request),
                )
                .await?;

            messages.extend(
                page.messages
                    .iter()
                    .filter(|m| seen.insert(m.origin.ts.0.clone()))
                    .map(raw_message_from_history),
            );

            request.cursor = page
                .response_metadata
                .and_then(|meta| meta.next_cursor)
                .filter(|c| !c.0.is_empty());

            if request.cursor.is_none() {
                break;
            }
            debug!(channel = %channel_id, thread_ts = %thread_ts, "Following conversations.replies cursor");
        }

        Ok(messages)
    }

    async fn resolve_user(&self, user_id: &str) -> Result<String, BridgeError> {
        let session = self.client.open_session(&self.token);
        let request = SlackApiUsersInfoRequest::new(SlackUserId(user_id.to_string()));

        let info = self.timed("users.info", session.users_info(&request)).await?;
        Ok(pick_display_name(&info.user, user_id))
    }

    async fn get_permalink(
        &self,
        channel_id: &str,
        message_ts: &str,
    ) -> Result<String, BridgeError> {
        let session = self.client.open_session(&self.token);
        let request = SlackApiChatGetPermalinkRequest::new(
            SlackChannelId(channel_id.to_string()),
            SlackTs(message_ts.to_string()),
        );

        let response = self
            .timed("chat.getPermalink", session.chat_get_permalink(&request))
            .await?;
        Ok(response.permalink.to_string())
    }

    async fn post_thread_reply(
        &self,
        channel_id: &str,
        thread_ts: &str,
        text: &str,
    ) -> Result<(), BridgeError> {
        let request = SlackApiChatPostMessageRequest::new(
            SlackChannelId(channel_id.to_string()),
            SlackMessageContent::new().with_text(text.to_string()),
        )
        .with_thread_ts(SlackTs(thread_ts.to_string()))
        .with_unfurl_links(false);

        self.post_with_retry(&request).await
    }

    async fn post_channel_message(&self, channel_id: &str, text: &str) -> Result<(), BridgeError> {
        let request = SlackApiChatPostMessageRequest::new(
            SlackChannelId(channel_id.to_string()),
            SlackMessageContent::new().with_text(text.to_string()),
        )
        .with_unfurl_links(false);

        self.post_with_retry(&request).await
    }
}
