//! All Slack-specific functionality

pub mod client;
pub mod fetcher;
pub mod user_cache;

use async_trait::async_trait;

use crate::errors::BridgeError;

// Re-export main types for convenience
pub use client::SlackClient;
pub use fetcher::ThreadFetcher;
pub use user_cache::UserNameCache;

/// A thread message as returned by the platform, before author resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub ts: String,
    pub user_id: Option<String>,
    /// Fallback author label for messages without a user (bots, integrations).
    pub bot_label: Option<String>,
    pub text: String,
}

/// The chat-platform calls the fetcher and router depend on.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Root message and all replies of a thread.
    async fn fetch_replies(
        &self,
        channel_id: &str,
        thread_ts: &str,
    ) -> Result<Vec<RawMessage>, BridgeError>;

    /// Human-readable name for a user id.
    async fn resolve_user(&self, user_id: &str) -> Result<String, BridgeError>;

    async fn get_permalink(&self, channel_id: &str, message_ts: &str)
    -> Result<String, BridgeError>;

    async fn post_thread_reply(
        &self,
        channel_id: &str,
        thread_ts: &str,
        text: &str,
    ) -> Result<(), BridgeError>;

    /// Top-level message in a channel, outside any thread.
    async fn post_channel_message(&self, channel_id: &str, text: &str) -> Result<(), BridgeError>;
}
