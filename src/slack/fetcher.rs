//! Thread fetching: replies, author names, participant count and permalink.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};
use url::Url;

use super::{ChatPlatform, RawMessage, UserNameCache};
use crate::core::models::{ThreadMessage, ThreadRecord, slack_ts_sort_key};
use crate::errors::BridgeError;

pub struct ThreadFetcher {
    platform: Arc<dyn ChatPlatform>,
    names: Arc<UserNameCache>,
}

impl ThreadFetcher {
    #[must_use]
    pub fn new(platform: Arc<dyn ChatPlatform>, names: Arc<UserNameCache>) -> Self {
        Self { platform, names }
    }

    /// # Errors
    ///
    /// [`BridgeError::ThreadNotFound`] when the thread has no messages, and
    /// [`BridgeError::PlatformUnavailable`] for transport or auth failures.
    /// Neither is retried here.
    pub async fn fetch(&self, channel_id: &str, thread_ts: &str) -> Result<ThreadRecord, BridgeError> {
        let mut raw = self.platform.fetch_replies(channel_id, thread_ts).await?;
        if raw.is_empty() {
            return Err(BridgeError::ThreadNotFound(format!(
                "no messages for {channel_id}/{thread_ts}"
            )));
        }

        // Root first, replies chronological. The stable sort keeps the platform's
        // order for identical timestamps.
        raw.sort_by_key(|m| (m.ts != thread_ts, slack_ts_sort_key(&m.ts)));
        let root_ts = raw[0].ts.clone();

        let author_ids = distinct_authors(&raw);
        let names = join_all(author_ids.iter().map(|id| self.display_name(id))).await;

        let messages = raw
            .into_iter()
            .map(|m| {
                let author = match m.user_id.as_deref() {
                    Some(id) => author_ids
                        .iter()
                        .position(|a| a == id)
                        .map_or_else(|| id.to_string(), |i| names[i].clone()),
                    None => m.bot_label.clone().unwrap_or_else(|| "bot".to_string()),
                };
                ThreadMessage {
                    user_id: m.user_id,
                    author,
                    text: m.text,
                    ts: m.ts,
                }
            })
            .collect::<Vec<_>>();

        let permalink = normalize_permalink(&self.platform.get_permalink(channel_id, &root_ts).await?);

        debug!(
            channel = %channel_id,
            thread_ts = %thread_ts,
            messages = messages.len(),
            participants = author_ids.len(),
            "Fetched thread"
        );

        Ok(ThreadRecord {
            channel_id: channel_id.to_string(),
            thread_ts: thread_ts.to_string(),
            messages,
            permalink,
            participant_count: author_ids.len(),
        })
    }

    /// Cached display name for `user_id`. Falls back to the raw id when the
    /// lookup fails; the fallback is not cached.
    pub async fn display_name(&self, user_id: &str) -> String {
        let platform = Arc::clone(&self.platform);
        let lookup = self
            .names
            .get_or_try_populate(user_id, || async move { platform.resolve_user(user_id).await })
            .await;

        lookup.unwrap_or_else(|e| {
            warn!(user_id = %user_id, error = %e, "User lookup failed, using raw id");
            user_id.to_string()
        })
    }
}

/// Distinct author ids in first-appearance order. Messages without a user
/// (bots, integrations) are not participants.
#[must_use]
pub fn distinct_authors(messages: &[RawMessage]) -> Vec<String> {
    let mut seen = HashSet::new();
    messages
        .iter()
        .filter_map(|m| m.user_id.as_deref())
        .filter(|id| seen.insert(*id))
        .map(ToString::to_string)
        .collect()
}

/// Drops Slack's `cid` query parameter so one thread always maps to one link.
#[must_use]
pub fn normalize_permalink(permalink: &str) -> String {
    let Ok(mut url) = Url::parse(permalink) else {
        return permalink.to_string();
    };

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "cid")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }

    url.to_string()
}
