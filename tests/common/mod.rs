//! In-memory fakes for the chat, model and spreadsheet seams.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pqf_bot::ai::LanguageModel;
use pqf_bot::core::config::AppConfig;
use pqf_bot::errors::BridgeError;
use pqf_bot::router::CommandRouter;
use pqf_bot::sheets::SpreadsheetBackend;
use pqf_bot::slack::{ChatPlatform, RawMessage};

pub const PERMALINK: &str = "https://acme.slack.com/archives/C1/p1700000000000100";

pub fn msg(ts: &str, user: Option<&str>, text: &str) -> RawMessage {
    RawMessage {
        ts: ts.to_string(),
        user_id: user.map(ToString::to_string),
        bot_label: None,
        text: text.to_string(),
    }
}

/// Root plus two replies from two distinct users.
pub fn three_message_thread() -> Vec<RawMessage> {
    vec![
        msg("1700000000.000100", Some("U1"), "Bagaimana cara export laporan?"),
        msg("1700000060.000200", Some("U2"), "Lewat menu Reports > Export."),
        msg("1700000120.000300", Some("U1"), "Oke, terima kasih!"),
    ]
}

pub fn test_config() -> AppConfig {
    test_config_with(&[])
}

/// Base test variables plus `extra`, later entries winning.
pub fn test_config_with(extra: &[(&str, &str)]) -> AppConfig {
    let vars: HashMap<&str, &str> = [
        ("SLACK_BOT_TOKEN", "xoxb-test"),
        ("SLACK_SIGNING_SECRET", "signing-secret"),
        ("LLM_API_KEY", "llm-key"),
        ("SPREADSHEET_ID", "sheet-123"),
        ("GOOGLE_SHEETS_ACCESS_TOKEN", "ya29.token"),
    ]
    .into_iter()
    .chain(extra.iter().copied())
    .collect();
    AppConfig::from_lookup(|k| vars.get(k).map(ToString::to_string)).unwrap()
}

#[derive(Default)]
pub struct FakeChat {
    pub replies: Vec<RawMessage>,
    pub fetch_error: Option<BridgeError>,
    pub names: HashMap<String, String>,
    pub failing_users: HashSet<String>,
    pub post_error: Option<BridgeError>,
    pub forward_error: Option<BridgeError>,
    pub fetch_calls: AtomicUsize,
    pub resolve_calls: AtomicUsize,
    pub posted: Mutex<Vec<(String, String, String)>>,
    /// Top-level channel messages as (channel, text).
    pub forwarded: Mutex<Vec<(String, String)>>,
}

impl FakeChat {
    pub fn with_thread(replies: Vec<RawMessage>) -> Self {
        let names = [("U1", "Ani"), ("U2", "Budi"), ("U3", "Citra")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            replies,
            names,
            ..Self::default()
        }
    }

    pub fn unreachable() -> Self {
        Self {
            fetch_error: Some(BridgeError::PlatformUnavailable(
                "connection refused".to_string(),
            )),
            ..Self::default()
        }
    }

    pub fn posted_texts(&self) -> Vec<String> {
        self.posted
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl ChatPlatform for FakeChat {
    async fn fetch_replies(
        &self,
        _channel_id: &str,
        _thread_ts: &str,
    ) -> Result<Vec<RawMessage>, BridgeError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        match &self.fetch_error {
            Some(e) => Err(e.clone()),
            None => Ok(self.replies.clone()),
        }
    }

    async fn resolve_user(&self, user_id: &str) -> Result<String, BridgeError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_users.contains(user_id) {
            return Err(BridgeError::PlatformUnavailable("user_not_found".to_string()));
        }
        Ok(self
            .names
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| user_id.to_string()))
    }

    async fn get_permalink(
        &self,
        _channel_id: &str,
        _message_ts: &str,
    ) -> Result<String, BridgeError> {
        Ok(format!("{PERMALINK}?thread_ts=1700000000.000100&cid=C1"))
    }

    async fn post_thread_reply(
        &self,
        channel_id: &str,
        thread_ts: &str,
        text: &str,
    ) -> Result<(), BridgeError> {
        self.posted.lock().unwrap().push((
            channel_id.to_string(),
            thread_ts.to_string(),
            text.to_string(),
        ));
        match &self.post_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    async fn post_channel_message(&self, channel_id: &str, text: &str) -> Result<(), BridgeError> {
        self.forwarded
            .lock()
            .unwrap()
            .push((channel_id.to_string(), text.to_string()));
        match &self.forward_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

pub struct FakeModel {
    pub answer: Result<String, BridgeError>,
    pub calls: AtomicUsize,
    pub last_prompt: Mutex<Option<String>>,
}

impl FakeModel {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Ok(answer.to_string()),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn failing(error: BridgeError) -> Self {
        Self {
            answer: Err(error),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn question_neutral_low() -> Self {
        Self::answering(
            r#"{"type":"Question","description":"User asks how to export reports","sentiment":"Neutral","urgency":"Low","summary":"Answered: use Reports > Export."}"#,
        )
    }
}

#[async_trait]
impl LanguageModel for FakeModel {
    async fn complete(&self, _system: &str, prompt: &str) -> Result<String, BridgeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        self.answer.clone()
    }
}

#[derive(Default)]
pub struct FakeSheet {
    pub header_error: Option<BridgeError>,
    pub append_error: Option<BridgeError>,
    pub header_calls: AtomicUsize,
    pub headers: Mutex<Vec<(String, Vec<String>)>>,
    pub rows: Mutex<Vec<(String, Vec<String>)>>,
}

impl FakeSheet {
    pub fn rows(&self) -> Vec<Vec<String>> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .map(|(_, values)| values.clone())
            .collect()
    }
}

#[async_trait]
impl SpreadsheetBackend for FakeSheet {
    async fn ensure_header(&self, tab: &str, columns: &[&str]) -> Result<bool, BridgeError> {
        self.header_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = &self.header_error {
            return Err(e.clone());
        }
        let mut headers = self.headers.lock().unwrap();
        if headers.iter().any(|(t, _)| t == tab) {
            return Ok(false);
        }
        headers.push((
            tab.to_string(),
            columns.iter().map(ToString::to_string).collect(),
        ));
        Ok(true)
    }

    async fn append_row(&self, tab: &str, values: &[String]) -> Result<Option<String>, BridgeError> {
        if let Some(e) = &self.append_error {
            return Err(e.clone());
        }
        let mut rows = self.rows.lock().unwrap();
        rows.push((tab.to_string(), values.to_vec()));
        Ok(Some(format!("'{tab}'!A{n}:K{n}", n = rows.len() + 1)))
    }
}

pub fn router(
    chat: &Arc<FakeChat>,
    model: &Arc<FakeModel>,
    sheet: &Arc<FakeSheet>,
) -> CommandRouter {
    router_with_config(chat, model, sheet, &test_config())
}

pub fn router_with_config(
    chat: &Arc<FakeChat>,
    model: &Arc<FakeModel>,
    sheet: &Arc<FakeSheet>,
    config: &AppConfig,
) -> CommandRouter {
    CommandRouter::new(
        Arc::clone(chat) as Arc<dyn ChatPlatform>,
        Arc::clone(model) as Arc<dyn LanguageModel>,
        Arc::clone(sheet) as Arc<dyn SpreadsheetBackend>,
        config,
    )
}
