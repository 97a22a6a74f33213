use std::{env, fmt, fs};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono_tz::Tz;

use crate::errors::BridgeError;

pub const DEFAULT_LLM_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_SHEET_TAB: &str = "PQF";
pub const DEFAULT_MAX_CONCURRENT_PIPELINES: usize = 4;
pub const DEFAULT_MAX_PROMPT_CHARS: usize = 12_000;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SHEET_TIMEZONE: Tz = chrono_tz::Asia::Jakarta;
pub const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";
pub const DEFAULT_LLM_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_SHEETS_API_BASE: &str = "https://sheets.googleapis.com";

/// Where Sheets API access tokens come from.
#[derive(Clone, PartialEq, Eq)]
pub enum SheetsAuth {
    /// Service-account key JSON. Tokens are minted from it and refreshed.
    ServiceAccount(String),
    /// A fixed bearer token. Google tokens expire after about an hour, so this
    /// only suits local runs.
    AccessToken(String),
}

impl fmt::Debug for SheetsAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetsAuth::ServiceAccount(_) => f.write_str("ServiceAccount(..)"),
            SheetsAuth::AccessToken(_) => f.write_str("AccessToken(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub slack_bot_token: String,
    pub slack_signing_secret: String,
    pub llm_api_key: String,
    pub llm_model: String,
    pub spreadsheet_id: String,
    pub sheets_auth: SheetsAuth,
    pub sheet_tab: String,
    /// Channel that gets a one-line notice for every stored thread.
    pub forward_channel_id: Option<String>,
    /// Channels the bot answers in. Empty means every channel.
    pub allowed_channels: Vec<String>,
    pub max_concurrent_pipelines: usize,
    pub max_prompt_chars: usize,
    pub http_timeout_secs: u64,
    pub sheet_timezone: Tz,
    pub slack_api_base: String,
    pub llm_api_base: String,
    pub sheets_api_base: String,
}

impl AppConfig {
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] naming the first missing or malformed variable.
    pub fn from_env() -> Result<Self, BridgeError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] naming the first missing or malformed variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BridgeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| BridgeError::Config(format!("{key} is not set")))
        };

        let llm_api_key = get("LLM_API_KEY")
            .or_else(|| get("GEMINI_API_KEY"))
            .ok_or_else(|| BridgeError::Config("LLM_API_KEY is not set".to_string()))?;

        let sheet_timezone = match get("SHEET_TIMEZONE") {
            Some(name) => name
                .trim()
                .parse::<Tz>()
                .map_err(|e| BridgeError::Config(format!("SHEET_TIMEZONE: {e}")))?,
            None => DEFAULT_SHEET_TIMEZONE,
        };

        Ok(Self {
            slack_bot_token: required("SLACK_BOT_TOKEN")?,
            slack_signing_secret: required("SLACK_SIGNING_SECRET")?,
            llm_api_key,
            llm_model: get("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            spreadsheet_id: required("SPREADSHEET_ID")?,
            sheets_auth: sheets_auth(&get)?,
            sheet_tab: get("SHEET_TAB").unwrap_or_else(|| DEFAULT_SHEET_TAB.to_string()),
            forward_channel_id: get("FORWARD_CHANNEL_ID").map(|c| c.trim().to_string()),
            allowed_channels: get("ALLOWED_CHANNELS")
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
            max_concurrent_pipelines: parse_number(
                get("MAX_CONCURRENT_PIPELINES"),
                "MAX_CONCURRENT_PIPELINES",
                DEFAULT_MAX_CONCURRENT_PIPELINES,
            )?
            .max(1),
            max_prompt_chars: parse_number(
                get("MAX_PROMPT_CHARS"),
                "MAX_PROMPT_CHARS",
                DEFAULT_MAX_PROMPT_CHARS,
            )?,
            http_timeout_secs: parse_number(
                get("HTTP_TIMEOUT_SECS"),
                "HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?,
            sheet_timezone,
            slack_api_base: get("SLACK_API_BASE")
                .unwrap_or_else(|| DEFAULT_SLACK_API_BASE.to_string()),
            llm_api_base: get("LLM_API_BASE").unwrap_or_else(|| DEFAULT_LLM_API_BASE.to_string()),
            sheets_api_base: get("SHEETS_API_BASE")
                .unwrap_or_else(|| DEFAULT_SHEETS_API_BASE.to_string()),
        })
    }

    #[must_use]
    pub fn is_channel_allowed(&self, channel_id: &str) -> bool {
        self.allowed_channels.is_empty() || self.allowed_channels.iter().any(|c| c == channel_id)
    }
}

/// Inline JSON, then base64 JSON, then a key file, then a fixed token.
fn sheets_auth<G>(get: &G) -> Result<SheetsAuth, BridgeError>
where
    G: Fn(&str) -> Option<String>,
{
    if let Some(json) = get("GOOGLE_SHEETS_CREDENTIALS_JSON") {
        return Ok(SheetsAuth::ServiceAccount(json));
    }

    if let Some(encoded) =
        get("GOOGLE_SHEETS_CREDENTIALS_B64").or_else(|| get("GOOGLE_CREDENTIALS_B64"))
    {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| BridgeError::Config(format!("GOOGLE_SHEETS_CREDENTIALS_B64: {e}")))?;
        let json = String::from_utf8(bytes)
            .map_err(|e| BridgeError::Config(format!("GOOGLE_SHEETS_CREDENTIALS_B64: {e}")))?;
        return Ok(SheetsAuth::ServiceAccount(json));
    }

    if let Some(path) =
        get("GOOGLE_APPLICATION_CREDENTIALS").or_else(|| get("GOOGLE_SHEETS_CREDENTIALS_FILES"))
    {
        let json = fs::read_to_string(path.trim())
            .map_err(|e| BridgeError::Config(format!("Failed to read credentials file {path}: {e}")))?;
        return Ok(SheetsAuth::ServiceAccount(json));
    }

    get("GOOGLE_SHEETS_ACCESS_TOKEN")
        .map(SheetsAuth::AccessToken)
        .ok_or_else(|| {
            BridgeError::Config(
                "Google Sheets credentials are not set (GOOGLE_SHEETS_CREDENTIALS_JSON, \
                 GOOGLE_SHEETS_CREDENTIALS_B64, GOOGLE_APPLICATION_CREDENTIALS or \
                 GOOGLE_SHEETS_ACCESS_TOKEN)"
                    .to_string(),
            )
        })
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn parse_number<T: std::str::FromStr>(
    raw: Option<String>,
    key: &str,
    default: T,
) -> Result<T, BridgeError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| BridgeError::Config(format!("{key}: expected a number, got {value:?}"))),
        None => Ok(default),
    }
}
