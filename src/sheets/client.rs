//! Google Sheets v4 client module
//!
//! Talks to the `values` endpoints with a bearer token from a [`TokenSource`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::SpreadsheetBackend;
use super::auth::TokenSource;
use crate::errors::BridgeError;

#[derive(Debug, Deserialize)]
struct ValueRangeResponse {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
    updates: Option<AppendUpdates>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendUpdates {
    updated_range: Option<String>,
}

pub struct SheetsClient {
    http: Client,
    spreadsheet_id: String,
    tokens: Arc<dyn TokenSource>,
    api_base: String,
}

impl SheetsClient {
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(
        spreadsheet_id: String,
        tokens: Arc<dyn TokenSource>,
        api_base: &str,
        timeout: Duration,
    ) -> Result<Self, BridgeError> {
        let http = Client::builder().timeout(timeout).build().map_err(|e| {
            BridgeError::Config(format!("Failed to build Sheets HTTP client: {e}"))
        })?;

        Ok(Self {
            http,
            spreadsheet_id,
            tokens,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.api_base,
            self.spreadsheet_id,
            urlencoding::encode(range)
        )
    }
}

/// Spreadsheet column letter for a 1-based index (1 -> A, 27 -> AA).
#[must_use]
pub fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        letters.push(char::from(b'A' + u8::try_from(rem).unwrap_or(0)));
        index = (index - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// A1 range covering `width` columns of `tab`, starting at column A.
/// `first_row` limits it to row 1.
#[must_use]
pub fn a1_range(tab: &str, width: usize, first_row: bool) -> String {
    let quoted = tab.replace('\'', "''");
    let last = column_letter(width.max(1));
    if first_row {
        format!("'{quoted}'!A1:{last}1")
    } else {
        format!("'{quoted}'!A:{last}")
    }
}

/// 404s and unparseable ranges mean the spreadsheet or tab is missing.
fn classify_failure(status: StatusCode, body: &str, what: &str) -> BridgeError {
    let snippet: String = body.chars().take(300).collect();
    if status == StatusCode::NOT_FOUND
        || (status == StatusCode::BAD_REQUEST && body.contains("Unable to parse range"))
    {
        BridgeError::SheetNotFound(format!("{what} (status {status}): {snippet}"))
    } else {
        BridgeError::SheetUnavailable(format!("{what} failed (status {status}): {snippet}"))
    }
}

async fn check_status(response: Response, what: &str) -> Result<Response, BridgeError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_failure(status, &body, what))
}

fn transport(what: &str, e: &reqwest::Error) -> BridgeError {
    BridgeError::SheetUnavailable(format!("{what} request failed: {e}"))
}

#[async_trait]
impl SpreadsheetBackend for SheetsClient {
    async fn ensure_header(&self, tab: &str, columns: &[&str]) -> Result<bool, BridgeError> {
        let range = a1_range(tab, columns.len(), true);
        let token = self.tokens.access_token().await?;

        let response = self
            .http
            .get(self.values_url(&range))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| transport("Header read", &e))?;
        let current: ValueRangeResponse = check_status(response, "Header read")
            .await?
            .json()
            .await
            .map_err(|e| BridgeError::SheetUnavailable(format!("Header read JSON parse error: {e}")))?;

        let existing = current.values.into_iter().next().unwrap_or_default();
        if !existing.is_empty() {
            if existing.iter().map(String::as_str).ne(columns.iter().copied()) {
                warn!(tab = %tab, found = ?existing, "Header row differs from expected columns");
            }
            return Ok(false);
        }

        let response = self
            .http
            .put(self.values_url(&range))
            .bearer_auth(&token)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({
                "range": range,
                "majorDimension": "ROWS",
                "values": [columns],
            }))
            .send()
            .await
            .map_err(|e| transport("Header write", &e))?;
        check_status(response, "Header write").await?;

        debug!(tab = %tab, "Wrote header row");
        Ok(true)
    }

    async fn append_row(&self, tab: &str, values: &[String]) -> Result<Option<String>, BridgeError> {
        let range = a1_range(tab, values.len(), false);
        let url = format!("{}:append", self.values_url(&range));
        let token = self.tokens.access_token().await?;

        let response = self
            .http
            .post(url)
            .bearer_auth(&token)
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({
                "majorDimension": "ROWS",
                "values": [values],
            }))
            .send()
            .await
            .map_err(|e| transport("Row append", &e))?;

        let body: AppendResponse = check_status(response, "Row append")
            .await?
            .json()
            .await
            .map_err(|e| BridgeError::SheetUnavailable(format!("Row append JSON parse error: {e}")))?;

        Ok(body.updates.and_then(|u| u.updated_range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letter() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(11), "K");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(0), "");
    }

    #[test]
    fn test_a1_range_quotes_tab() {
        assert_eq!(a1_range("PQF", 11, true), "'PQF'!A1:K1");
        assert_eq!(a1_range("Tim's log", 11, false), "'Tim''s log'!A:K");
    }

    #[test]
    fn test_classify_failure() {
        assert!(matches!(
            classify_failure(StatusCode::NOT_FOUND, "", "Row append"),
            BridgeError::SheetNotFound(_)
        ));
        assert!(matches!(
            classify_failure(
                StatusCode::BAD_REQUEST,
                "Unable to parse range: 'Nope'!A:K",
                "Row append"
            ),
            BridgeError::SheetNotFound(_)
        ));
        assert!(matches!(
            classify_failure(StatusCode::FORBIDDEN, "quota", "Row append"),
            BridgeError::SheetUnavailable(_)
        ));
    }
}
