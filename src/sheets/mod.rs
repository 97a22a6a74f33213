//! Spreadsheet persistence

pub mod auth;
pub mod client;
pub mod writer;

use async_trait::async_trait;

use crate::errors::BridgeError;

pub use auth::{ServiceAccountTokens, StaticToken, TokenSource, token_source_from_config};
pub use client::SheetsClient;
pub use writer::{SheetWriter, compose_row};

/// The spreadsheet calls the writer depends on.
#[async_trait]
pub trait SpreadsheetBackend: Send + Sync {
    /// Makes sure row 1 of `tab` holds `columns`. Returns `true` when the
    /// header had to be written.
    async fn ensure_header(&self, tab: &str, columns: &[&str]) -> Result<bool, BridgeError>;

    /// Appends one row in a single request. Returns the updated A1 range when
    /// the backend reports it.
    async fn append_row(&self, tab: &str, values: &[String]) -> Result<Option<String>, BridgeError>;
}
