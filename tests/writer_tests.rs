mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use common::FakeSheet;
use pqf_bot::core::models::{SHEET_COLUMNS, SheetRow, Sentiment, Urgency};
use pqf_bot::errors::BridgeError;
use pqf_bot::sheets::{SheetWriter, SpreadsheetBackend};

fn row(summary: &str) -> SheetRow {
    SheetRow {
        timestamp: "2025-10-07 09:38:15".into(),
        kind: "Bug".into(),
        description: "Export gagal".into(),
        link: "https://acme.slack.com/archives/C1/p1".into(),
        user: "Ani".into(),
        channel: "C1".into(),
        sentiment: Sentiment::Negative,
        urgency: Urgency::High,
        participants: 3,
        summary: summary.into(),
        created_at: "2025-10-07 10:00:00".into(),
    }
}

#[tokio::test]
async fn test_header_written_once_then_appends() {
    let sheet = Arc::new(FakeSheet::default());
    let writer = SheetWriter::new(Arc::clone(&sheet) as Arc<dyn SpreadsheetBackend>, "PQF");

    let first = writer.append(&row("one")).await.unwrap();
    let second = writer.append(&row("two")).await.unwrap();

    assert!(first.header_created);
    assert!(!second.header_created);
    assert_eq!(first.tab, "PQF");
    assert_eq!(second.updated_range.as_deref(), Some("'PQF'!A3:K3"));
    assert_eq!(sheet.header_calls.load(Ordering::SeqCst), 1);

    let headers = sheet.headers.lock().unwrap().clone();
    assert_eq!(headers.len(), 1);
    assert_eq!(headers[0].1, SHEET_COLUMNS);
}

#[tokio::test]
async fn test_column_order_stable_across_calls() {
    let sheet = Arc::new(FakeSheet::default());
    let writer = SheetWriter::new(Arc::clone(&sheet) as Arc<dyn SpreadsheetBackend>, "PQF");

    for i in 0..5 {
        writer.append(&row(&format!("run {i}"))).await.unwrap();
    }

    for (i, values) in sheet.rows().iter().enumerate() {
        assert_eq!(values.len(), SHEET_COLUMNS.len());
        let summary = format!("run {i}");
        let expected = [
            "2025-10-07 09:38:15",
            "Bug",
            "Export gagal",
            "https://acme.slack.com/archives/C1/p1",
            "Ani",
            "C1",
            "Negative",
            "High",
            "3",
            summary.as_str(),
            "2025-10-07 10:00:00",
        ];
        assert_eq!(values, &expected);
    }
}

/// Header check that fails until told otherwise.
struct FlakyHeader {
    healthy: AtomicBool,
    header_calls: AtomicUsize,
}

#[async_trait]
impl SpreadsheetBackend for FlakyHeader {
    async fn ensure_header(&self, _tab: &str, _columns: &[&str]) -> Result<bool, BridgeError> {
        self.header_calls.fetch_add(1, Ordering::SeqCst);
        if self.healthy.load(Ordering::SeqCst) {
            Ok(false)
        } else {
            Err(BridgeError::SheetUnavailable("503".to_string()))
        }
    }

    async fn append_row(&self, _tab: &str, _values: &[String]) -> Result<Option<String>, BridgeError> {
        Ok(None)
    }
}

#[tokio::test]
async fn test_failed_header_check_not_cached() {
    let backend = Arc::new(FlakyHeader {
        healthy: AtomicBool::new(false),
        header_calls: AtomicUsize::new(0),
    });
    let writer = SheetWriter::new(Arc::clone(&backend) as Arc<dyn SpreadsheetBackend>, "PQF");

    let err = writer.append(&row("x")).await.unwrap_err();
    assert!(matches!(err, BridgeError::SheetUnavailable(_)));

    backend.healthy.store(true, Ordering::SeqCst);
    let outcome = writer.append(&row("x")).await.unwrap();
    assert!(!outcome.header_created);
    assert_eq!(outcome.updated_range, None);

    writer.append(&row("y")).await.unwrap();
    assert_eq!(backend.header_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_append_error_passes_through() {
    let sheet = Arc::new(FakeSheet {
        append_error: Some(BridgeError::SheetNotFound("PQF".to_string())),
        ..FakeSheet::default()
    });
    let writer = SheetWriter::new(Arc::clone(&sheet) as Arc<dyn SpreadsheetBackend>, "PQF");

    let err = writer.append(&row("x")).await.unwrap_err();
    assert_eq!(err, BridgeError::SheetNotFound("PQF".to_string()));
    assert!(sheet.rows().is_empty());
}
