/// PQF bot - files Slack threads into a quality-tracking spreadsheet.
///
/// A user mentions the bot inside a thread with `masukkan ke pqf`. The bot
/// reads the whole thread, asks Gemini to classify it (type, sentiment,
/// urgency, summary), appends one row to a Google Sheets tab and replies in
/// the thread.
///
/// # Architecture
///
/// - `api`: Lambda entry point. Verifies Slack signatures and turns Events API
///   payloads into mention events.
/// - `router`: matches the command and drives fetch, classify and write as an
///   explicit state machine, one reply per event.
/// - `slack`, `ai`, `sheets`: the three external services, each behind an
///   async trait so the pipeline can run against in-memory fakes.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use pqf_bot::core::config::AppConfig;
/// use pqf_bot::core::models::MentionEvent;
/// use pqf_bot::router::CommandRouter;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     pqf_bot::setup_logging();
///
///     let config = AppConfig::from_env()?;
///     let router = Arc::new(CommandRouter::from_config(&config)?);
///
///     let outcome = router
///         .handle(&MentionEvent {
///             event_id: "Ev0001".into(),
///             channel_id: "C12345678".into(),
///             thread_ts: "1759804695.537539".into(),
///             user_id: "U12345678".into(),
///             raw_text: "<@UBOT> masukkan ke pqf".into(),
///         })
///         .await;
///     println!("{outcome:?}");
///
///     Ok(())
/// }
/// ```
// Module declarations
pub mod ai;
pub mod api;
pub mod core;
pub mod errors;
pub mod router;
pub mod sheets;
pub mod slack;

pub use errors::{BridgeError, Stage};

/// Configure structured logging with JSON format for AWS Lambda environments.
///
/// Level comes from `RUST_LOG`, defaulting to `info`. Safe to call more than
/// once; later calls leave the first subscriber in place.
///
/// # Example
///
/// ```
/// pqf_bot::setup_logging();
/// ```
pub fn setup_logging() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().json().with_target(true);

    // Already initialised (e.g. a second call from tests) is not an error.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
