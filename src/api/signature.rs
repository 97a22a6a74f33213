use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::error;

/// Requests older (or newer) than this many seconds are rejected as replays.
pub const MAX_CLOCK_SKEW_SECS: u64 = 300;

/// Checks Slack's v0 request signature over `timestamp` and the raw body.
///
/// The comparison is constant-time. A timestamp outside the replay window, an
/// unparseable timestamp, or a malformed signature all fail verification.
#[must_use]
pub fn verify_slack_signature(
    request_body: &str,
    timestamp: &str,
    signature: &str,
    signing_secret: &str,
    now_secs: u64,
) -> bool {
    let Ok(ts) = timestamp.parse::<u64>() else {
        error!("Unparseable X-Slack-Request-Timestamp");
        return false;
    };
    if now_secs.abs_diff(ts) > MAX_CLOCK_SKEW_SECS {
        error!("Timestamp out of range, potential replay attack");
        return false;
    }

    let Some(expected) = signature
        .strip_prefix("v0=")
        .and_then(|h| hex::decode(h).ok())
    else {
        error!("Malformed X-Slack-Signature");
        return false;
    };

    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(signing_secret.as_bytes()) else {
        error!("Failed to create HMAC");
        return false;
    };
    mac.update(format!("v0:{timestamp}:{request_body}").as_bytes());

    if mac.verify_slice(&expected).is_ok() {
        true
    } else {
        error!("Slack signature verification failed");
        false
    }
}

/// `v0=<hex>` signature Slack would send for this request.
#[must_use]
pub fn compute_signature(timestamp: &str, request_body: &str, signing_secret: &str) -> String {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(signing_secret.as_bytes()) else {
        return String::new();
    };
    mac.update(format!("v0:{timestamp}:{request_body}").as_bytes());
    format!("v0={}", hex::encode(mac.finalize().into_bytes()))
}
