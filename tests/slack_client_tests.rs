use std::time::Duration;

use httpmock::prelude::*;
use pqf_bot::errors::BridgeError;
use pqf_bot::slack::{ChatPlatform, SlackClient};
use serde_json::json;

fn client(server: &MockServer) -> SlackClient {
    SlackClient::new(
        "xoxb-test".to_string(),
        &server.base_url(),
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn test_fetch_replies_follows_cursor() {
    let server = MockServer::start();
    let first = server.mock(|when, then| {
        when.method(GET)
            .path("/conversations.replies")
            .header("authorization", "Bearer xoxb-test")
            .query_param("channel", "C1")
            .query_param("ts", "1700000000.000100")
            .query_param_missing("cursor");
        then.status(200).json_body(json!({
            "ok": true,
            "messages": [
                { "type": "message", "ts": "1700000000.000100", "thread_ts": "1700000000.000100", "user": "U1", "text": "root" },
                { "type": "message", "ts": "1700000060.000200", "thread_ts": "1700000000.000100", "user": "U2", "text": "first reply" }
            ],
            "has_more": true,
            "response_metadata": { "next_cursor": "bmV4dA==" }
        }));
    });
    let second = server.mock(|when, then| {
        when.method(GET)
            .path("/conversations.replies")
            .query_param("cursor", "bmV4dA==");
        then.status(200).json_body(json!({
            "ok": true,
            "messages": [
                { "type": "message", "ts": "1700000000.000100", "thread_ts": "1700000000.000100", "user": "U1", "text": "root" },
                { "type": "message", "ts": "1700000120.000300", "thread_ts": "1700000000.000100", "bot_id": "B1", "text": "deployed" }
            ],
            "has_more": false,
            "response_metadata": { "next_cursor": "" }
        }));
    });

    let messages = client(&server)
        .fetch_replies("C1", "1700000000.000100")
        .await
        .unwrap();

    first.assert_calls(1);
    second.assert_calls(1);
    // The parent heads both pages but is kept once.
    let texts: Vec<&str> = messages.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec!["root", "first reply", "deployed"]);
    assert_eq!(messages[0].user_id.as_deref(), Some("U1"));
    assert_eq!(messages[2].user_id, None);
    assert_eq!(messages[2].bot_label.as_deref(), Some("B1"));
    assert_eq!(messages[2].text, "deployed");
}

#[tokio::test]
async fn test_thread_not_found_and_auth_errors() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/conversations.replies")
            .query_param("channel", "C404");
        then.status(200)
            .json_body(json!({ "ok": false, "error": "thread_not_found" }));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/conversations.replies")
            .query_param("channel", "C401");
        then.status(200)
            .json_body(json!({ "ok": false, "error": "invalid_auth" }));
    });

    let client = client(&server);
    let err = client.fetch_replies("C404", "1.0").await.unwrap_err();
    assert!(matches!(err, BridgeError::ThreadNotFound(_)));

    let err = client.fetch_replies("C401", "1.0").await.unwrap_err();
    assert!(matches!(err, BridgeError::PlatformUnavailable(_)));
}

#[tokio::test]
async fn test_http_failure_is_platform_unavailable() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/conversations.replies");
        then.status(503).body("upstream down");
    });

    let err = client(&server).fetch_replies("C1", "1.0").await.unwrap_err();
    assert!(matches!(err, BridgeError::PlatformUnavailable(_)));
}

#[tokio::test]
async fn test_resolve_user_prefers_real_name() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/users.info").query_param("user", "U1");
        then.status(200).json_body(json!({
            "ok": true,
            "user": {
                "id": "U1",
                "name": "ani",
                "profile": { "real_name": "Ani Wijaya", "display_name": "ani.w" }
            }
        }));
    });

    let name = client(&server).resolve_user("U1").await.unwrap();

    mock.assert_calls(1);
    assert_eq!(name, "Ani Wijaya");
}

#[tokio::test]
async fn test_get_permalink() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/chat.getPermalink")
            .query_param("channel", "C1")
            .query_param("message_ts", "1700000000.000100");
        then.status(200).json_body(json!({
            "ok": true,
            "channel": "C1",
            "permalink": "https://acme.slack.com/archives/C1/p1700000000000100?thread_ts=1700000000.000100&cid=C1"
        }));
    });

    let link = client(&server)
        .get_permalink("C1", "1700000000.000100")
        .await
        .unwrap();
    assert!(link.starts_with("https://acme.slack.com/archives/C1/p1700000000000100"));
}

#[tokio::test]
async fn test_post_thread_reply_retries_transient_failures() {
    let server = MockServer::start();
    let failing = server.mock(|when, then| {
        when.method(POST)
            .path("/chat.postMessage")
            .body_includes("\"thread_ts\":\"1700000000.000100\"")
            .body_includes("retry me");
        then.status(500).body("boom");
    });

    let err = client(&server)
        .post_thread_reply("C1", "1700000000.000100", "retry me")
        .await
        .unwrap_err();

    assert!(matches!(err, BridgeError::PlatformUnavailable(_)));
    // First attempt plus three retries.
    failing.assert_calls(4);
}

#[tokio::test]
async fn test_post_thread_reply_success() {
    let server = MockServer::start();
    let post = server.mock(|when, then| {
        when.method(POST)
            .path("/chat.postMessage")
            .header("authorization", "Bearer xoxb-test")
            .body_includes("\"channel\":\"C1\"");
        then.status(200).json_body(json!({
            "ok": true,
            "channel": "C1",
            "ts": "1700000200.000100",
            "message": { "ts": "1700000200.000100", "text": "✅ Stored" }
        }));
    });

    client(&server)
        .post_thread_reply("C1", "1700000000.000100", "✅ Stored")
        .await
        .unwrap();
    post.assert_calls(1);
}

#[tokio::test]
async fn test_post_channel_message_is_top_level() {
    let server = MockServer::start();
    let post = server.mock(|when, then| {
        when.method(POST)
            .path("/chat.postMessage")
            .header("authorization", "Bearer xoxb-test")
            .body_includes("\"channel\":\"C-FWD\"")
            .body_includes("[Tercatat]")
            .body_excludes("thread_ts");
        then.status(200).json_body(json!({
            "ok": true,
            "channel": "C-FWD",
            "ts": "1700000300.000100",
            "message": { "ts": "1700000300.000100", "text": "[Tercatat]" }
        }));
    });

    client(&server)
        .post_channel_message(
            "C-FWD",
            "[Q4] [2023] [Week 3] [Date 15 - November] [Tercatat]\nhttps://acme.slack.com/archives/C1/p1",
        )
        .await
        .unwrap();
    post.assert_calls(1);
}
