//! Telegram notification delivery against a local mock server

use libautopost::config::{TelegramConfig, TelegramCredentials};
use libautopost::notify::{NotificationSink, Reporter, TelegramSink};
use secrecy::SecretString;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sink(server: &MockServer) -> TelegramSink {
    let config = TelegramConfig {
        api_url: server.uri(),
    };
    let credentials = TelegramCredentials {
        bot_token: SecretString::from("123456:ABC-token".to_string()),
        chat_id: "-1001234".to_string(),
    };
    TelegramSink::new(&config, &credentials)
}

#[tokio::test]
async fn test_send_message_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123456:ABC-token/sendMessage"))
        .and(body_json(json!({ "chat_id": "-1001234", "text": "Bot started" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    sink(&server).send("Bot started").await;
}

#[tokio::test]
async fn test_rejected_message_is_swallowed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "ok": false, "description": "Bad Request: chat not found"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let reporter = Reporter::new(Arc::new(sink(&server)));
    reporter.info("first").await;
    reporter.error("second").await;
}

#[tokio::test]
async fn test_unreachable_endpoint_is_swallowed() {
    let config = TelegramConfig {
        api_url: "http://127.0.0.1:9".to_string(),
    };
    let credentials = TelegramCredentials {
        bot_token: SecretString::from("token".to_string()),
        chat_id: "1".to_string(),
    };

    TelegramSink::new(&config, &credentials)
        .send("nobody is listening")
        .await;
}
