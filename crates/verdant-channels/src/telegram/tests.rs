use super::TelegramChannel;
use std::time::Duration;
use verdant_core::{config::TelegramConfig, traits::Transport, update::ChatKind};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "123:ABC";

fn channel_for(server: &MockServer) -> TelegramChannel {
    TelegramChannel::new(TelegramConfig {
        enabled: true,
        bot_token: TOKEN.into(),
        api_base: server.uri(),
        ..Default::default()
    })
}

fn method_path(name: &str) -> String {
    format!("/bot{TOKEN}/{name}")
}

#[tokio::test]
async fn test_fetch_maps_updates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(method_path("getUpdates")))
        .and(body_partial_json(serde_json::json!({"offset": 10})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": true,
            "result": [
                {
                    "update_id": 10,
                    "message": {
                        "message_id": 5,
                        "from": {"id": 42, "is_bot": false, "first_name": "Ada"},
                        "chat": {"id": 42, "type": "private"},
                        "text": "hi"
                    }
                },
                {
                    "update_id": 11,
                    "message": {
                        "message_id": 6,
                        "from": {"id": 43, "first_name": "Bo", "username": "bo"},
                        "chat": {"id": -100, "type": "supergroup"},
                        "caption": "look at this moss",
                        "reply_to_message": {"from": {"id": 777, "is_bot": true, "first_name": "Verdant"}}
                    }
                },
                {"update_id": 12}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = channel_for(&server)
        .fetch_updates(10, Duration::from_secs(0))
        .await
        .unwrap();
    assert!(!outcome.webhook_blocked);
    assert_eq!(outcome.updates.len(), 3);

    let first = outcome.updates[0].message.as_ref().unwrap();
    assert_eq!(first.chat_kind, ChatKind::Private);
    assert_eq!(first.text.as_deref(), Some("hi"));
    assert_eq!(first.from.as_ref().unwrap().id, 42);

    let second = outcome.updates[1].message.as_ref().unwrap();
    assert_eq!(second.chat_kind, ChatKind::Supergroup);
    assert_eq!(second.text.as_deref(), Some("look at this moss"));
    assert_eq!(second.reply_to_user_id, Some(777));

    assert!(outcome.updates[2].message.is_none());
}

#[tokio::test]
async fn test_conflict_status_reports_webhook_blocked() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(method_path("getUpdates")))
        .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
            "ok": false,
            "error_code": 409,
            "description": "Conflict: can't use getUpdates method while webhook is active"
        })))
        .mount(&server)
        .await;

    let outcome = channel_for(&server)
        .fetch_updates(0, Duration::from_secs(0))
        .await
        .unwrap();
    assert!(outcome.webhook_blocked);
    assert!(outcome.updates.is_empty());
}

#[tokio::test]
async fn test_conflict_error_code_in_ok_status_is_blocked() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(method_path("getUpdates")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": false,
            "error_code": 409,
            "description": "Conflict"
        })))
        .mount(&server)
        .await;

    let outcome = channel_for(&server)
        .fetch_updates(0, Duration::from_secs(0))
        .await
        .unwrap();
    assert!(outcome.webhook_blocked);
}

#[tokio::test]
async fn test_other_api_errors_are_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(method_path("getUpdates")))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let result = channel_for(&server)
        .fetch_updates(0, Duration::from_secs(0))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_send_falls_back_to_plain_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(method_path("sendMessage")))
        .and(body_partial_json(serde_json::json!({"parse_mode": "Markdown"})))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: can't parse entities: Can't find end of the entity"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(method_path("sendMessage")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": true,
            "result": {"message_id": 1}
        })))
        .expect(1)
        .mount(&server)
        .await;

    channel_for(&server)
        .send_message(42, "an *unclosed entity")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_send_long_message_in_chunks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(method_path("sendMessage")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": true,
            "result": {"message_id": 1}
        })))
        .expect(3)
        .mount(&server)
        .await;

    channel_for(&server)
        .send_message(42, &"y".repeat(9000))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_send_reaction() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(method_path("setMessageReaction")))
        .and(body_partial_json(serde_json::json!({
            "chat_id": 42,
            "message_id": 5,
            "reaction": [{"type": "emoji", "emoji": "\u{1f44e}"}]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true, "result": true})),
        )
        .expect(1)
        .mount(&server)
        .await;

    channel_for(&server)
        .send_reaction(42, 5, "\u{1f44e}")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_get_me_and_delete_webhook() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(method_path("getMe")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": true,
            "result": {"id": 777, "is_bot": true, "first_name": "Verdant", "username": "verdant_bot"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(method_path("deleteWebhook")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true, "result": true})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let channel = channel_for(&server);
    let me = channel.get_me().await.unwrap();
    assert_eq!(me.id, 777);
    assert_eq!(me.username, "verdant_bot");
    channel.delete_webhook().await.unwrap();
}
