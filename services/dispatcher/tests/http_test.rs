mod common;

use common::slash;
use interaction_hub_dispatcher::{
    commands::{self, feedback},
    platform::{
        AckError, CommandPublisher, HttpCommandPublisher, InteractionResponder, PlatformClient,
        PublishError, ReplyMessage,
    },
    tenant::{HttpConfigStore, StoreError, TenantConfig},
    ConfigStore,
};
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn platform(server: &MockServer) -> PlatformClient {
    PlatformClient::new(&server.uri(), "app-1", 5).expect("failed to build platform client")
}

#[tokio::test]
async fn test_http_store_get_returns_record() {
    let server = MockServer::start().await;
    let mut config = TenantConfig::new_default("tenant_a");
    config.settings.admin_role_ids = vec!["10".to_string()];
    Mock::given(method("GET"))
        .and(path("/v1/tenants/tenant_a/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&config))
        .expect(1)
        .mount(&server)
        .await;

    let store = HttpConfigStore::new(&server.uri(), 5).expect("failed to build store");
    let loaded = store
        .get("tenant_a")
        .await
        .expect("failed to fetch config")
        .expect("record should exist");

    assert_eq!(loaded, config);
    assert_eq!(store.backend(), "http");
}

#[tokio::test]
async fn test_http_store_missing_record_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/tenants/tenant_a/config"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let store = HttpConfigStore::new(&server.uri(), 5).expect("failed to build store");
    let loaded = store.get("tenant_a").await.expect("failed to fetch config");

    assert!(loaded.is_none());
}

#[tokio::test]
async fn test_http_store_server_error_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/tenants/tenant_a/config"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let store = HttpConfigStore::new(&server.uri(), 5).expect("failed to build store");
    let err = store
        .get("tenant_a")
        .await
        .expect_err("503 should be an error");

    assert!(err.is_transient());
    assert!(matches!(err, StoreError::Status { status: 503, .. }));
}

#[tokio::test]
async fn test_http_store_put_sends_record() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/tenants/tenant_a/config"))
        .and(body_partial_json(json!({
            "tenant_id": "tenant_a",
            "settings": { "ai_chat_mode": "always_respond" }
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let store = HttpConfigStore::new(&server.uri(), 5).expect("failed to build store");
    let mut config = TenantConfig::new_default("tenant_a");
    config.settings.ai_chat_mode = interaction_hub_dispatcher::tenant::AiChatMode::AlwaysRespond;

    store
        .put("tenant_a", &config)
        .await
        .expect("failed to persist config");
}

#[tokio::test]
async fn test_http_store_rejection_is_permanent() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/tenants/tenant_a/config"))
        .respond_with(ResponseTemplate::new(422).set_body_string("invalid settings"))
        .mount(&server)
        .await;

    let store = HttpConfigStore::new(&server.uri(), 5).expect("failed to build store");
    let err = store
        .put("tenant_a", &TenantConfig::new_default("tenant_a"))
        .await
        .expect_err("422 should be an error");

    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_responder_reply_posts_channel_message_callback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/interactions/ix-ping/token/callback"))
        .and(body_json(json!({
            "type": 4,
            "data": { "content": "hello", "flags": 64 }
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let responder = platform(&server).responder_for(&slash("ping"));
    responder
        .reply(&ReplyMessage::ephemeral("hello"))
        .await
        .expect("failed to send reply");
}

#[tokio::test]
async fn test_responder_defer_posts_deferred_callback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/interactions/ix-ping/token/callback"))
        .and(body_json(json!({ "type": 5 })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let responder = platform(&server).responder_for(&slash("ping"));
    responder
        .defer_reply(false)
        .await
        .expect("failed to defer reply");
}

#[tokio::test]
async fn test_responder_modal_posts_modal_callback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/interactions/ix-feedback/token/callback"))
        .and(body_partial_json(json!({
            "type": 9,
            "data": { "custom_id": feedback::MODAL_ID, "title": "Send Feedback" }
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let responder = platform(&server).responder_for(&slash("feedback"));
    responder
        .show_modal(&feedback::feedback_modal())
        .await
        .expect("failed to show modal");
}

#[tokio::test]
async fn test_responder_edit_and_follow_up_use_webhook() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/webhooks/app-1/token/messages/@original"))
        .and(body_json(json!({ "content": "edited" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "1" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/webhooks/app-1/token"))
        .and(body_json(json!({ "content": "more", "flags": 64 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "2" })))
        .expect(1)
        .mount(&server)
        .await;

    let responder = platform(&server).responder_for(&slash("ping"));
    responder
        .edit_reply("edited")
        .await
        .expect("failed to edit reply");
    responder
        .follow_up(&ReplyMessage::ephemeral("more"))
        .await
        .expect("failed to send follow-up");
}

#[tokio::test]
async fn test_responder_surfaces_platform_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/interactions/ix-ping/token/callback"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Interaction has already been acknowledged."))
        .mount(&server)
        .await;

    let responder = platform(&server).responder_for(&slash("ping"));
    let err = responder
        .reply(&ReplyMessage::new("late"))
        .await
        .expect_err("platform rejection should surface");

    match err {
        AckError::Platform { status, message } => {
            assert_eq!(status, 400);
            assert!(message.contains("already been acknowledged"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_publisher_replaces_command_set() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/applications/app-1/commands"))
        .and(header("authorization", "Bot secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let table = commands::build_routing_table().expect("failed to build routing table");
    let specs = table.publishable_specs();
    let publisher = HttpCommandPublisher::new(&platform(&server), "app-1", "secret-token");

    let published = publisher
        .bulk_set(&specs)
        .await
        .expect("failed to publish commands");

    assert_eq!(published, specs.len());
    assert_eq!(published, 5);
}

#[tokio::test]
async fn test_publisher_reports_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/applications/app-1/commands"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid form body"))
        .mount(&server)
        .await;

    let publisher = HttpCommandPublisher::new(&platform(&server), "app-1", "secret-token");
    let err = publisher
        .bulk_set(&[])
        .await
        .expect_err("rejection should surface");

    assert!(matches!(err, PublishError::Rejected { status: 400, .. }));
}

#[tokio::test]
async fn test_publisher_requires_application_id() {
    let server = MockServer::start().await;
    let publisher = HttpCommandPublisher::new(&platform(&server), "", "secret-token");

    let err = publisher
        .bulk_set(&[])
        .await
        .expect_err("missing application id should fail");

    assert!(matches!(err, PublishError::NotConfigured(_)));
}
