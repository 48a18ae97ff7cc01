//! REST integration tests
//!
//! The client talks to a wiremock server standing in for the platform API.
//!
//! Run with: cargo test -p integration-tests --test rest_tests

use std::time::{Duration, Instant};

use chorus_client::{ClientError, CreateMessage, GroupDmRecipient, MessageQuery};
use chorus_common::FaultKind;
use chorus_core::{ChannelType, FactoryContext, InviteOptions, Snowflake};
use chorus_rest::RestError;
use integration_tests::{fixtures, TestClient, API_PREFIX, PNG_BYTES};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

// ============================================================================
// Messages
// ============================================================================

#[tokio::test]
async fn test_send_message_caches_result() {
    let harness = TestClient::start(1).await.unwrap();
    let author = fixtures::bot_user();
    harness
        .api
        .mock_json(
            "POST",
            "/channels/10/messages",
            200,
            fixtures::message(300, 10, &author, "hello"),
        )
        .await;

    let message = harness
        .client
        .channels()
        .send_message(Snowflake::new(10), CreateMessage::text("hello"))
        .await
        .unwrap();

    assert_eq!(message.read().id, Snowflake::new(300));
    assert_eq!(message.read().author_id, Some(Snowflake::new(fixtures::BOT_USER_ID)));

    let cache = harness.client.cache();
    let cached = cache.messages.get(Snowflake::new(300)).unwrap();
    assert!(std::sync::Arc::ptr_eq(&cached, &message));
    assert!(cache.users.has(Snowflake::new(fixtures::BOT_USER_ID)));

    let requests = harness.api.requests_to("/channels/10/messages").await;
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].headers.get("authorization").unwrap().to_str().unwrap(),
        "Bot test-token"
    );
    let body = harness.api.last_body("/channels/10/messages").await.unwrap();
    assert_eq!(body, json!({"content": "hello", "tts": false}));
}

#[tokio::test]
async fn test_empty_message_is_rejected_locally() {
    let harness = TestClient::start(1).await.unwrap();

    let err = harness
        .client
        .channels()
        .send_message(Snowflake::new(10), CreateMessage::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::InvalidArgument(_)));
    assert!(harness.api.requests().await.is_empty());
}

#[tokio::test]
async fn test_fetch_messages_sends_query() {
    let harness = TestClient::start(1).await.unwrap();
    let author = fixtures::user(5, "alice");
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/channels/10/messages")))
        .and(query_param("limit", "2"))
        .and(query_param("before", "300"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            fixtures::message(299, 10, &author, "second"),
            fixtures::message(298, 10, &author, "first"),
        ])))
        .expect(1)
        .mount(harness.api.server())
        .await;

    let messages = harness
        .client
        .channels()
        .fetch_messages(
            Snowflake::new(10),
            MessageQuery::latest(2).before(Snowflake::new(300)),
        )
        .await
        .unwrap();

    let ids: Vec<_> = messages.iter().map(|m| m.read().id).collect();
    assert_eq!(ids, vec![Snowflake::new(299), Snowflake::new(298)]);
    assert_eq!(harness.client.cache().messages.len(), 2);
}

#[tokio::test]
async fn test_fetch_messages_validates_query() {
    let harness = TestClient::start(1).await.unwrap();

    let err = harness
        .client
        .channels()
        .fetch_messages(Snowflake::new(10), MessageQuery::latest(101))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FaultKind::InvalidArgument);
    assert!(harness.api.requests().await.is_empty());
}

#[tokio::test]
async fn test_voice_channel_rejects_messages() {
    let harness = TestClient::start(1).await.unwrap();
    harness
        .api
        .mock_json("GET", "/channels/20", 200, fixtures::voice_channel(20, 1, "Lounge"))
        .await;

    let channel = harness
        .client
        .channels()
        .fetch_channel(Snowflake::new(20))
        .await
        .unwrap();
    assert_eq!(channel.read().kind(), ChannelType::GuildVoice);

    let err = harness
        .client
        .channels()
        .send_message(Snowflake::new(20), CreateMessage::text("hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NotTextBased(id) if id == Snowflake::new(20)));

    let err = harness
        .client
        .channels()
        .trigger_typing(Snowflake::new(20))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NotTextBased(_)));

    assert!(harness.api.requests_to("/channels/20/messages").await.is_empty());
    assert!(harness.api.requests_to("/channels/20/typing").await.is_empty());
}

#[tokio::test]
async fn test_trigger_typing_accepts_empty_response() {
    let harness = TestClient::start(1).await.unwrap();
    harness.api.mock_no_content("POST", "/channels/10/typing").await;

    harness
        .client
        .channels()
        .trigger_typing(Snowflake::new(10))
        .await
        .unwrap();

    assert_eq!(harness.api.requests_to("/channels/10/typing").await.len(), 1);
}

#[tokio::test]
async fn test_create_invite() {
    let harness = TestClient::start(1).await.unwrap();
    harness
        .api
        .mock_json("POST", "/channels/10/invites", 200, fixtures::invite("abc123", 1, 10, 5))
        .await;

    let options = InviteOptions {
        max_age: Some(3600),
        max_uses: Some(5),
        ..InviteOptions::default()
    };
    let invite = harness
        .client
        .channels()
        .create_invite(Snowflake::new(10), options)
        .await
        .unwrap();

    assert_eq!(invite.code, "abc123");
    assert_eq!(invite.channel_id, Some(Snowflake::new(10)));
    assert_eq!(invite.remaining_uses(), Some(5));
    assert_eq!(invite.url(), "https://discord.gg/abc123");

    let body = harness.api.last_body("/channels/10/invites").await.unwrap();
    assert_eq!(body, json!({"max_age": 3600, "max_uses": 5}));
}

// ============================================================================
// Rate limits and retries
// ============================================================================

#[tokio::test]
async fn test_rate_limited_request_waits_and_retries() {
    let harness = TestClient::start(1).await.unwrap();
    harness.api.mock_rate_limited("GET", "/channels/10", 0.2, 1).await;
    harness
        .api
        .mock_json("GET", "/channels/10", 200, fixtures::text_channel(10, 1, "general"))
        .await;

    let started = Instant::now();
    let channel = harness
        .client
        .channels()
        .fetch_channel(Snowflake::new(10))
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_millis(190));
    assert_eq!(channel.read().display_name(), "general");
    assert_eq!(harness.api.requests_to("/channels/10").await.len(), 2);
}

#[tokio::test]
async fn test_rate_limit_retries_are_bounded() {
    let harness = TestClient::start(1).await.unwrap();
    harness.api.mock_rate_limited("GET", "/channels/10", 0.01, 10).await;

    let err = harness
        .client
        .channels()
        .fetch_channel(Snowflake::new(10))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FaultKind::RateLimit);
    match err {
        ClientError::Rest(RestError::RateLimited {
            attempts, global, ..
        }) => {
            assert_eq!(attempts, 3);
            assert!(!global);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_forbidden_is_not_retried() {
    let harness = TestClient::start(1).await.unwrap();
    harness
        .api
        .mock_json(
            "GET",
            "/channels/10",
            403,
            json!({"code": 50001, "message": "Missing Access"}),
        )
        .await;

    let err = harness
        .client
        .channels()
        .fetch_channel(Snowflake::new(10))
        .await
        .unwrap_err();

    assert!(!err.is_retryable());
    match err {
        ClientError::Rest(RestError::Permanent {
            status,
            body,
            attempts,
            ..
        }) => {
            assert_eq!(status, 403);
            assert_eq!(body.code, Some(50001));
            assert_eq!(attempts, 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(harness.api.requests().await.len(), 1);
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let harness = TestClient::start(1).await.unwrap();
    harness.api.mock_failures("GET", "/channels/10", 502, 2).await;
    harness
        .api
        .mock_json("GET", "/channels/10", 200, fixtures::text_channel(10, 1, "general"))
        .await;

    harness
        .client
        .channels()
        .fetch_channel(Snowflake::new(10))
        .await
        .unwrap();

    assert_eq!(harness.api.requests_to("/channels/10").await.len(), 3);
}

#[tokio::test]
async fn test_server_error_retries_are_bounded() {
    let harness = TestClient::start(1).await.unwrap();
    harness.api.mock_failures("GET", "/channels/10", 500, 10).await;

    let err = harness
        .client
        .channels()
        .fetch_channel(Snowflake::new(10))
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert!(matches!(
        err,
        ClientError::Rest(RestError::Server {
            status: 500,
            attempts: 3,
            ..
        })
    ));
}

#[tokio::test]
async fn test_exhausted_bucket_delays_same_route() {
    let harness = TestClient::start(1).await.unwrap();
    for channel_id in [10, 11] {
        Mock::given(method("GET"))
            .and(path(format!("{API_PREFIX}/channels/{channel_id}")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(fixtures::text_channel(channel_id, 1, "general"))
                    .append_header("x-ratelimit-limit", "1")
                    .append_header("x-ratelimit-remaining", "0")
                    .append_header("x-ratelimit-reset-after", "0.2")
                    .append_header("x-ratelimit-bucket", "abcd"),
            )
            .mount(harness.api.server())
            .await;
    }

    let channels = harness.client.channels();
    channels.fetch_channel(Snowflake::new(10)).await.unwrap();

    // Different channel, same route template, same bucket
    let started = Instant::now();
    channels.fetch_channel(Snowflake::new(11)).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(190));

    assert_eq!(harness.client.rest().limiter().bucket_count(), 1);
}

// ============================================================================
// Client user
// ============================================================================

#[tokio::test]
async fn test_set_username_updates_cache() {
    let harness = TestClient::start(1).await.unwrap();
    let mut renamed = fixtures::bot_user();
    renamed["username"] = json!("renamed");
    harness.api.mock_json("PATCH", "/users/@me", 200, renamed).await;

    let user = harness.client.user().set_username("  renamed ").await.unwrap();

    assert_eq!(user.read().username, "renamed");
    let cached = harness
        .client
        .cache()
        .users
        .get(Snowflake::new(fixtures::BOT_USER_ID))
        .unwrap();
    assert!(std::sync::Arc::ptr_eq(&cached, &user));

    let body = harness.api.last_body("/users/@me").await.unwrap();
    assert_eq!(body, json!({"username": "renamed"}));

    let err = harness.client.user().set_username("   ").await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidArgument(_)));
    assert_eq!(harness.api.requests_to("/users/@me").await.len(), 1);
}

#[tokio::test]
async fn test_set_avatar_sends_data_uri() {
    let harness = TestClient::start(1).await.unwrap();
    harness
        .api
        .mock_json("PATCH", "/users/@me", 200, fixtures::bot_user())
        .await;

    harness.client.user().set_avatar(Some(PNG_BYTES)).await.unwrap();
    let body = harness.api.last_body("/users/@me").await.unwrap();
    assert_eq!(body, json!({"avatar": "data:image/png;base64,iVBORw0KGgo="}));

    harness.client.user().set_avatar(None).await.unwrap();
    let body = harness.api.last_body("/users/@me").await.unwrap();
    assert_eq!(body, json!({"avatar": null}));

    let err = harness
        .client
        .user()
        .set_avatar(Some(b"not an image"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidArgument(_)));
    assert_eq!(harness.api.requests_to("/users/@me").await.len(), 2);
}

#[tokio::test]
async fn test_create_group_dm() {
    let harness = TestClient::start(1).await.unwrap();
    let cache = harness.client.cache();
    cache
        .users
        .factory(&fixtures::user(5, "five"), &FactoryContext::default())
        .unwrap();

    harness
        .api
        .mock_json(
            "POST",
            "/users/@me/channels",
            200,
            fixtures::group_dm(
                50,
                fixtures::BOT_USER_ID,
                &[fixtures::user(5, "five"), fixtures::user(6, "six")],
            ),
        )
        .await;

    let recipients = [
        GroupDmRecipient::new(Snowflake::new(5), "token-5"),
        GroupDmRecipient::new(Snowflake::new(6), "token-6").nick("Six"),
    ];
    let channel = harness
        .client
        .user()
        .create_group_dm(&recipients)
        .await
        .unwrap();

    assert_eq!(channel.read().kind(), ChannelType::GroupDm);
    assert!(cache.channels.has(Snowflake::new(50)));

    let body = harness.api.last_body("/users/@me/channels").await.unwrap();
    assert_eq!(body["access_tokens"], json!(["token-5", "token-6"]));
    assert_eq!(body["nicks"], json!({"5": "five", "6": "Six"}));
}

#[tokio::test]
async fn test_group_dm_needs_nick_for_unknown_user() {
    let harness = TestClient::start(1).await.unwrap();

    let err = harness
        .client
        .user()
        .create_group_dm(&[GroupDmRecipient::new(Snowflake::new(404), "token")])
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::InvalidArgument(_)));
    assert!(harness.api.requests().await.is_empty());
}

// ============================================================================
// Shutdown
// ============================================================================

#[tokio::test]
async fn test_shutdown_waits_for_inflight_request() {
    let harness = TestClient::start(1).await.unwrap();
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/channels/10")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(fixtures::text_channel(10, 1, "general"))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(harness.api.server())
        .await;

    let inflight = tokio::spawn({
        let client = std::sync::Arc::clone(&harness.client);
        async move { client.channels().fetch_channel(Snowflake::new(10)).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    harness.client.shutdown().await;

    // The request started before shutdown and still completes
    assert!(inflight.await.unwrap().is_ok());
    assert!(harness.client.cache().channels.has(Snowflake::new(10)));

    let err = harness
        .client
        .channels()
        .fetch_channel(Snowflake::new(10))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FaultKind::Shutdown);
}
