//! Gateway integration tests
//!
//! Shards run against the in-memory gateway; REST calls go to a wiremock server.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::sync::Arc;

use chorus_client::{ClientError, GatewayEvent};
use chorus_core::{ActivityType, Snowflake, Status};
use chorus_gateway::{GatewayError, OpCode, RequestGuildMembersPayload, ShardState};
use integration_tests::{fixtures, wait_until, TestClient};
use serde_json::json;

// ============================================================================
// Connection lifecycle
// ============================================================================

#[tokio::test]
async fn test_connect_caches_current_user() {
    let mut harness = TestClient::start(1).await.unwrap();
    let mut events = harness.client.events();

    let shards = harness.connect().await.unwrap();
    assert_eq!(shards.len(), 1);
    assert!(shards[0].url().starts_with("memory://gateway"));

    let user = harness.client.current_user().unwrap();
    assert_eq!(user.read().id, Snowflake::new(fixtures::BOT_USER_ID));
    assert!(user.read().bot);
    assert_eq!(
        harness.client.gateway().shard_state(0),
        Some(ShardState::Connected)
    );

    loop {
        if let GatewayEvent::Ready {
            shard_id,
            session_id,
            user_id,
        } = events.recv().await.unwrap()
        {
            assert_eq!(shard_id, 0);
            assert_eq!(session_id, "session-0");
            assert_eq!(user_id, Some(Snowflake::new(fixtures::BOT_USER_ID)));
            break;
        }
    }

    harness.client.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_closes_every_shard() {
    let mut harness = TestClient::start(2).await.unwrap();
    let mut shards = harness.connect().await.unwrap();
    let mut events = harness.client.events();

    harness.client.shutdown().await;

    for shard in &mut shards {
        assert_eq!(shard.expect_close().await.unwrap(), Some(1000));
    }
    assert_eq!(harness.client.gateway().shard_state(0), None);
    assert!(harness.client.rest().is_closed());

    // The stream drains whatever shutdown emitted, then ends
    while events.recv().await.is_some() {}
}

#[tokio::test]
async fn test_dropped_session_resumes() {
    let mut harness = TestClient::start(1).await.unwrap();
    let mut shards = harness.connect().await.unwrap();
    let shard = &mut shards[0];

    shard.dispatch(
        "GUILD_CREATE",
        fixtures::guild_create(1, "Guild", &[fixtures::text_channel(10, 1, "general")]),
    );
    let cache = Arc::clone(harness.client.cache());
    wait_until(|| cache.guilds.has(Snowflake::new(1))).await.unwrap();

    let mut events = harness.client.events();
    shard.close(4000);

    let peer = harness.accept().await.unwrap();
    assert!(peer.url().starts_with("memory://resume"));
    shard.reattach(peer);
    shard.hello();

    let resume = shard
        .expect_op(OpCode::Resume)
        .await
        .unwrap()
        .as_resume()
        .unwrap();
    assert_eq!(resume.session_id, "session-0");
    assert_eq!(resume.seq, Some(2));

    shard.dispatch("RESUMED", json!({}));
    loop {
        match events.recv().await.unwrap() {
            GatewayEvent::Resumed { shard_id } => {
                assert_eq!(shard_id, 0);
                break;
            }
            GatewayEvent::Disconnected { resumable, .. } => assert!(resumable),
            _ => {}
        }
    }

    // The cache survives a resume
    assert!(cache.channels.has(Snowflake::new(10)));
    harness.client.shutdown().await;
}

// ============================================================================
// Cache convergence
// ============================================================================

#[tokio::test]
async fn test_gateway_and_rest_share_instances() {
    let mut harness = TestClient::start(1).await.unwrap();
    let mut shards = harness.connect().await.unwrap();
    let cache = Arc::clone(harness.client.cache());

    shards[0].dispatch(
        "GUILD_CREATE",
        fixtures::guild_create(1, "Guild", &[fixtures::text_channel(10, 1, "general")]),
    );
    wait_until(|| cache.channels.has(Snowflake::new(10))).await.unwrap();
    let from_gateway = cache.channels.get(Snowflake::new(10)).unwrap();

    let mut renamed = fixtures::text_channel(10, 1, "renamed");
    renamed["topic"] = json!("news");
    harness.api.mock_json("GET", "/channels/10", 200, renamed).await;

    let from_rest = harness
        .client
        .channels()
        .fetch_channel(Snowflake::new(10))
        .await
        .unwrap();

    assert!(Arc::ptr_eq(&from_gateway, &from_rest));
    assert_eq!(from_gateway.read().display_name(), "renamed");
    assert_eq!(from_gateway.read().guild_id(), Some(Snowflake::new(1)));

    // A REST-sent message and its gateway echo land on one instance
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
    let sent = harness
        .client
        .channels()
        .send_message(Snowflake::new(10), chorus_client::CreateMessage::text("hello"))
        .await
        .unwrap();

    let mut events = harness.client.events();
    shards[0].dispatch("MESSAGE_CREATE", fixtures::message(300, 10, &author, "hello"));
    loop {
        if let GatewayEvent::Dispatch(dispatch) = events.recv().await.unwrap() {
            if dispatch.name == "MESSAGE_CREATE" {
                break;
            }
        }
    }

    let cached = cache.messages.get(Snowflake::new(300)).unwrap();
    assert!(Arc::ptr_eq(&cached, &sent));
    assert_eq!(cache.messages.len(), 1);
    assert_eq!(
        from_gateway.read().as_text().and_then(|t| t.last_message_id()),
        Some(Snowflake::new(300))
    );

    harness.client.shutdown().await;
}

#[tokio::test]
async fn test_dispatch_is_cached_before_subscribers_see_it() {
    let mut harness = TestClient::start(1).await.unwrap();
    let mut shards = harness.connect().await.unwrap();
    let mut events = harness.client.events();

    let author = fixtures::user(5, "alice");
    shards[0].dispatch("MESSAGE_CREATE", fixtures::message(400, 10, &author, "hi"));

    let dispatch = loop {
        if let GatewayEvent::Dispatch(dispatch) = events.recv().await.unwrap() {
            break dispatch;
        }
    };
    assert_eq!(dispatch.name, "MESSAGE_CREATE");
    assert_eq!(dispatch.shard_id, 0);
    assert_eq!(dispatch.sequence, Some(2));

    let cache = harness.client.cache();
    assert_eq!(cache.messages.get(Snowflake::new(400)).unwrap().read().content, "hi");
    assert!(cache.users.has(Snowflake::new(5)));

    harness.client.shutdown().await;
}

// ============================================================================
// Presence and sharding
// ============================================================================

#[tokio::test]
async fn test_presence_reaches_every_shard() {
    let mut harness = TestClient::start(3).await.unwrap();
    let mut shards = harness.connect().await.unwrap();

    let presence = harness
        .client
        .user()
        .set_activity("the logs", ActivityType::Watching, None)
        .await
        .unwrap();
    assert_eq!(presence.status, Status::Online);

    for shard in &mut shards {
        let update = shard
            .expect_op(OpCode::PresenceUpdate)
            .await
            .unwrap()
            .as_presence_update()
            .unwrap();
        assert_eq!(update.status, Status::Online);
        assert_eq!(update.activities.len(), 1);
        assert_eq!(update.activities[0].name, "the logs");
    }

    // One shard only; the merged presence keeps the activity
    harness
        .client
        .user()
        .set_status(Status::Dnd, Some(1))
        .await
        .unwrap();
    let update = shards[1]
        .expect_op(OpCode::PresenceUpdate)
        .await
        .unwrap()
        .as_presence_update()
        .unwrap();
    assert_eq!(update.status, Status::Dnd);
    assert_eq!(update.activities[0].name, "the logs");
    assert_eq!(harness.client.user().presence().status, Status::Dnd);

    // The client user's cached presence follows every update
    let cached = harness
        .client
        .cache()
        .presences
        .get(Snowflake::new(fixtures::BOT_USER_ID))
        .unwrap();
    assert_eq!(cached.read().status, Status::Dnd);
    assert_eq!(cached.read().activity.as_ref().unwrap().name, "the logs");

    // An unknown shard changes nothing
    let err = harness
        .client
        .user()
        .set_status(Status::Idle, Some(3))
        .await
        .unwrap_err();
    assert!(!err.is_retryable());
    assert!(matches!(
        err,
        ClientError::Gateway(GatewayError::ShardOutOfRange { shard_id: 3, shard_count: 3 })
    ));
    assert_eq!(harness.client.user().presence().status, Status::Dnd);
    assert_eq!(cached.read().status, Status::Dnd);

    harness.client.user().clear_activity(Some(0)).await.unwrap();
    assert_eq!(cached.read().activity, None);

    harness.client.shutdown().await;
}

#[tokio::test]
async fn test_guild_requests_route_to_owning_shard() {
    let mut harness = TestClient::start(4).await.unwrap();
    let mut shards = harness.connect().await.unwrap();
    let gateway = harness.client.gateway();

    assert_eq!(gateway.shard_count(), 4);
    assert_eq!(gateway.shard_for(Snowflake::new(1000)), 0);

    let guild_id = Snowflake::new(1002);
    assert_eq!(gateway.shard_for(guild_id), 2);

    gateway
        .request_guild_members(&RequestGuildMembersPayload::all(guild_id))
        .await
        .unwrap();

    let request = shards[2]
        .expect_op(OpCode::RequestGuildMembers)
        .await
        .unwrap();
    assert_eq!(request.d["guild_id"], json!(guild_id.to_string()));

    harness.client.shutdown().await;
}
