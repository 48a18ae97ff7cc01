//! Test helpers for integration tests
//!
//! A wiremock stand-in for the REST API, an in-memory gateway, and a client wired to both.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context as _, Result};
use chorus_client::{Client, ClientConfig};
use chorus_gateway::{memory_gateway, GatewayMessage, MemoryPeer, MemoryServer, OpCode};
use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use crate::fixtures;

/// API prefix the mock server answers under
pub const API_PREFIX: &str = "/api/v10";

/// How long a helper waits for the client before failing the test
const STEP_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Mock REST API
// ============================================================================

/// Mock platform REST API
pub struct MockApi {
    server: MockServer,
}

impl MockApi {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL to configure the client with
    pub fn url(&self) -> String {
        format!("{}{API_PREFIX}", self.server.uri())
    }

    pub fn server(&self) -> &MockServer {
        &self.server
    }

    /// Answer `verb route` with `status` and a JSON body
    pub async fn mock_json(&self, verb: &str, route: &str, status: u16, body: Value) {
        Mock::given(method(verb))
            .and(path(format!("{API_PREFIX}{route}")))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Answer `verb route` with 204 No Content
    pub async fn mock_no_content(&self, verb: &str, route: &str) {
        Mock::given(method(verb))
            .and(path(format!("{API_PREFIX}{route}")))
            .respond_with(ResponseTemplate::new(204))
            .mount(&self.server)
            .await;
    }

    /// Answer the first `times` requests with a route-scoped 429
    pub async fn mock_rate_limited(&self, verb: &str, route: &str, retry_after_secs: f64, times: u64) {
        Mock::given(method(verb))
            .and(path(format!("{API_PREFIX}{route}")))
            .respond_with(
                ResponseTemplate::new(429)
                    .append_header("retry-after", retry_after_secs.to_string().as_str())
                    .append_header("x-ratelimit-scope", "user")
                    .set_body_json(serde_json::json!({
                        "message": "You are being rate limited.",
                        "retry_after": retry_after_secs,
                        "global": false
                    })),
            )
            .up_to_n_times(times)
            .mount(&self.server)
            .await;
    }

    /// Answer the first `times` requests with `status` and no body
    pub async fn mock_failures(&self, verb: &str, route: &str, status: u16, times: u64) {
        Mock::given(method(verb))
            .and(path(format!("{API_PREFIX}{route}")))
            .respond_with(ResponseTemplate::new(status))
            .up_to_n_times(times)
            .mount(&self.server)
            .await;
    }

    /// Every request received so far
    pub async fn requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    /// Requests received for `route`
    pub async fn requests_to(&self, route: &str) -> Vec<Request> {
        let full = format!("{API_PREFIX}{route}");
        self.requests()
            .await
            .into_iter()
            .filter(|request| request.url.path() == full)
            .collect()
    }

    /// JSON body of the last request to `route`
    pub async fn last_body(&self, route: &str) -> Result<Value> {
        let request = self
            .requests_to(route)
            .await
            .pop()
            .ok_or_else(|| anyhow!("no request to {route}"))?;
        request
            .body_json::<Value>()
            .context("request body is not JSON")
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Client configuration tuned for fast tests
pub fn test_config(api_url: &str, shard_count: u32) -> ClientConfig {
    let mut config = ClientConfig::new("test-token");
    config.rest.api_url = api_url.to_string();
    config.rest.request_timeout_secs = 5;
    config.rest.max_rate_limit_retries = 2;
    config.rest.max_server_retries = 2;
    config.rest.retry_base_delay_ms = 10;
    config.rest.retry_max_delay_ms = 50;
    config.gateway.url = "memory://gateway".to_string();
    config.gateway.shard_count = shard_count;
    config.gateway.identify_interval_ms = 10;
    config.gateway.reconnect_base_delay_ms = 10;
    config.gateway.reconnect_max_delay_ms = 50;
    config
}

// ============================================================================
// Gateway peer
// ============================================================================

/// Server side of one shard's connection
pub struct ShardPeer {
    pub shard_id: u32,
    peer: MemoryPeer,
    sequence: u64,
}

impl ShardPeer {
    /// Greet the client, wait for its Identify, and answer READY
    pub async fn handshake(peer: MemoryPeer, session_id: &str) -> Result<Self> {
        let mut shard = Self {
            shard_id: 0,
            peer,
            sequence: 0,
        };
        shard.hello();

        let identify = shard
            .expect_op(OpCode::Identify)
            .await?
            .as_identify()
            .context("malformed identify")?;
        shard.shard_id = identify.shard[0];

        shard.dispatch("READY", fixtures::ready(session_id, identify.shard));
        Ok(shard)
    }

    /// URL the shard connected to
    pub fn url(&self) -> &str {
        self.peer.url()
    }

    /// Take over the shard's next connection, keeping the sequence count
    pub fn reattach(&mut self, peer: MemoryPeer) {
        self.peer = peer;
    }

    pub fn hello(&self) -> bool {
        self.peer.send(&GatewayMessage::hello(45_000))
    }

    /// Close the connection with `code`
    pub fn close(&self, code: u16) -> bool {
        self.peer.close(code)
    }

    /// Send a dispatch with the next sequence number
    pub fn dispatch(&mut self, name: &str, data: Value) -> bool {
        self.sequence += 1;
        self.peer
            .send(&GatewayMessage::dispatch(name, self.sequence, data))
    }

    /// Next message with `op`, acknowledging heartbeats on the way
    pub async fn expect_op(&mut self, op: OpCode) -> Result<GatewayMessage> {
        tokio::time::timeout(STEP_TIMEOUT, async {
            loop {
                let message = self
                    .peer
                    .recv_message()
                    .await
                    .ok_or_else(|| anyhow!("connection closed while waiting for {op:?}"))?;
                if message.op == op {
                    return Ok(message);
                }
                if message.op == OpCode::Heartbeat {
                    self.peer.send(&GatewayMessage::heartbeat_ack());
                }
            }
        })
        .await
        .map_err(|_| anyhow!("timed out waiting for {op:?}"))?
    }

    /// Wait until the client closes the connection; returns the close code
    pub async fn expect_close(&mut self) -> Result<Option<u16>> {
        tokio::time::timeout(STEP_TIMEOUT, async {
            while let Some(frame) = self.peer.recv().await {
                if let chorus_gateway::Frame::Close { code, .. } = frame {
                    return Some(code);
                }
            }
            None
        })
        .await
        .map_err(|_| anyhow!("timed out waiting for close"))
    }
}

// ============================================================================
// Test client
// ============================================================================

/// A client wired to a mock API and an in-memory gateway
pub struct TestClient {
    pub client: Arc<Client>,
    pub api: MockApi,
    gateway: MemoryServer,
}

impl TestClient {
    /// Build a client with `shard_count` shards; nothing connects yet
    pub async fn start(shard_count: u32) -> Result<Self> {
        let api = MockApi::start().await;
        let (connector, gateway) = memory_gateway();
        let client = Client::builder(test_config(&api.url(), shard_count))
            .connector(Arc::new(connector))
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            api,
            gateway,
        })
    }

    /// Next connection a shard opens
    pub async fn accept(&mut self) -> Result<MemoryPeer> {
        tokio::time::timeout(STEP_TIMEOUT, self.gateway.accept())
            .await
            .context("timed out waiting for a shard to connect")?
            .ok_or_else(|| anyhow!("gateway connector dropped"))
    }

    /// Connect every shard, returning their server sides sorted by shard id
    pub async fn connect(&mut self) -> Result<Vec<ShardPeer>> {
        let connecting = tokio::spawn({
            let client = Arc::clone(&self.client);
            async move { client.connect().await }
        });

        let shard_count = self.client.context().config().gateway.shard_count;
        let mut shards = Vec::with_capacity(shard_count as usize);
        for i in 0..shard_count {
            let peer = self.accept().await?;
            shards.push(ShardPeer::handshake(peer, &format!("session-{i}")).await?);
        }

        tokio::time::timeout(STEP_TIMEOUT, connecting)
            .await
            .context("timed out waiting for connect")??
            .context("connect failed")?;

        shards.sort_by_key(|shard| shard.shard_id);
        if shards.iter().map(|shard| shard.shard_id).ne(0..shard_count) {
            bail!("shards identified with unexpected ids");
        }
        Ok(shards)
    }
}

/// Poll `check` until it holds or the step timeout passes
pub async fn wait_until(mut check: impl FnMut() -> bool) -> Result<()> {
    tokio::time::timeout(STEP_TIMEOUT, async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .map_err(|_| anyhow!("condition not met in time"))
}
