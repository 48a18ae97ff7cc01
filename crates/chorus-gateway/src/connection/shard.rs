//! Shard task
//!
//! One task per shard owns the WebSocket, the session, and the heartbeat. Frames are
//! handled one at a time in receipt order; the application talks to the task through
//! a command channel and observes it through a `watch` of its state.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chorus_common::{config::with_gateway_query, Backoff, GatewayConfig};
use chorus_core::{Cache, ClientPresence, FactoryContext};
use parking_lot::RwLock;
use rand::Rng;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::heartbeat::{Heartbeat, HeartbeatAction};
use super::identify_queue::IdentifyQueue;
use super::session::GatewaySession;
use super::state::ShardState;
use crate::events::{cache_sync, DispatchEvent, EventHub, GatewayEvent};
use crate::protocol::{
    CloseAction, CloseCode, GatewayMessage, IdentifyPayload, IdentifyProperties, OpCode,
    PresenceUpdatePayload, ResumePayload, NORMAL_CLOSE,
};
use crate::transport::{Connector, Frame, GatewayTransport, TransportError};

/// Settings every shard of one manager shares
#[derive(Clone)]
pub struct ShardConfig {
    pub token: String,
    /// Gateway URL without query parameters
    pub url: String,
    pub version: u8,
    pub shard_count: u32,
    pub intents: u64,
    pub large_threshold: u32,
    pub max_missed_acks: u32,
    /// How long a silent session stays resumable
    pub resume_window: Duration,
    /// Delay policy between reconnect attempts
    pub reconnect: Backoff,
    pub connect_timeout: Duration,
    pub command_buffer: usize,
}

impl ShardConfig {
    #[must_use]
    pub fn new(gateway: &GatewayConfig, token: impl Into<String>, shard_count: u32) -> Self {
        Self {
            token: token.into(),
            url: gateway.url.clone(),
            version: gateway.version,
            shard_count,
            intents: gateway.intents,
            large_threshold: gateway.large_threshold,
            max_missed_acks: gateway.max_missed_acks,
            resume_window: gateway.resume_window(),
            reconnect: Backoff::new(
                Duration::from_millis(gateway.reconnect_base_delay_ms),
                Duration::from_millis(gateway.reconnect_max_delay_ms),
            ),
            connect_timeout: gateway.connect_timeout(),
            command_buffer: gateway.command_buffer.max(1),
        }
    }

    /// URL for the next connection; resumes go to the session's resume URL
    fn connect_url(&self, resume_url: Option<&str>) -> String {
        with_gateway_query(resume_url.unwrap_or(&self.url), self.version)
    }
}

impl fmt::Debug for ShardConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardConfig")
            .field("url", &self.url)
            .field("version", &self.version)
            .field("shard_count", &self.shard_count)
            .field("intents", &self.intents)
            .finish_non_exhaustive()
    }
}

/// Resources shared by every shard of one manager
pub(crate) struct ShardShared {
    pub config: ShardConfig,
    pub connector: Arc<dyn Connector>,
    pub cache: Arc<Cache>,
    pub presence: Arc<RwLock<ClientPresence>>,
    pub identify_queue: IdentifyQueue,
    pub events: EventHub,
}

/// Requests from the manager to a shard task
#[derive(Debug)]
pub(crate) enum ShardCommand {
    /// Send a packet once the shard is connected
    Send(GatewayMessage),
    /// Close with code 1000 and stop
    Shutdown,
}

/// Manager-side handle of a running shard
#[derive(Debug)]
pub(crate) struct ShardHandle {
    pub commands: mpsc::Sender<ShardCommand>,
    pub state: watch::Receiver<ShardState>,
    pub task: JoinHandle<()>,
}

/// Why a connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionEnd {
    Reconnect { code: Option<u16> },
    Fatal(u16),
    Shutdown,
}

enum Flow {
    Continue,
    End(ConnectionEnd),
}

/// One open connection and its timers
struct Connection {
    transport: Box<dyn GatewayTransport>,
    heartbeat: Option<Heartbeat>,
    identify_at: Option<Instant>,
}

pub(crate) struct Shard {
    id: u32,
    shared: Arc<ShardShared>,
    session: GatewaySession,
    state: watch::Sender<ShardState>,
    commands: mpsc::Receiver<ShardCommand>,
    outbound: VecDeque<GatewayMessage>,
    reconnect_attempt: u32,
}

impl Shard {
    /// Spawn the task for shard `id`
    pub(crate) fn spawn(id: u32, shared: Arc<ShardShared>) -> ShardHandle {
        let (command_tx, command_rx) = mpsc::channel(shared.config.command_buffer);
        let (state_tx, state_rx) = watch::channel(ShardState::Disconnected);

        let shard = Self {
            id,
            session: GatewaySession::new(id, shared.config.shard_count)
                .with_resume_window(shared.config.resume_window),
            shared,
            state: state_tx,
            commands: command_rx,
            outbound: VecDeque::new(),
            reconnect_attempt: 0,
        };

        ShardHandle {
            commands: command_tx,
            state: state_rx,
            task: tokio::spawn(shard.run()),
        }
    }

    async fn run(mut self) {
        tracing::info!(shard_id = self.id, shard_count = self.shared.config.shard_count, "Shard started");

        loop {
            match self.connect_and_run().await {
                ConnectionEnd::Shutdown => {
                    self.set_state(ShardState::Closed(NORMAL_CLOSE));
                    tracing::info!(shard_id = self.id, "Shard shut down");
                    break;
                }
                ConnectionEnd::Fatal(code) => {
                    self.set_state(ShardState::Closed(code));
                    tracing::error!(
                        shard_id = self.id,
                        code = code,
                        reason = CloseCode::from_u16(code).map_or("unknown", CloseCode::description),
                        "Gateway closed the shard fatally"
                    );
                    self.emit(GatewayEvent::Fatal {
                        shard_id: self.id,
                        code,
                    });
                    break;
                }
                ConnectionEnd::Reconnect { code } => {
                    self.emit(GatewayEvent::Disconnected {
                        shard_id: self.id,
                        code,
                        resumable: self.session.can_resume(Instant::now()),
                    });
                    self.set_state(ShardState::Reconnecting);

                    let delay = self.shared.config.reconnect.delay_for_attempt(self.reconnect_attempt);
                    self.reconnect_attempt = self.reconnect_attempt.saturating_add(1);
                    tracing::warn!(
                        shard_id = self.id,
                        code = ?code,
                        attempt = self.reconnect_attempt,
                        delay_ms = delay.as_millis() as u64,
                        resume = self.session.can_resume(Instant::now()),
                        "Shard disconnected, reconnecting"
                    );

                    if !self.wait_reconnect(delay).await {
                        self.set_state(ShardState::Closed(NORMAL_CLOSE));
                        tracing::info!(shard_id = self.id, "Shard shut down while reconnecting");
                        break;
                    }
                }
            }
        }
    }

    /// Sleep before reconnecting while still accepting commands; false on shutdown
    async fn wait_reconnect(&mut self, delay: Duration) -> bool {
        let deadline = Instant::now() + delay;
        loop {
            tokio::select! {
                () = tokio::time::sleep_until(deadline) => return true,
                command = self.commands.recv() => match command {
                    Some(ShardCommand::Send(message)) => self.outbound.push_back(message),
                    Some(ShardCommand::Shutdown) | None => return false,
                },
            }
        }
    }

    async fn connect_and_run(&mut self) -> ConnectionEnd {
        let resume_url = self
            .session
            .resume_url()
            .filter(|_| self.session.can_resume(Instant::now()));
        let url = self.shared.config.connect_url(resume_url);
        self.set_state(ShardState::Connecting);

        let connect = self.shared.connector.connect(&url);
        let transport = match tokio::time::timeout(self.shared.config.connect_timeout, connect).await {
            Ok(Ok(transport)) => transport,
            Ok(Err(e)) => {
                tracing::warn!(shard_id = self.id, url = %url, error = %e, "Failed to connect");
                return ConnectionEnd::Reconnect { code: None };
            }
            Err(_) => {
                tracing::warn!(shard_id = self.id, url = %url, error = %TransportError::Timeout, "Failed to connect");
                return ConnectionEnd::Reconnect { code: None };
            }
        };
        tracing::debug!(shard_id = self.id, url = %url, "Connected, waiting for Hello");

        let mut conn = Connection {
            transport,
            heartbeat: None,
            identify_at: None,
        };

        loop {
            let heartbeat_at = conn.heartbeat.as_ref().map(Heartbeat::next_beat);
            let identify_at = conn.identify_at;

            let flow = tokio::select! {
                frame = conn.transport.recv() => self.on_frame(frame, &mut conn).await,
                () = sleep_until_opt(heartbeat_at) => self.on_heartbeat_timer(&mut conn).await,
                () = sleep_until_opt(identify_at) => {
                    conn.identify_at = None;
                    self.identify(&mut conn).await
                }
                command = self.commands.recv() => self.on_command(command, &mut conn).await,
            };

            if let Flow::End(end) = flow {
                return end;
            }
        }
    }

    async fn on_frame(
        &mut self,
        frame: Option<Result<Frame, TransportError>>,
        conn: &mut Connection,
    ) -> Flow {
        match frame {
            None => {
                tracing::info!(shard_id = self.id, "Connection dropped");
                Flow::End(ConnectionEnd::Reconnect { code: None })
            }
            Some(Err(e)) => {
                tracing::warn!(shard_id = self.id, error = %e, "Transport error");
                Flow::End(ConnectionEnd::Reconnect { code: None })
            }
            Some(Ok(Frame::Close { code, reason })) => {
                tracing::info!(shard_id = self.id, code = code, reason = %reason, "Gateway closed the connection");
                match CloseAction::for_code(code) {
                    CloseAction::Fatal => Flow::End(ConnectionEnd::Fatal(code)),
                    CloseAction::Reidentify => {
                        self.session.invalidate();
                        Flow::End(ConnectionEnd::Reconnect { code: Some(code) })
                    }
                    CloseAction::Resume => Flow::End(ConnectionEnd::Reconnect { code: Some(code) }),
                }
            }
            Some(Ok(Frame::Text(text))) => match GatewayMessage::from_json(&text) {
                Ok(message) => self.on_message(message, conn).await,
                Err(e) => {
                    tracing::warn!(shard_id = self.id, error = %e, "Dropping undecodable frame");
                    Flow::Continue
                }
            },
        }
    }

    async fn on_message(&mut self, message: GatewayMessage, conn: &mut Connection) -> Flow {
        tracing::trace!(shard_id = self.id, message = %message, "Frame received");

        match message.op {
            OpCode::Hello => {
                let Some(hello) = message.as_hello() else {
                    tracing::warn!(shard_id = self.id, "Hello without heartbeat interval");
                    return Flow::Continue;
                };
                let interval = Duration::from_millis(hello.heartbeat_interval);
                conn.heartbeat = Some(Heartbeat::start_jittered(
                    interval,
                    self.shared.config.max_missed_acks,
                    Instant::now(),
                ));
                tracing::debug!(shard_id = self.id, interval_ms = hello.heartbeat_interval, "Hello received");

                if self.session.can_resume(Instant::now()) {
                    self.resume(conn).await
                } else {
                    if self.session.has_session() {
                        tracing::info!(shard_id = self.id, "Session silent for too long, identifying");
                        self.session.invalidate();
                    }
                    self.set_state(ShardState::Identifying);
                    conn.identify_at = Some(self.shared.identify_queue.reserve());
                    Flow::Continue
                }
            }
            OpCode::HeartbeatAck => {
                self.session.alive(Instant::now());
                if let Some(heartbeat) = conn.heartbeat.as_mut() {
                    heartbeat.acked(Instant::now());
                    tracing::trace!(
                        shard_id = self.id,
                        latency_ms = heartbeat.latency().map(|l| l.as_millis() as u64),
                        "Heartbeat acknowledged"
                    );
                }
                Flow::Continue
            }
            // The server wants a beat right away
            OpCode::Heartbeat => self.send_heartbeat(conn).await,
            OpCode::Reconnect => {
                tracing::info!(shard_id = self.id, "Gateway requested a reconnect");
                self.close(conn, CloseCode::UnknownError.as_u16(), "reconnect requested").await;
                Flow::End(ConnectionEnd::Reconnect { code: None })
            }
            OpCode::InvalidSession => {
                if message.as_invalid_session().unwrap_or(false) {
                    tracing::info!(shard_id = self.id, "Session invalidated, resuming on a new connection");
                    self.close(conn, CloseCode::UnknownError.as_u16(), "invalid session").await;
                    return Flow::End(ConnectionEnd::Reconnect { code: None });
                }

                self.session.invalidate();
                self.set_state(ShardState::Identifying);
                let delay = Duration::from_millis(rand::thread_rng().gen_range(1_000..=5_000));
                conn.identify_at = Some(self.shared.identify_queue.reserve_after(Instant::now() + delay));
                tracing::info!(
                    shard_id = self.id,
                    delay_ms = delay.as_millis() as u64,
                    "Session invalidated, identifying again"
                );
                Flow::Continue
            }
            OpCode::Dispatch => self.on_dispatch(message, conn).await,
            other if other.is_server_op() => {
                tracing::debug!(shard_id = self.id, op = %other, "Ignoring unexpected op");
                Flow::Continue
            }
            other => {
                tracing::warn!(shard_id = self.id, op = %other, "Gateway sent a client-only op");
                Flow::Continue
            }
        }
    }

    async fn on_dispatch(&mut self, message: GatewayMessage, conn: &mut Connection) -> Flow {
        if let Some(sequence) = message.s {
            if !self.session.observe(sequence) {
                tracing::debug!(
                    shard_id = self.id,
                    sequence = sequence,
                    current = ?self.session.sequence(),
                    "Dropping stale dispatch"
                );
                return Flow::Continue;
            }
        }

        let ready = message.as_ready();
        let GatewayMessage { s: sequence, t, d: data, .. } = message;
        let Some(name) = t else {
            tracing::warn!(shard_id = self.id, "Dispatch without event name");
            return Flow::Continue;
        };

        let ctx = FactoryContext::for_shard(self.id);
        if let Err(e) = cache_sync::apply(&self.shared.cache, &name, &data, &ctx) {
            tracing::warn!(shard_id = self.id, event = %name, error = %e, "Failed to apply event to cache");
        }

        match name.as_str() {
            "READY" => {
                let Some(ready) = ready else {
                    tracing::warn!(shard_id = self.id, "READY without session id");
                    return Flow::Continue;
                };
                self.session
                    .start(ready.session_id.clone(), ready.resume_gateway_url, Instant::now());
                self.reconnect_attempt = 0;
                self.set_state(ShardState::Connected);
                tracing::info!(shard_id = self.id, session_id = %ready.session_id, "Shard ready");

                self.emit(GatewayEvent::Ready {
                    shard_id: self.id,
                    session_id: ready.session_id,
                    user_id: self.shared.cache.current_user_id(),
                });
                self.flush(conn).await
            }
            "RESUMED" => {
                self.session.alive(Instant::now());
                self.reconnect_attempt = 0;
                self.set_state(ShardState::Connected);
                tracing::info!(shard_id = self.id, sequence = ?self.session.sequence(), "Shard resumed");

                self.emit(GatewayEvent::Resumed { shard_id: self.id });
                self.flush(conn).await
            }
            _ => {
                self.emit(GatewayEvent::Dispatch(DispatchEvent {
                    shard_id: self.id,
                    sequence,
                    name,
                    data,
                }));
                Flow::Continue
            }
        }
    }

    async fn on_heartbeat_timer(&mut self, conn: &mut Connection) -> Flow {
        let Some(heartbeat) = conn.heartbeat.as_mut() else {
            return Flow::Continue;
        };

        match heartbeat.tick(Instant::now()) {
            HeartbeatAction::Beat => self.send_heartbeat(conn).await,
            HeartbeatAction::BeatAfterMiss => {
                tracing::debug!(
                    shard_id = self.id,
                    missed_acks = heartbeat.missed_acks(),
                    "Heartbeat not acknowledged, beating again"
                );
                self.send_heartbeat(conn).await
            }
            HeartbeatAction::Zombie => {
                tracing::warn!(
                    shard_id = self.id,
                    missed_acks = heartbeat.missed_acks(),
                    "Connection is a zombie, reconnecting"
                );
                let code = CloseCode::UnknownError.as_u16();
                self.close(conn, code, "heartbeat timeout").await;
                Flow::End(ConnectionEnd::Reconnect { code: Some(code) })
            }
        }
    }

    async fn on_command(&mut self, command: Option<ShardCommand>, conn: &mut Connection) -> Flow {
        match command {
            Some(ShardCommand::Send(message)) => {
                self.outbound.push_back(message);
                if self.state.borrow().is_connected() {
                    self.flush(conn).await
                } else {
                    tracing::debug!(
                        shard_id = self.id,
                        queued = self.outbound.len(),
                        "Queued packet until connected"
                    );
                    Flow::Continue
                }
            }
            Some(ShardCommand::Shutdown) | None => {
                self.close(conn, NORMAL_CLOSE, "shutdown").await;
                Flow::End(ConnectionEnd::Shutdown)
            }
        }
    }

    async fn identify(&mut self, conn: &mut Connection) -> Flow {
        let presence = PresenceUpdatePayload::from(&*self.shared.presence.read());
        let payload = IdentifyPayload {
            token: self.shared.config.token.clone(),
            properties: IdentifyProperties::new(),
            shard: self.session.shard(),
            intents: self.shared.config.intents,
            large_threshold: self.shared.config.large_threshold,
            presence: Some(presence),
        };

        tracing::info!(shard_id = self.id, "Identifying");
        self.send(conn, &GatewayMessage::identify(&payload)).await
    }

    async fn resume(&mut self, conn: &mut Connection) -> Flow {
        self.set_state(ShardState::Resuming);
        let payload = ResumePayload {
            token: self.shared.config.token.clone(),
            session_id: self.session.session_id().unwrap_or_default().to_string(),
            seq: self.session.sequence(),
        };

        tracing::info!(
            shard_id = self.id,
            session_id = %payload.session_id,
            sequence = ?payload.seq,
            "Resuming session"
        );
        self.send(conn, &GatewayMessage::resume(&payload)).await
    }

    async fn send_heartbeat(&mut self, conn: &mut Connection) -> Flow {
        let flow = self
            .send(conn, &GatewayMessage::heartbeat(self.session.sequence()))
            .await;
        if let Some(heartbeat) = conn.heartbeat.as_mut() {
            heartbeat.sent(Instant::now());
        }
        flow
    }

    /// Send queued packets in order
    async fn flush(&mut self, conn: &mut Connection) -> Flow {
        while let Some(message) = self.outbound.pop_front() {
            if let Flow::End(end) = self.send(conn, &message).await {
                self.outbound.push_front(message);
                return Flow::End(end);
            }
        }
        Flow::Continue
    }

    async fn send(&self, conn: &mut Connection, message: &GatewayMessage) -> Flow {
        let json = match message.to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(shard_id = self.id, op = %message.op, error = %e, "Failed to encode packet");
                return Flow::Continue;
            }
        };

        match conn.transport.send(Frame::Text(json)).await {
            Ok(()) => {
                tracing::trace!(shard_id = self.id, op = %message.op, "Frame sent");
                Flow::Continue
            }
            Err(e) => {
                tracing::warn!(shard_id = self.id, op = %message.op, error = %e, "Failed to send frame");
                Flow::End(ConnectionEnd::Reconnect { code: None })
            }
        }
    }

    async fn close(&self, conn: &mut Connection, code: u16, reason: &str) {
        if let Err(e) = conn.transport.send(Frame::close(code, reason)).await {
            tracing::debug!(shard_id = self.id, error = %e, "Failed to send close frame");
        }
    }

    fn set_state(&self, state: ShardState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::debug!(shard_id = self.id, from = %previous, to = %state, "Shard state changed");
        }
    }

    fn emit(&self, event: GatewayEvent) {
        self.shared.events.emit(event);
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
