//! Client - connection lifecycle and entry point to every operation

use std::sync::Arc;

use chorus_common::ClientConfig;
use chorus_core::{Cache, EntityRef, User};
use chorus_gateway::{Connector, EventStream, GatewayManager, TungsteniteConnector};
use chorus_rest::{HttpTransport, ReqwestTransport, RestDispatcher, RestError};
use tracing::info;

use crate::context::ClientContext;
use crate::error::ClientResult;
use crate::services::{ChannelService, ClientUser};

/// A connected (or connectable) platform client
///
/// REST calls work before `connect`; gateway packets need connected shards.
pub struct Client {
    ctx: ClientContext,
    rest: Arc<RestDispatcher>,
    gateway: Arc<GatewayManager>,
}

impl Client {
    /// Create a client with the reqwest and tungstenite transports
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        Self::builder(config).build()
    }

    /// Start building a client with custom transports
    #[must_use]
    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    #[must_use]
    pub fn context(&self) -> &ClientContext {
        &self.ctx
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<Cache> {
        self.ctx.cache()
    }

    #[must_use]
    pub fn rest(&self) -> &RestDispatcher {
        &self.rest
    }

    #[must_use]
    pub fn gateway(&self) -> &GatewayManager {
        &self.gateway
    }

    /// Start every configured shard and wait until all are connected
    pub async fn connect(&self) -> ClientResult<()> {
        let shard_count = self.ctx.config().gateway.shard_count;
        info!(shard_count = shard_count, "Connecting to the gateway");
        self.gateway.start(shard_count).await?;
        info!(
            user_id = ?self.cache().current_user_id(),
            "Client connected"
        );
        Ok(())
    }

    /// Subscribe to lifecycle events and dispatches from every shard
    #[must_use]
    pub fn events(&self) -> EventStream {
        self.gateway.events()
    }

    /// The logged-in user as cached from READY
    #[must_use]
    pub fn current_user(&self) -> Option<EntityRef<User>> {
        self.cache().current_user()
    }

    /// Operations on the logged-in user
    #[must_use]
    pub fn user(&self) -> ClientUser<'_> {
        ClientUser::new(self)
    }

    /// Channel operations
    #[must_use]
    pub fn channels(&self) -> ChannelService<'_> {
        ChannelService::new(self)
    }

    /// Close every shard and wait for in-flight REST requests
    pub async fn shutdown(&self) {
        info!("Shutting down client");
        self.gateway.shutdown().await;
        self.rest.drain().await;
        info!("Client shut down");
    }
}

/// Builder for [`Client`]
pub struct ClientBuilder {
    config: ClientConfig,
    http: Option<Arc<dyn HttpTransport>>,
    connector: Option<Arc<dyn Connector>>,
}

impl ClientBuilder {
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            http: None,
            connector: None,
        }
    }

    /// Use a custom HTTP transport
    #[must_use]
    pub fn http_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.http = Some(transport);
        self
    }

    /// Use a custom gateway connector
    #[must_use]
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Validate the configuration and assemble the client
    pub fn build(self) -> ClientResult<Client> {
        self.config.validate()?;

        let http: Arc<dyn HttpTransport> = match self.http {
            Some(http) => http,
            None => {
                let transport = ReqwestTransport::new(&self.config.rest, &self.config.token)
                    .map_err(|source| RestError::Transport {
                        route: "client setup".to_string(),
                        source,
                        attempts: 0,
                    })?;
                Arc::new(transport)
            }
        };
        let connector: Arc<dyn Connector> = match self.connector {
            Some(connector) => connector,
            None => Arc::new(TungsteniteConnector),
        };

        let rest = RestDispatcher::new(&self.config.rest, http)?;
        let ctx = ClientContext::new(self.config);
        let gateway = GatewayManager::new(
            ctx.config().gateway.clone(),
            ctx.config().token.clone(),
            connector,
            Arc::clone(ctx.cache()),
            Arc::clone(ctx.presence()),
        );

        Ok(Client {
            ctx,
            rest: Arc::new(rest),
            gateway: Arc::new(gateway),
        })
    }
}
