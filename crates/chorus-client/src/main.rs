//! Demo client entry point
//!
//! Run with:
//! ```bash
//! CHORUS_TOKEN=... cargo run -p chorus-client
//! ```
//!
//! Connects every configured shard, answers `!ping` with `pong`, and shuts down on Ctrl-C.

use anyhow::Context as _;
use chorus_client::{Client, ClientConfig, CreateMessage, DispatchEvent, GatewayEvent};
use chorus_common::{try_init_tracing_with_config, TracingConfig};
use chorus_core::{Snowflake, Status};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Initialize tracing
    if let Err(e) = try_init_tracing_with_config(&TracingConfig::from_env()) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run().await {
        error!(error = %format!("{e:#}"), "Client failed");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = ClientConfig::from_env().context("Failed to load configuration")?;
    info!(
        shard_count = config.gateway.shard_count,
        intents = config.gateway.intents,
        "Configuration loaded"
    );

    let client = Client::new(config).context("Failed to build client")?;
    let mut events = client.events();
    client.connect().await.context("Failed to connect")?;
    client.user().set_status(Status::Online, None).await?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Some(GatewayEvent::Dispatch(dispatch)) => on_dispatch(&client, &dispatch).await,
                Some(GatewayEvent::Fatal { shard_id, code }) => {
                    error!(shard_id = shard_id, code = code, "Shard stopped");
                }
                Some(other) => info!(event = ?other, "Gateway event"),
                None => break,
            },
        }
    }

    client.shutdown().await;
    Ok(())
}

async fn on_dispatch(client: &Client, dispatch: &DispatchEvent) {
    if dispatch.name != "MESSAGE_CREATE" || dispatch.data["content"] != "!ping" {
        return;
    }
    let Some(channel_id) = dispatch.data["channel_id"]
        .as_str()
        .and_then(|id| id.parse::<Snowflake>().ok())
    else {
        return;
    };

    if let Err(e) = client
        .channels()
        .send_message(channel_id, CreateMessage::text("pong"))
        .await
    {
        warn!(channel_id = %channel_id, error = %e, "Failed to answer ping");
    }
}
