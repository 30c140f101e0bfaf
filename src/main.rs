//! Mopidy MQTT bridge
//!
//! Connects to Mopidy over HTTP JSON-RPC and to an MQTT broker, then relays
//! player state to the broker and broker commands to the player.

use std::sync::Arc;

use anyhow::Result;
use mopidy_mqtt::adapters::MopidyAdapter;
use mopidy_mqtt::{config, mqtt, Bridge};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mopidy_mqtt=info,mopidy_mqtt_wire=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Mopidy MQTT bridge v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = config::load_config()?;
    tracing::info!(
        mqtt = %format!("{}:{}", config.mqtt.host, config.mqtt.port),
        mopidy = %config.mopidy.rpc_url(),
        prefix = %config.mqtt.topic_prefix,
        "Configuration loaded"
    );

    let shutdown = CancellationToken::new();

    // Player backend
    let mopidy = Arc::new(MopidyAdapter::new(&config.mopidy));

    // Broker connection
    let (client, eventloop) = mqtt::connect(&config.mqtt)?;
    let mqtt_task = tokio::spawn(eventloop.run(shutdown.clone()));

    // Wire the bridge before polling starts so the first snapshot is published
    let bridge = Bridge::start(
        config.bridge_settings()?,
        mopidy.clone(),
        mopidy.clone(),
        Arc::new(client),
    )
    .await?;

    let poll_task = mopidy.start(shutdown.clone());

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");

    bridge.shutdown().await;
    shutdown.cancel();

    if let Err(e) = poll_task.await {
        tracing::warn!("Mopidy polling task failed: {}", e);
    }
    if let Err(e) = mqtt_task.await {
        tracing::warn!("MQTT task failed: {}", e);
    }

    tracing::info!("Mopidy MQTT bridge stopped");
    Ok(())
}
