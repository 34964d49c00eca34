//! # lightcontrold: lightcontrol daemon
//!
//! Composition root that wires the state store, the light driver and the
//! services together, then runs them until interrupted.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialize tracing
//! - Open the `SQLite` state store and run migrations
//! - Pick the light driver (virtual or MQTT)
//! - Construct the four services, each with its own config
//! - Drive the service loops and the MQTT bridge
//! - Handle graceful shutdown (SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer: no domain logic belongs here.

mod config;

use std::sync::Arc;

use lightcontrol_adapter_mqtt::{MqttBridge, MqttLightDriver, Topics};
use lightcontrol_adapter_storage_sqlite_sqlx as storage;
use lightcontrol_adapter_storage_sqlite_sqlx::SqliteStateStore;
use lightcontrol_adapter_virtual::VirtualLightDriver;
use lightcontrol_app::ports::{LightDriver, SystemClock};
use lightcontrol_app::services::{CommandProcessor, ProgramScheduler, TimerManager, TriggerRouter};
use rumqttc::EventLoop;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, DriverKind};

type Store = Arc<SqliteStateStore>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(config.log_filter())?)
        .init();

    let database = storage::Config::new(config.store_url()).build().await?;
    let store: Store = Arc::new(SqliteStateStore::from_database(&database));

    let bridge = if config.mqtt.enabled {
        let (client, eventloop) = lightcontrol_adapter_mqtt::connect(&config.mqtt);
        tracing::info!(
            host = %config.mqtt.broker_host,
            port = config.mqtt.broker_port,
            "mqtt enabled"
        );
        Some((client, eventloop))
    } else {
        None
    };

    match (config.driver.kind, bridge) {
        (DriverKind::Mqtt, Some((client, eventloop))) => {
            let topics = Topics::new(&config.mqtt.base_topic);
            let driver = MqttLightDriver::new(client.clone(), topics.clone());
            let bridge = MqttBridge::new(client, topics, Arc::clone(&store));
            serve(&config, store, driver, Some((bridge, eventloop))).await
        }
        (DriverKind::Virtual, bridge) => {
            let driver = VirtualLightDriver::new(config.groups.count);
            let bridge = bridge.map(|(client, eventloop)| {
                let topics = Topics::new(&config.mqtt.base_topic);
                (MqttBridge::new(client, topics, Arc::clone(&store)), eventloop)
            });
            serve(&config, store, driver, bridge).await
        }
        (DriverKind::Mqtt, None) => {
            anyhow::bail!("the mqtt driver requires mqtt.enabled = true")
        }
    }
}

/// Run every service loop until one of them stops or Ctrl-C is received.
async fn serve<D: LightDriver>(
    config: &Config,
    store: Store,
    driver: D,
    bridge: Option<(MqttBridge<Store>, EventLoop)>,
) -> anyhow::Result<()> {
    let processor = CommandProcessor::new(
        Arc::clone(&store),
        driver,
        SystemClock,
        config.command_processor()?,
    );
    let scheduler = ProgramScheduler::new(Arc::clone(&store), SystemClock, config.scheduler());
    let timers = TimerManager::new(Arc::clone(&store), config.timers());
    let router = TriggerRouter::new(Arc::clone(&store), config.trigger_router()?);

    processor.initialize().await?;

    let mqtt = async move {
        match bridge {
            Some((bridge, eventloop)) => {
                let outbound = async {
                    if let Err(err) = bridge.run_outbound().await {
                        tracing::error!(%err, "state mirroring stopped");
                    }
                };
                tokio::join!(bridge.run_inbound(eventloop), outbound);
            }
            None => std::future::pending::<()>().await,
        }
    };

    tracing::info!(
        groups = config.groups.count,
        driver = ?config.driver.kind,
        "lightcontrold running"
    );

    tokio::select! {
        result = processor.run() => result?,
        () = scheduler.run() => {}
        result = timers.run() => result?,
        result = router.run() => result?,
        () = mqtt => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("shutdown requested");
        }
    }

    Ok(())
}
