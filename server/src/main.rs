//! CARTA object server
//!
//! Hosts the object registry for one viewer and speaks the sync protocol
//! as JSON lines on stdin/stdout. Logs go to stderr.
//!
//! Usage:
//!   carta-server --config carta.toml

use anyhow::{Context, Result};
use carta_hooks::hooks::{Initialize, InitializeParams};
use carta_hooks::{HookDispatcher, HookRequest};
use carta_object::ObjectRegistry;
use carta_state::StateSink;
use carta_sync::{EventLoop, SyncBridge};
use carta_server::config::ServerConfig;
use carta_server::connector;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{Level, debug, info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "carta-server")]
#[command(about = "CARTA object server speaking JSON lines on stdio")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "carta.toml")]
    config: PathBuf,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (config, source) = ServerConfig::load_from(&args.config);
    let log_level = if args.verbose { Level::DEBUG } else { config.level() };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
    source.log();

    info!("CARTA server starting...");
    info!(
        developer_layout = config.developer_layout,
        hacks_enabled = config.hacks_enabled,
        "Session options"
    );
    for directory in &config.plugin_directories {
        debug!("Plugin directory: {:?}", directory);
    }

    let hooks = HookDispatcher::new();
    let mut startup = HookRequest::<Initialize>::new(InitializeParams {
        plugin_names: hooks.plugin_names(),
    });
    let initialized = hooks.broadcast(&mut startup);
    info!(plugins = hooks.plugin_count(), initialized, "Plugins initialized");

    let bridge = Arc::new(SyncBridge::new(config.update_buffer));
    let sink: Arc<dyn StateSink> = bridge.clone();
    let mut registry = ObjectRegistry::new(config.registry_config(), Arc::new(hooks), sink)
        .context("Failed to create object registry")?;
    carta_data::initialize(&mut registry);

    let (event_loop, handle) = EventLoop::new(registry, config.event_queue_capacity);
    let event_task = tokio::spawn(event_loop.run());

    let served = connector::serve(
        handle.clone(),
        Arc::clone(&bridge),
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await;

    if let Err(e) = handle.shutdown().await {
        warn!("Event loop already stopped: {}", e);
    }
    event_task.await.context("Event loop task failed")?;
    served
}
