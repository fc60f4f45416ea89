pub mod config;
pub mod controller;
pub mod mapping;
pub mod output;
pub mod persistence;

use crate::config::ConfigurationContext;
use crate::controller::ControllerHandle;
use crate::mapping::{MappingEngineManager, MappingError};
use crate::output::{DryRunSink, OutputSink};
use crate::persistence::{BridgeSettings, SettingsStore};
use color_eyre::{eyre::eyre, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let store = SettingsStore::new(SettingsStore::default_path()?);
    store.ensure_default_settings().await?;
    let mut settings = store.load().await?;

    if let Err(e) = settings.session.validate() {
        warn!("Stored session is invalid ({}), starting with defaults", e);
        settings.session = ConfigurationContext::default();
    }
    info!(
        "Starting bridge for {} with {:?}",
        settings.session.target, settings.controller
    );

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received, shutting down"),
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
        ctrl_c_cancel.cancel();
    });

    if !settings.output.dry_run {
        #[cfg(target_os = "linux")]
        {
            match output::UinputKeyboard::create(&settings.output.device_name) {
                Ok(keyboard) => return run_bridge(settings, store, keyboard, cancel).await,
                Err(e) => warn!("Virtual keyboard unavailable ({}), falling back to dry-run", e),
            }
        }
        #[cfg(not(target_os = "linux"))]
        {
            warn!("No virtual keyboard backend on this platform, falling back to dry-run");
        }
    }

    run_bridge(settings, store, DryRunSink::new(), cancel).await
}

/// Wires controller and bridge and waits until the bridge stops.
async fn run_bridge<S: OutputSink + 'static>(
    settings: BridgeSettings,
    store: SettingsStore,
    sink: S,
    cancel: CancellationToken,
) -> Result<()> {
    let (controller_output_sender, controller_output_receiver) = mpsc::channel(64);
    // Configuration front ends send on this channel
    let (_command_sender, command_receiver) = mpsc::channel(16);

    let mut manager = MappingEngineManager::new(
        settings.session,
        &settings.keys,
        settings.timing,
        controller_output_receiver,
        command_receiver,
        sink,
    )
    .with_store(store);

    let controller_handle = ControllerHandle::spawn(
        settings.controller,
        controller_output_sender,
        manager.subscribe_config(),
        cancel.clone(),
    )
    .map_err(|e| eyre!("Failed to spawn controller: {}", e))?;
    let notches = controller_handle.subscribe();

    let manager_cancel = cancel.clone();
    let manager_handle = tokio::spawn(async move { manager.run_mapping(manager_cancel).await });

    let result = manager_handle
        .await
        .map_err(|e| MappingError::ThreadError(e.to_string()))?;

    cancel.cancel();
    controller_handle.join().await;
    debug!("Last confirmed notches: {:?}", notches.borrow().notches);

    result?;
    info!("Bridge stopped");
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
