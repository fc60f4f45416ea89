//! Bridge loop: drives the translator of the active target and owns the output sink.

use crate::config::{ConfigChange, ConfigurationContext, ResetScope};
use crate::controller::{ControllerOutput, DisplayNotches};
use crate::mapping::{
    KeyBindings, MappingError, OutputAction, TargetTranslator, Timing, TranslatorSet,
};
use crate::output::{self, OutputSink};
use crate::persistence::SettingsStore;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Requests from a configuration front end. Applied between ticks.
#[derive(Debug)]
pub enum BridgeCommand {
    Apply {
        change: ConfigChange,
        response_tx: Option<oneshot::Sender<Result<ConfigurationContext, MappingError>>>,
    },
}

/// Single writer to the output sink.
///
/// Ticks and configuration commands are handled strictly one after another,
/// so a cascade is always played to the end before a reset or the next tick.
pub struct MappingEngineManager<S: OutputSink> {
    /// One translator per target, only the active one is driven
    translators: TranslatorSet,

    /// Configuration used for the next tick
    config: ConfigurationContext,

    /// Confirmed notches from the controller processor
    controller_rx: mpsc::Receiver<ControllerOutput>,

    /// Configuration requests
    command_rx: mpsc::Receiver<BridgeCommand>,

    /// Publishes every applied configuration
    config_tx: watch::Sender<ConfigurationContext>,

    sink: S,

    /// Receives the session after each applied change
    store: Option<SettingsStore>,

    /// Last logged HUD line
    last_display: Option<DisplayNotches>,
}

impl<S: OutputSink> MappingEngineManager<S> {
    pub fn new(
        config: ConfigurationContext,
        bindings: &KeyBindings,
        timing: Timing,
        controller_rx: mpsc::Receiver<ControllerOutput>,
        command_rx: mpsc::Receiver<BridgeCommand>,
        sink: S,
    ) -> Self {
        info!(
            "Creating MappingEngineManager for {} with sink {}",
            config.target,
            sink.name()
        );
        let (config_tx, _) = watch::channel(config);

        Self {
            translators: TranslatorSet::new(bindings, timing),
            config,
            controller_rx,
            command_rx,
            config_tx,
            sink,
            store: None,
            last_display: None,
        }
    }

    /// Saves the session to `store` after every applied change.
    pub fn with_store(mut self, store: SettingsStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> ConfigurationContext {
        self.config
    }

    /// Active configuration, updated whenever a change is applied.
    pub fn subscribe_config(&self) -> watch::Receiver<ConfigurationContext> {
        self.config_tx.subscribe()
    }

    /// Runs until `cancel` fires or the controller channel closes, then
    /// releases every key the active translator holds.
    pub async fn run_mapping(&mut self, cancel: CancellationToken) -> Result<(), MappingError> {
        info!("Start Mapping for {}", self.config.target);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Bridge cancelled");
                    break;
                }
                Some(command) = self.command_rx.recv() => {
                    self.handle_command(command).await;
                }
                output = self.controller_rx.recv() => match output {
                    Some(output) => {
                        if let Err(e) = self.handle_output(output).await {
                            error!("Failed to emit keys: {}", e);
                        }
                    }
                    None => {
                        warn!("Controller channel closed, stopping bridge");
                        break;
                    }
                },
            }
        }

        self.shutdown().await
    }

    async fn handle_command(&mut self, command: BridgeCommand) {
        match command {
            BridgeCommand::Apply {
                change,
                response_tx,
            } => {
                let result = self.apply_change(change).await;
                if let Some(tx) = response_tx {
                    if tx.send(result).is_err() {
                        debug!("Requester of {:?} went away", change);
                    }
                } else if let Err(e) = result {
                    warn!("Configuration change {:?} rejected: {}", change, e);
                }
            }
        }
    }

    /// Translates one tick and plays the resulting actions. A lost
    /// controller releases every key the active translator holds.
    pub async fn handle_output(&mut self, output: ControllerOutput) -> Result<(), MappingError> {
        if !output.connected {
            warn!("Controller disconnected, releasing held keys");
            self.last_display = None;
            let releases = self.translators.get_mut(self.config.target).reset();
            return self.play(&releases).await;
        }

        let reading = output.notches;
        if reading.auto_air_table != self.config.uses_auto_air_table() {
            debug!("Dropping reading resolved with the previous brake table");
            return Ok(());
        }

        let hud = DisplayNotches::project(&self.config, reading.power, reading.brake);
        if self.last_display != Some(hud) {
            info!("{} {}", self.config.target, hud);
            self.last_display = Some(hud);
        }

        let actions = self.translators.get_mut(self.config.target).update(
            reading.power,
            reading.brake,
            reading.latches,
            &self.config,
        );
        self.play(&actions).await
    }

    /// Applies one change. Keys of the translators named by the reset signal
    /// are released before the new configuration takes effect.
    pub async fn apply_change(
        &mut self,
        change: ConfigChange,
    ) -> Result<ConfigurationContext, MappingError> {
        let transition = self.config.apply(change)?;

        if transition.config == self.config && transition.reset == ResetScope::None {
            if self.config.limits_locked() {
                info!(
                    "Ignoring {:?}, limits are fixed by variant {}",
                    change, self.config.variant
                );
            } else {
                debug!("{:?} left the configuration unchanged", change);
            }
            return Ok(self.config);
        }

        let releases: Vec<OutputAction> = match transition.reset {
            ResetScope::None => Vec::new(),
            ResetScope::Active => {
                info!("Resetting {} translator", self.config.target);
                self.translators.get_mut(self.config.target).reset()
            }
            ResetScope::Switch { from, to } => {
                info!("Switching target {} -> {}", from, to);
                let mut releases = self.translators.get_mut(from).reset();
                releases.extend(self.translators.get_mut(to).reset());
                releases
            }
        };
        self.play(&releases).await?;

        self.config = transition.config;
        self.last_display = None;
        self.config_tx.send_replace(self.config);
        info!(
            "Configuration: target={} topology={} P{} B{} variant={}",
            self.config.target,
            self.config.brake_topology,
            self.config.max_power,
            self.config.max_brake,
            self.config.variant
        );

        if let Some(store) = &self.store {
            if let Err(e) = store.save_session(&self.config).await {
                warn!("Failed to save session: {}", e);
            }
        }

        Ok(self.config)
    }

    /// Releases everything the active translator holds.
    pub async fn shutdown(&mut self) -> Result<(), MappingError> {
        let releases = self.translators.get_mut(self.config.target).reset();
        if !releases.is_empty() {
            info!("Releasing {} held keys", releases.len());
        }
        self.play(&releases).await
    }

    async fn play(&mut self, actions: &[OutputAction]) -> Result<(), MappingError> {
        if actions.is_empty() {
            return Ok(());
        }
        debug!("Playing {} actions on {}", actions.len(), self.sink.name());
        output::execute(&mut self.sink, actions).await?;
        Ok(())
    }
}
