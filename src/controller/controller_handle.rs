//! Controller Handle - Unified API for mascon input processing
//!
//! Starts the collector on the blocking pool and the processor as a tokio
//! task, wires the channel between them and distributes the settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub use super::event_collector::{CollectorError, CollectorHandle, CollectorSettings};
pub use super::event_processor::{
    ControllerOutput, ProcessorError, ProcessorHandle, ProcessorSettings,
};
use super::filter::FilterPolicy;
use crate::config::ConfigurationContext;

/// Configuration of the complete controller subsystem.
///
/// Stored as the `[controller]` section of the settings file.
///
/// # Examples
///
/// ```toml
/// [controller]
/// tick_hz = 60
/// button_code_base = 288
///
/// [controller.filter]
/// policy = "chattering_guard"
/// notch_hold_ms = 20
/// neutral_hold_ms = 100
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    /// Snapshots per second, shared by collector and processor
    pub tick_hz: u32,

    /// Raw event code of button 1
    ///
    /// Defaults to `BTN_JOYSTICK` (0x120), which is where generic HID
    /// joysticks start on Linux.
    pub button_code_base: u32,

    /// Chatter suppression for both handles
    pub filter: FilterPolicy,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            tick_hz: 60,
            button_code_base: 0x120,
            filter: FilterPolicy::default(),
        }
    }
}

impl ControllerSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.tick_hz.max(1)))
    }
}

/// Errors that can occur during controller initialization
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// Gamepad backend could not be started
    #[error("Collector error: {0}")]
    CollectorError(#[from] CollectorError),

    #[error("Processor error: {0}")]
    ProcessorError(#[from] ProcessorError),
}

/// Handle for the running controller subsystem.
///
/// ```text
/// CollectorHandle ─[RawControllerEvent]→ ProcessorHandle ─[ControllerOutput]→ bridge
///                  (mpsc::channel(256))                    (provided sender)
/// ```
pub struct ControllerHandle {
    collector: CollectorHandle,
    processor: ProcessorHandle,
}

impl ControllerHandle {
    /// Spawns collector and processor.
    ///
    /// `config_receiver` lets the processor pick the brake table of the active
    /// configuration. Both stages stop when `cancel` fires.
    pub fn spawn(
        settings: ControllerSettings,
        sender: mpsc::Sender<ControllerOutput>,
        config_receiver: watch::Receiver<ConfigurationContext>,
        cancel: CancellationToken,
    ) -> Result<Self, ControllerError> {
        info!("Initializing Controller system with settings: {:?}", settings);

        let collector_settings = CollectorSettings {
            tick_interval: settings.tick_interval(),
            button_code_base: settings.button_code_base,
        };
        let processor_settings = ProcessorSettings {
            processing_interval: settings.tick_interval(),
            filter: settings.filter,
        };
        debug!(
            "Split settings: collector={:?}, processor={:?}",
            collector_settings, processor_settings
        );

        let (event_sender, event_receiver) = mpsc::channel(256);

        let collector = CollectorHandle::spawn(collector_settings, event_sender, cancel.clone())?;
        let processor = ProcessorHandle::spawn(
            event_receiver,
            sender,
            config_receiver,
            processor_settings,
            cancel,
        );

        info!("Controller system initialized successfully");
        Ok(Self {
            collector,
            processor,
        })
    }

    /// Confirmed notches of the latest tick.
    pub fn subscribe(&self) -> watch::Receiver<ControllerOutput> {
        self.processor.subscribe()
    }

    /// Waits for the collector thread after cancellation.
    pub async fn join(self) {
        self.collector.join().await;
        info!("Controller system stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_interval() {
        let settings = ControllerSettings::default();
        assert_eq!(settings.tick_interval(), Duration::from_micros(16_666));
        let zero = ControllerSettings {
            tick_hz: 0,
            ..Default::default()
        };
        assert_eq!(zero.tick_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_settings_from_toml() {
        let settings: ControllerSettings = toml::from_str(
            "tick_hz = 100\n[filter]\npolicy = \"immediate\"\n",
        )
        .unwrap();
        assert_eq!(settings.tick_hz, 100);
        assert_eq!(settings.filter, FilterPolicy::Immediate);
        assert_eq!(settings.button_code_base, 0x120);
    }
}
