use super::decoder::{ButtonVector, BUTTON_COUNT};
use chrono::{DateTime, Local};
use gilrs::{Event, EventType, Gamepad, GamepadId, Gilrs};
use statum::{machine, state};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

// Raw controller event: the full button vector once per tick
#[derive(Debug, Clone)]
pub enum RawControllerEvent {
    Snapshot {
        buttons: ButtonVector,
        at: Instant,
        timestamp: DateTime<Local>,
    },
    Disconnected {
        timestamp: DateTime<Local>,
    },
}

// Collector settings
#[derive(Clone, Debug)]
pub struct CollectorSettings {
    pub tick_interval: Duration,
    /// Raw code of button 1 on the device (low 16 bits)
    pub button_code_base: u32,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_micros(1_000_000 / 60),
            button_code_base: 0x120,
        }
    }
}

// Collector errors
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("Failed to initialize collector: {0}")]
    InitializationError(String),

    #[error("Failed to send event: {0}")]
    EventSendError(String),
}

// Define collector states using statum's state macro
#[state]
#[derive(Debug, Clone)]
pub enum CollectionState {
    Initializing,
    Collecting,
}

#[machine]
#[derive(Debug)]
pub struct EventCollector<S: CollectionState> {
    // Gilrs context
    gilrs: Gilrs,

    // Active gamepad
    active_gamepad: Option<GamepadId>,

    // Collector settings
    settings: CollectorSettings,

    // Channel for sending events to processor
    event_sender: mpsc::Sender<RawControllerEvent>,

    // Current level of every button of the active gamepad
    buttons: ButtonVector,
}

// Implementation for Initializing state
impl EventCollector<Initializing> {
    pub fn create(
        settings: CollectorSettings,
        event_sender: mpsc::Sender<RawControllerEvent>,
    ) -> Result<Self, CollectorError> {
        debug!("Creating Event Collector with settings: {:?}", settings);

        info!("Initializing gilrs controller interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(CollectorError::InitializationError(e.to_string()));
            }
        };

        Ok(Self::new(
            gilrs,
            None,
            settings,
            event_sender,
            ButtonVector::default(),
        ))
    }

    // Pick the first connected gamepad and transition to Collecting state
    pub fn initialize(mut self) -> EventCollector<Collecting> {
        let gamepads: Vec<(GamepadId, Gamepad<'_>)> = self.gilrs.gamepads().collect();

        if gamepads.is_empty() {
            warn!("No gamepad connected, continuing in idle mode");
        } else {
            info!("Found {} gamepads:", gamepads.len());
            for (idx, (id, gamepad)) in gamepads.iter().enumerate() {
                info!("  [{}] ID: {}, Name: {}", idx, id, gamepad.name());
            }
            let (id, gamepad) = &gamepads[0];
            self.active_gamepad = Some(*id);
            info!("Selected gamepad: {} ({})", gamepad.name(), id);
        }

        info!("Event Collector initialized, transitioning to Collecting state");
        self.transition()
    }
}

// Implementation for Controller in Collecting state
impl EventCollector<Collecting> {
    // Drain gilrs and emit one snapshot per tick until cancelled
    pub fn run_collection_loop(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<(), CollectorError> {
        info!(
            "Starting Event Collector loop ({:?} tick)",
            self.settings.tick_interval
        );

        let mut snapshot_count = 0;
        let mut last_log_time = Local::now();
        let log_interval = chrono::Duration::seconds(10);
        let mut next_tick = Instant::now() + self.settings.tick_interval;

        while !cancel.is_cancelled() {
            while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
                self.handle_event(id, event)?;
            }

            let now = Instant::now();
            if now >= next_tick {
                next_tick = now + self.settings.tick_interval;
                if self.active_gamepad.is_some() {
                    self.send(RawControllerEvent::Snapshot {
                        buttons: self.buttons,
                        at: now,
                        timestamp: Local::now(),
                    })?;
                    snapshot_count += 1;
                }
            }

            let now = Local::now();
            if now - last_log_time > log_interval {
                info!(
                    "Event Collector stats: {} snapshots in last {} seconds",
                    snapshot_count,
                    log_interval.num_seconds()
                );
                snapshot_count = 0;
                last_log_time = now;
            }

            std::thread::sleep(Duration::from_millis(1));
        }

        info!("Event Collector cancelled");
        Ok(())
    }

    fn handle_event(&mut self, id: GamepadId, event: EventType) -> Result<(), CollectorError> {
        match event {
            EventType::Connected => {
                if self.active_gamepad.is_none() {
                    self.active_gamepad = Some(id);
                    self.buttons.clear();
                    info!("Gamepad {} connected, selected", self.gilrs.gamepad(id).name());
                } else {
                    debug!("Gamepad {} connected, keeping current selection", id);
                }
            }
            EventType::Disconnected if self.active_gamepad == Some(id) => {
                warn!("Active gamepad disconnected, idling until a gamepad connects");
                self.active_gamepad = None;
                self.buttons.clear();
                self.send(RawControllerEvent::Disconnected {
                    timestamp: Local::now(),
                })?;
            }
            _ if self.active_gamepad != Some(id) => {
                debug!("Skipping event from non-active gamepad: {:?}", id);
            }
            EventType::ButtonPressed(_, code) => self.set_button(code.into_u32(), true),
            EventType::ButtonReleased(_, code) => self.set_button(code.into_u32(), false),
            _ => debug!("Unhandled event type: {:?}", event),
        }
        Ok(())
    }

    fn set_button(&mut self, code: u32, pressed: bool) {
        match button_index(code, self.settings.button_code_base) {
            Some(index) => {
                debug!("Button {} {}", index, if pressed { "pressed" } else { "released" });
                self.buttons.set(index, pressed);
            }
            None => debug!("Ignoring button code {:#x}", code),
        }
    }

    fn send(&self, event: RawControllerEvent) -> Result<(), CollectorError> {
        match self.event_sender.try_send(event) {
            Ok(_) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("Processor queue full, dropping event");
                Ok(())
            }
            Err(e) => {
                error!("Failed to send event to processor: {}", e);
                Err(CollectorError::EventSendError(e.to_string()))
            }
        }
    }
}

/// Maps a raw event code to a 1-indexed button number.
pub fn button_index(code: u32, base: u32) -> Option<usize> {
    let offset = (code & 0xFFFF).checked_sub(base)?;
    let index = usize::try_from(offset).ok()? + 1;
    (index <= BUTTON_COUNT).then_some(index)
}

// Public interface for spawning and running the collector
pub struct CollectorHandle {
    task: tokio::task::JoinHandle<()>,
}

impl CollectorHandle {
    // Create a new collector and run it on the blocking pool
    pub fn spawn(
        settings: CollectorSettings,
        event_sender: mpsc::Sender<RawControllerEvent>,
        cancel: CancellationToken,
    ) -> Result<Self, CollectorError> {
        info!("Spawning Event Collector with settings: {:?}", settings);

        let collector = EventCollector::create(settings, event_sender)?;

        let task = tokio::task::spawn_blocking(move || {
            let mut collecting = collector.initialize();
            if let Err(e) = collecting.run_collection_loop(&cancel) {
                error!("Collector task terminated with error: {}", e);
            }
        });

        info!("Event Collector successfully started");
        Ok(Self { task })
    }

    // Wait for the collector thread to observe cancellation
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            error!("Collector task failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_index_from_code() {
        assert_eq!(button_index(0x120, 0x120), Some(1));
        assert_eq!(button_index(0x12F, 0x120), Some(16));
        assert_eq!(button_index(0x0001_0125, 0x120), Some(6));
    }

    #[test]
    fn test_button_index_out_of_range() {
        assert_eq!(button_index(0x11F, 0x120), None);
        assert_eq!(button_index(0x130, 0x120), None);
    }
}
