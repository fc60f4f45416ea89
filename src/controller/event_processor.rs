use chrono::Local;
use statum::{machine, state};
use std::time::{Duration, SystemTime};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ConfigurationContext;
use crate::controller::event_collector::RawControllerEvent;
use crate::controller::filter::FilterPolicy;
use crate::controller::pipeline::{NotchPipeline, NotchReading};

// Controller state that will be shared through watch channel
#[derive(Clone, Debug)]
pub struct ControllerOutput {
    pub notches: NotchReading,

    // False once the active gamepad went away; the bridge releases its keys
    pub connected: bool,

    // Timestamp of last update
    pub timestamp: SystemTime,
}

impl Default for ControllerOutput {
    fn default() -> Self {
        Self {
            notches: NotchReading::default(),
            connected: false,
            timestamp: SystemTime::now(),
        }
    }
}

// Event batch for the processing state
#[derive(Debug, Clone)]
pub struct EventBatch {
    pub events: Vec<RawControllerEvent>,
}

// Processor settings
#[derive(Clone, Debug)]
pub struct ProcessorSettings {
    pub processing_interval: Duration,
    pub filter: FilterPolicy,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            processing_interval: Duration::from_micros(1_000_000 / 60),
            filter: FilterPolicy::default(),
        }
    }
}

// Processor errors
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    #[error("Failed to receive events: {0}")]
    EventReceiveError(String),

    #[error("Failed to update state: {0}")]
    StateUpdateError(String),
}

// Define processor states using statum's state macro
#[state]
#[derive(Debug, Clone)]
pub enum ProcessingState {
    Waiting,
    Processing(EventBatch),
    Updating,
}

#[machine]
#[derive(Debug)]
pub struct EventProcessor<S: ProcessingState> {
    // Receiver for raw events
    event_receiver: mpsc::Receiver<RawControllerEvent>,

    // Processor settings
    settings: ProcessorSettings,

    // Decoder, resolver and filters
    pipeline: NotchPipeline,

    // Current controller output state
    output: ControllerOutput,

    // Whether `output` holds a reading from this cycle
    fresh: bool,

    // Disconnect not yet delivered to the bridge
    disconnect_pending: bool,

    // Watch channel sender
    state_sender: watch::Sender<ControllerOutput>,

    // Per-tick output towards the bridge
    output_sender: mpsc::Sender<ControllerOutput>,

    // Active configuration, selects the brake table
    config_receiver: watch::Receiver<ConfigurationContext>,
}

impl<S: ProcessingState> EventProcessor<S> {
    pub fn subscribe(&self) -> watch::Receiver<ControllerOutput> {
        self.state_sender.subscribe()
    }

    pub fn settings(&self) -> &ProcessorSettings {
        &self.settings
    }
}

// Implementation for Waiting state
impl EventProcessor<Waiting> {
    pub fn create(
        event_receiver: mpsc::Receiver<RawControllerEvent>,
        output_sender: mpsc::Sender<ControllerOutput>,
        config_receiver: watch::Receiver<ConfigurationContext>,
        settings: ProcessorSettings,
    ) -> Self {
        info!("Creating Event Processor with settings: {:?}", settings);

        let output = ControllerOutput::default();
        let (state_sender, _) = watch::channel(output.clone());
        let pipeline = NotchPipeline::new(settings.filter);

        Self::new(
            event_receiver,
            settings,
            pipeline,
            output,
            false,
            false,
            state_sender,
            output_sender,
            config_receiver,
        )
    }

    // Collect every queued event without waiting
    pub fn wait_and_collect(mut self) -> Result<EventProcessor<Processing>, ProcessorError> {
        let mut events = Vec::new();

        loop {
            match self.event_receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    error!("Event channel disconnected!");
                    return Err(ProcessorError::EventReceiveError(
                        "Event channel disconnected".to_string(),
                    ));
                }
            }
        }

        if events.len() > 1 {
            debug!("Collected batch of {} events", events.len());
        }

        Ok(self.transition_with(EventBatch { events }))
    }
}

// Implementation for Processing state
impl EventProcessor<Processing> {
    // Run every snapshot through the pipeline; the last reading wins
    pub fn process_events(mut self) -> EventProcessor<Updating> {
        let events = match self.get_state_data() {
            Some(batch) => batch.events.clone(),
            None => {
                warn!("No event batch found in state data, this should not happen");
                Vec::new()
            }
        };

        let config = *self.config_receiver.borrow();
        self.fresh = false;

        for event in events {
            match event {
                RawControllerEvent::Snapshot {
                    buttons,
                    at,
                    timestamp,
                } => {
                    let previous = self.output.notches;
                    let reading = self.pipeline.process(&buttons, at, &config);
                    if (reading.power, reading.brake) != (previous.power, previous.brake) {
                        info!(
                            "Confirmed P{} B{} at {}",
                            reading.power,
                            reading.brake,
                            timestamp.format("%H:%M:%S.%3f")
                        );
                    }
                    self.output.notches = reading;
                    self.output.connected = true;
                    self.fresh = true;
                }
                RawControllerEvent::Disconnected { timestamp } => {
                    warn!(
                        "Controller lost at {}, filters dropped",
                        timestamp.format("%H:%M:%S.%3f")
                    );
                    self.pipeline.reset();
                    self.fresh = false;
                    self.disconnect_pending = true;
                }
            }
        }

        if self.fresh {
            self.output.timestamp = SystemTime::now();
        }

        self.transition()
    }
}

// Implementation for Updating state
impl EventProcessor<Updating> {
    // Publish the reading and transition back to Waiting state
    pub fn update_state(mut self) -> Result<EventProcessor<Waiting>, ProcessorError> {
        if self.disconnect_pending {
            // Delivered before any newer reading so held keys get released
            self.output = ControllerOutput::default();
            self.state_sender.send_replace(self.output.clone());

            match self.output_sender.try_send(self.output.clone()) {
                Ok(_) => self.disconnect_pending = false,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    debug!("Bridge busy, disconnect retried next cycle");
                }
                Err(e) => {
                    error!("Failed to forward disconnect: {}", e);
                    return Err(ProcessorError::StateUpdateError(e.to_string()));
                }
            }
        } else if self.fresh {
            self.state_sender.send_replace(self.output.clone());

            match self.output_sender.try_send(self.output.clone()) {
                Ok(_) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    debug!("Bridge busy, dropping tick");
                }
                Err(e) => {
                    error!("Failed to forward controller output: {}", e);
                    return Err(ProcessorError::StateUpdateError(e.to_string()));
                }
            }
        }

        Ok(self.transition())
    }
}

// Public interface for spawning and running the processor
pub struct ProcessorHandle {
    state_receiver: watch::Receiver<ControllerOutput>,
}

impl ProcessorHandle {
    pub fn spawn(
        event_receiver: mpsc::Receiver<RawControllerEvent>,
        output_sender: mpsc::Sender<ControllerOutput>,
        config_receiver: watch::Receiver<ConfigurationContext>,
        settings: ProcessorSettings,
        cancel: CancellationToken,
    ) -> Self {
        let processor =
            EventProcessor::create(event_receiver, output_sender, config_receiver, settings);
        let state_receiver = processor.subscribe();

        tokio::spawn(async move {
            info!("Event Processor task started");
            if let Err(e) = run_processor_loop(processor, cancel).await {
                error!("Processor task terminated with error: {}", e);
            } else {
                info!("Event Processor task finished");
            }
        });

        Self { state_receiver }
    }

    pub fn subscribe(&self) -> watch::Receiver<ControllerOutput> {
        self.state_receiver.clone()
    }
}

async fn run_processor_loop(
    mut processor: EventProcessor<Waiting>,
    cancel: CancellationToken,
) -> Result<(), ProcessorError> {
    let period = processor.settings().processing_interval;
    info!("Starting processor loop with {:?} interval", period);

    let mut interval_timer = tokio::time::interval(period);
    interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    // Stats for performance monitoring
    let mut cycles = 0u64;
    let mut published = 0u64;
    let mut last_stats_time = Local::now();
    let stats_interval = chrono::Duration::seconds(30);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = interval_timer.tick() => {}
        }

        let updating = processor.wait_and_collect()?.process_events();
        if updating.fresh {
            published += 1;
        }
        processor = updating.update_state()?;
        cycles += 1;

        let now = Local::now();
        if now - last_stats_time > stats_interval {
            let elapsed_seconds = (now - last_stats_time).num_seconds().max(1);
            info!(
                "Processor stats: {} cycles, {} readings published in {} seconds ({:.1}/sec)",
                cycles,
                published,
                elapsed_seconds,
                published as f64 / elapsed_seconds as f64
            );
            cycles = 0;
            published = 0;
            last_stats_time = now;
        }
    }
}
