//! Keystroke emission.
//!
//! The bridge task is the only writer. Everything it produces is an ordered
//! list of [`OutputAction`]s, played back by [`execute`] against a sink.

#[cfg(target_os = "linux")]
pub mod uinput;

#[cfg(target_os = "linux")]
pub use uinput::UinputKeyboard;

use crate::mapping::{Key, OutputAction};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to create virtual keyboard: {0}")]
    DeviceCreation(#[source] std::io::Error),

    #[error("Failed to emit {key}: {source}")]
    Emit {
        key: Key,
        #[source]
        source: std::io::Error,
    },
}

/// Destination of key events.
pub trait OutputSink: Send {
    fn name(&self) -> &str;

    fn key_down(&mut self, key: Key) -> Result<(), OutputError>;

    fn key_up(&mut self, key: Key) -> Result<(), OutputError>;

    /// Blocks the output stream for `duration`.
    fn wait(&mut self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

/// Plays `actions` in order. Stops at the first failing key event.
pub async fn execute<S: OutputSink>(
    sink: &mut S,
    actions: &[OutputAction],
) -> Result<(), OutputError> {
    for action in actions {
        match *action {
            OutputAction::KeyDown(key) => sink.key_down(key)?,
            OutputAction::KeyUp(key) => sink.key_up(key)?,
            OutputAction::PressAndRelease {
                key,
                press,
                release,
            } => {
                sink.key_down(key)?;
                if !press.is_zero() {
                    sink.wait(press).await;
                }
                sink.key_up(key)?;
                if !release.is_zero() {
                    sink.wait(release).await;
                }
            }
            OutputAction::Wait(duration) => sink.wait(duration).await,
        }
    }
    Ok(())
}

/// Logs key events instead of emitting them. Delays are still honoured.
#[derive(Debug, Default)]
pub struct DryRunSink {
    emitted: u64,
}

impl DryRunSink {
    pub fn new() -> Self {
        info!("Dry-run output enabled, no keys will be sent");
        Self::default()
    }
}

impl OutputSink for DryRunSink {
    fn name(&self) -> &str {
        "dry-run"
    }

    fn key_down(&mut self, key: Key) -> Result<(), OutputError> {
        self.emitted += 1;
        info!("[dry-run] {} down", key);
        Ok(())
    }

    fn key_up(&mut self, key: Key) -> Result<(), OutputError> {
        self.emitted += 1;
        info!("[dry-run] {} up", key);
        debug!("[dry-run] {} key events so far", self.emitted);
        Ok(())
    }
}

#[cfg(test)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SinkEvent {
    Down(Key),
    Up(Key),
    Wait(Duration),
}

/// Records events without sleeping.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<SinkEvent>,
}

#[cfg(test)]
impl RecordingSink {
    /// Keys that went down and were not released again.
    pub fn held(&self) -> Vec<Key> {
        let mut held = Vec::new();
        for event in &self.events {
            match *event {
                SinkEvent::Down(key) => held.push(key),
                SinkEvent::Up(key) => held.retain(|k| *k != key),
                SinkEvent::Wait(_) => {}
            }
        }
        held
    }

    pub fn downs(&self) -> Vec<Key> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Down(key) => Some(*key),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
impl OutputSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    fn key_down(&mut self, key: Key) -> Result<(), OutputError> {
        self.events.push(SinkEvent::Down(key));
        Ok(())
    }

    fn key_up(&mut self, key: Key) -> Result<(), OutputError> {
        self.events.push(SinkEvent::Up(key));
        Ok(())
    }

    fn wait(&mut self, duration: Duration) -> impl Future<Output = ()> + Send {
        self.events.push(SinkEvent::Wait(duration));
        std::future::ready(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_press_and_release_expands() {
        let mut sink = RecordingSink::default();
        let actions = [
            OutputAction::PressAndRelease {
                key: Key::Z,
                press: Duration::from_millis(40),
                release: Duration::from_millis(40),
            },
            OutputAction::Wait(Duration::from_millis(50)),
            OutputAction::KeyDown(Key::S),
        ];
        execute(&mut sink, &actions).await.unwrap();
        assert_eq!(
            sink.events,
            vec![
                SinkEvent::Down(Key::Z),
                SinkEvent::Wait(Duration::from_millis(40)),
                SinkEvent::Up(Key::Z),
                SinkEvent::Wait(Duration::from_millis(40)),
                SinkEvent::Wait(Duration::from_millis(50)),
                SinkEvent::Down(Key::S),
            ]
        );
        assert_eq!(sink.held(), vec![Key::S]);
    }

    #[tokio::test]
    async fn test_zero_press_time_skips_wait() {
        let mut sink = RecordingSink::default();
        let actions = [OutputAction::PressAndRelease {
            key: Key::A,
            press: Duration::ZERO,
            release: Duration::from_millis(20),
        }];
        execute(&mut sink, &actions).await.unwrap();
        assert_eq!(
            sink.events,
            vec![
                SinkEvent::Down(Key::A),
                SinkEvent::Up(Key::A),
                SinkEvent::Wait(Duration::from_millis(20)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dry_run_honours_delays() {
        let mut sink = DryRunSink::new();
        let start = tokio::time::Instant::now();
        execute(&mut sink, &[OutputAction::Wait(Duration::from_millis(50))])
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
