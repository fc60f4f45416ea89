//! Translation of confirmed notches into keyboard actions.
//!
//! One state machine per simulator target turns (power, brake, buttons) into an
//! ordered list of [`OutputAction`]s. Delays are part of the action stream so
//! the output sink decides how to realize them.
//!
//! ```text
//! ControllerOutput ──► Translator (selected by Target) ──► Vec<OutputAction> ──► OutputSink
//! ```

pub mod axis;
pub mod bve;
pub mod error;
pub mod jrets;
pub mod keyboard;
pub mod manager;
pub mod pcsx2;
pub mod rpcs3;
pub mod strategy;

pub use error::MappingError;
pub use keyboard::{AxisKeys, HandleKeys, KeyBindings, Timing};
pub use manager::{BridgeCommand, MappingEngineManager};
pub use strategy::{TargetTranslator, Translator, TranslatorSet, TranslatorState};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Logical keyboard key. Mapped to a platform key code by the output sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
    Comma,
    Period,
    Slash,
    Semicolon,
    Space,
    Enter,
    Backspace,
    Tab,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
}

impl Key {
    pub const ALL: [Key; 38] = [
        Key::A,
        Key::B,
        Key::C,
        Key::D,
        Key::E,
        Key::F,
        Key::G,
        Key::H,
        Key::I,
        Key::J,
        Key::K,
        Key::L,
        Key::M,
        Key::N,
        Key::O,
        Key::P,
        Key::Q,
        Key::R,
        Key::S,
        Key::T,
        Key::U,
        Key::V,
        Key::W,
        Key::X,
        Key::Y,
        Key::Z,
        Key::Comma,
        Key::Period,
        Key::Slash,
        Key::Semicolon,
        Key::Space,
        Key::Enter,
        Key::Backspace,
        Key::Tab,
        Key::ArrowUp,
        Key::ArrowDown,
        Key::ArrowLeft,
        Key::ArrowRight,
    ];
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One step of the output stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputAction {
    KeyDown(Key),
    KeyUp(Key),
    PressAndRelease {
        key: Key,
        press: Duration,
        release: Duration,
    },
    Wait(Duration),
}

/// Builder for the action list of one tick.
#[derive(Debug, Clone)]
pub struct ActionPlan {
    actions: Vec<OutputAction>,
    press: Duration,
    release: Duration,
}

impl ActionPlan {
    /// `press` is how long each key is held, `release` the pause after it.
    pub fn new(press: Duration, release: Duration) -> Self {
        Self {
            actions: Vec::new(),
            press,
            release,
        }
    }

    pub fn press(&mut self, key: Key) {
        self.actions.push(OutputAction::PressAndRelease {
            key,
            press: self.press,
            release: self.release,
        });
    }

    /// Repeats a press `count` times.
    pub fn cascade(&mut self, key: Key, count: u32) {
        for _ in 0..count {
            self.press(key);
        }
    }

    pub fn key_down(&mut self, key: Key) {
        self.actions.push(OutputAction::KeyDown(key));
    }

    pub fn key_up(&mut self, key: Key) {
        self.actions.push(OutputAction::KeyUp(key));
    }

    pub fn wait(&mut self, duration: Duration) {
        if !duration.is_zero() {
            self.actions.push(OutputAction::Wait(duration));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn into_actions(self) -> Vec<OutputAction> {
        self.actions
    }
}
