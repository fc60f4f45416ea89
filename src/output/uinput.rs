//! Virtual keyboard backed by Linux uinput.

use super::{OutputError, OutputSink};
use crate::mapping::Key;
use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, EventType, InputEvent};
use tracing::{debug, info};

pub struct UinputKeyboard {
    device: VirtualDevice,
    name: String,
}

impl UinputKeyboard {
    /// Registers a virtual keyboard exposing every bindable key.
    pub fn create(name: &str) -> Result<Self, OutputError> {
        let mut keys = AttributeSet::<evdev::Key>::new();
        for key in Key::ALL {
            keys.insert(evdev_key(key));
        }

        let device = VirtualDeviceBuilder::new()
            .map_err(OutputError::DeviceCreation)?
            .name(name)
            .with_keys(&keys)
            .map_err(OutputError::DeviceCreation)?
            .build()
            .map_err(OutputError::DeviceCreation)?;

        info!("Created virtual keyboard '{}'", name);
        Ok(Self {
            device,
            name: name.to_string(),
        })
    }

    fn emit(&mut self, key: Key, value: i32) -> Result<(), OutputError> {
        let code = evdev_key(key).code();
        debug!("uinput {} = {}", key, value);
        self.device
            .emit(&[InputEvent::new(EventType::KEY, code, value)])
            .map_err(|source| OutputError::Emit { key, source })
    }
}

impl OutputSink for UinputKeyboard {
    fn name(&self) -> &str {
        &self.name
    }

    fn key_down(&mut self, key: Key) -> Result<(), OutputError> {
        self.emit(key, 1)
    }

    fn key_up(&mut self, key: Key) -> Result<(), OutputError> {
        self.emit(key, 0)
    }
}

fn evdev_key(key: Key) -> evdev::Key {
    match key {
        Key::A => evdev::Key::KEY_A,
        Key::B => evdev::Key::KEY_B,
        Key::C => evdev::Key::KEY_C,
        Key::D => evdev::Key::KEY_D,
        Key::E => evdev::Key::KEY_E,
        Key::F => evdev::Key::KEY_F,
        Key::G => evdev::Key::KEY_G,
        Key::H => evdev::Key::KEY_H,
        Key::I => evdev::Key::KEY_I,
        Key::J => evdev::Key::KEY_J,
        Key::K => evdev::Key::KEY_K,
        Key::L => evdev::Key::KEY_L,
        Key::M => evdev::Key::KEY_M,
        Key::N => evdev::Key::KEY_N,
        Key::O => evdev::Key::KEY_O,
        Key::P => evdev::Key::KEY_P,
        Key::Q => evdev::Key::KEY_Q,
        Key::R => evdev::Key::KEY_R,
        Key::S => evdev::Key::KEY_S,
        Key::T => evdev::Key::KEY_T,
        Key::U => evdev::Key::KEY_U,
        Key::V => evdev::Key::KEY_V,
        Key::W => evdev::Key::KEY_W,
        Key::X => evdev::Key::KEY_X,
        Key::Y => evdev::Key::KEY_Y,
        Key::Z => evdev::Key::KEY_Z,
        Key::Comma => evdev::Key::KEY_COMMA,
        Key::Period => evdev::Key::KEY_DOT,
        Key::Slash => evdev::Key::KEY_SLASH,
        Key::Semicolon => evdev::Key::KEY_SEMICOLON,
        Key::Space => evdev::Key::KEY_SPACE,
        Key::Enter => evdev::Key::KEY_ENTER,
        Key::Backspace => evdev::Key::KEY_BACKSPACE,
        Key::Tab => evdev::Key::KEY_TAB,
        Key::ArrowUp => evdev::Key::KEY_UP,
        Key::ArrowDown => evdev::Key::KEY_DOWN,
        Key::ArrowLeft => evdev::Key::KEY_LEFT,
        Key::ArrowRight => evdev::Key::KEY_RIGHT,
    }
}
