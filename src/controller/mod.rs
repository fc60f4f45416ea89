//! Controller subsystem for mascon input handling
//!
//! Implements a two-stage processing pipeline:
//!
//! 1. [`event_collector`] - Raw button snapshots from the gamepad backend
//! 2. [`event_processor`] - Decode, resolve and stabilize into notches
//! 3. [`controller_handle`] - Unified API and lifecycle management
//!
//! # Architecture
//!
//! ```text
//! Gamepad ──► Collector ──► Processor ──────────────────────────► ControllerOutput
//!             (snapshots)   decoder → notch tables → filters
//! ```
//!
//! Both stages run at the configured tick rate (60 Hz by default).

pub mod controller_handle;
pub mod decoder;
pub mod display;
pub mod event_collector;
pub mod event_processor;
pub mod filter;
pub mod notch;
pub mod pipeline;

pub use controller_handle::{ControllerError, ControllerHandle, ControllerSettings};
pub use display::DisplayNotches;
pub use event_processor::ControllerOutput;
