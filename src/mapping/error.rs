//! Error definitions for the mapping module

use crate::config::ConfigError;
use crate::output::OutputError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MappingError {
    /// Rejected configuration change
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The output sink failed to emit a key event
    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    /// Task or thread failure
    #[error("Thread error: {0}")]
    ThreadError(String),
}
