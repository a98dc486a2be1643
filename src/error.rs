//! Error type shared by configuration, generation and the engine.

use thiserror::Error;

/// Everything that can go wrong while configuring or driving a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid range for {field}: min {min} > max {max}")]
    InvalidRange {
        field: &'static str,
        min: u64,
        max: u64,
    },

    #[error("invalid setting {field}: {reason}")]
    InvalidSetting { field: &'static str, reason: String },

    #[error("cannot schedule {tasks} task(s): worker pool is empty")]
    NoWorkers { tasks: usize },

    #[error("worker not found: {0}")]
    WorkerNotFound(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimError {
    /// True for errors caused by a malformed settings record.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SimError::InvalidRange { .. }
                | SimError::InvalidSetting { .. }
                | SimError::NoWorkers { .. }
                | SimError::ConfigParse(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
