use viv_core::CoreError;

/// Alias for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;

/// Errors raised while building or running a simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A registry, grid, or species-table operation failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A pipeline step reported a failure of its own.
    #[error("system \"{name}\" failed: {message}")]
    System {
        /// Name of the failing system.
        name: String,
        /// What went wrong.
        message: String,
    },

    /// No registered system carries this name.
    #[error("unknown system: \"{0}\"")]
    UnknownSystem(String),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A configuration document could not be parsed.
    #[error("could not parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

impl SimError {
    /// Build a [`SimError::System`].
    pub fn system(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::System {
            name: name.into(),
            message: message.into(),
        }
    }
}
